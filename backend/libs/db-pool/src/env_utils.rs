//! Environment variable parsing utilities
//!
//! Small helpers so configuration loaders never need `unwrap()` on env input.

use std::str::FromStr;

/// Read a string variable, treating blank values as absent
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an environment variable strictly
///
/// A missing variable yields `default`, a present but malformed value is an
/// error naming the key, so typos in deployment manifests surface at startup.
pub fn parse_env_strict<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env_non_empty(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("Failed to parse {}='{}'", key, raw)),
        None => Ok(default),
    }
}

/// Read a required variable
pub fn env_required(key: &str) -> Result<String, String> {
    env_non_empty(key).ok_or_else(|| format!("{} environment variable not set", key))
}
