/// Configuration management for Blog Service
///
/// Configuration is read from the environment exactly once at startup and
/// handed to each component as an immutable value.
use db_pool::env_utils::{env_non_empty, parse_env_strict};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Session token and cookie settings
    pub auth: AuthConfig,
    /// Outgoing SMTP settings
    pub email: EmailConfig,
    /// Newsletter token secrets
    pub newsletter: NewsletterConfig,
    /// Mailing list provider
    pub mailchimp: MailchimpConfig,
    /// Media upload signing keys
    pub upload: UploadConfig,
    /// Per-IP request quota
    pub rate_limit: RateLimitConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Public base URL of this API
    pub public_url: String,
    /// Base URL of the web client, used in emailed links
    pub client_url: String,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expires_in_secs: i64,
    pub cookie_expires_in_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Empty host puts the mailer in no-op mode
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub use_starttls: bool,
    pub from_address: String,
    pub from_name: String,
    /// Recipient of contact form submissions
    pub admin_inbox: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterConfig {
    pub confirmation_secret: String,
    pub unsubscribe_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailchimpConfig {
    /// Missing key disables list synchronisation
    pub api_key: Option<String>,
    pub server_prefix: String,
    pub audience_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub url_endpoint: String,
    pub public_key: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
    /// Reverse proxies in front of the service; the client address is the
    /// `X-Forwarded-For` hop this many entries from the right. Zero ignores
    /// the header.
    pub trusted_proxies: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 2500,
            window_secs: 900,
            trusted_proxies: 1,
        }
    }
}

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let port = parse_env_strict("BLOG_SERVICE_PORT", 8080u16)?;
        let host = std::env::var("BLOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                public_url: env_non_empty("PUBLIC_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}", port)),
                client_url: env_non_empty("CLIENT_URL")
                    .unwrap_or_else(|| "http://localhost:3000".to_string()),
                host,
                port,
            },
            cors: {
                let allowed_origins = match env_non_empty("CORS_ALLOWED_ORIGINS") {
                    Some(value) => value,
                    None if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    None => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/blog".to_string()),
                max_connections: parse_env_strict("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: {
                let jwt_secret = env_non_empty("JWT_SECRET")
                    .ok_or_else(|| "JWT_SECRET must be set".to_string())?;
                if production && jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
                    return Err(format!(
                        "JWT_SECRET must be at least {} bytes in production",
                        MIN_PRODUCTION_SECRET_LEN
                    ));
                }

                AuthConfig {
                    jwt_secret,
                    jwt_expires_in_secs: parse_env_strict("JWT_EXPIRES_IN_SECS", 90 * 24 * 3600)?,
                    cookie_expires_in_days: parse_env_strict("JWT_COOKIE_EXPIRES_IN_DAYS", 90)?,
                }
            },
            email: EmailConfig {
                smtp_host: std::env::var("SMTP_HOST").unwrap_or_default(),
                smtp_port: parse_env_strict("SMTP_PORT", 587)?,
                smtp_username: env_non_empty("SMTP_USERNAME"),
                smtp_password: env_non_empty("SMTP_PASSWORD"),
                use_starttls: parse_env_strict("SMTP_USE_STARTTLS", true)?,
                from_address: env_non_empty("EMAIL_FROM")
                    .unwrap_or_else(|| "noreply@blog.local".to_string()),
                from_name: env_non_empty("EMAIL_FROM_NAME").unwrap_or_else(|| "Blog".to_string()),
                admin_inbox: env_non_empty("ADMIN_EMAIL")
                    .unwrap_or_else(|| "admin@blog.local".to_string()),
            },
            newsletter: NewsletterConfig {
                confirmation_secret: secret_or_dev_default(
                    "CONFIRMATION_SECRET",
                    "dev-newsletter-confirmation-secret",
                    production,
                )?,
                unsubscribe_secret: secret_or_dev_default(
                    "UNSUBSCRIBE_SECRET",
                    "dev-newsletter-unsubscribe-secret",
                    production,
                )?,
            },
            mailchimp: MailchimpConfig {
                api_key: env_non_empty("MAILCHIMP_API_KEY"),
                server_prefix: env_non_empty("MAILCHIMP_SERVER_PREFIX")
                    .unwrap_or_else(|| "us1".to_string()),
                audience_id: env_non_empty("MAILCHIMP_AUDIENCE_ID").unwrap_or_default(),
            },
            upload: UploadConfig {
                url_endpoint: env_non_empty("IMAGEKIT_URL_ENDPOINT").unwrap_or_default(),
                public_key: env_non_empty("IMAGEKIT_PUBLIC_KEY").unwrap_or_default(),
                private_key: secret_or_dev_default(
                    "IMAGEKIT_PRIVATE_KEY",
                    "dev-upload-private-key",
                    production,
                )?,
            },
            rate_limit: RateLimitConfig {
                max_requests: parse_env_strict("RATE_LIMIT_MAX_REQUESTS", 2500)?,
                window_secs: parse_env_strict("RATE_LIMIT_WINDOW_SECS", 900)?,
                trusted_proxies: parse_env_strict("RATE_LIMIT_TRUSTED_PROXIES", 1)?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn secret_or_dev_default(key: &str, dev_default: &str, production: bool) -> Result<String, String> {
    match env_non_empty(key) {
        Some(value) => Ok(value),
        None if production => Err(format!("{} must be set in production", key)),
        None => Ok(dev_default.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "JWT_SECRET",
        "CORS_ALLOWED_ORIGINS",
        "CONFIRMATION_SECRET",
        "UNSUBSCRIBE_SECRET",
        "IMAGEKIT_PRIVATE_KEY",
        "BLOG_SERVICE_PORT",
        "RATE_LIMIT_MAX_REQUESTS",
        "RATE_LIMIT_TRUSTED_PROXIES",
    ];

    fn reset_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_missing_jwt_secret_is_rejected() {
        reset_env();
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("JWT_SECRET"));
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        reset_env();
        std::env::set_var("JWT_SECRET", "short-dev-secret");

        let config = Config::from_env().unwrap();
        assert!(!config.is_production());
        assert_eq!(config.app.port, 8080);
        assert_eq!(config.cors.allowed_origins, "http://localhost:3000");
        assert_eq!(config.rate_limit.max_requests, 2500);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert_eq!(config.rate_limit.trusted_proxies, 1);

        reset_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_strong_secret_and_cors() {
        reset_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("JWT_SECRET", "too-short");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://blog.example.com");
        std::env::set_var("CONFIRMATION_SECRET", "c");
        std::env::set_var("UNSUBSCRIBE_SECRET", "u");
        std::env::set_var("IMAGEKIT_PRIVATE_KEY", "k");
        assert!(Config::from_env().unwrap_err().contains("at least 32 bytes"));

        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");
        assert!(Config::from_env().unwrap_err().contains("cannot be '*'"));

        std::env::remove_var("CORS_ALLOWED_ORIGINS");
        assert!(Config::from_env().unwrap_err().contains("must be set"));

        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://blog.example.com");
        let config = Config::from_env().unwrap();
        assert!(config.is_production());

        reset_env();
    }

    #[test]
    #[serial]
    fn test_malformed_number_is_rejected() {
        reset_env();
        std::env::set_var("JWT_SECRET", "short-dev-secret");
        std::env::set_var("BLOG_SERVICE_PORT", "eighty");
        assert!(Config::from_env().unwrap_err().contains("BLOG_SERVICE_PORT"));
        reset_env();
    }

    #[test]
    #[serial]
    fn test_trusted_proxies_override() {
        reset_env();
        std::env::set_var("JWT_SECRET", "short-dev-secret");
        std::env::set_var("RATE_LIMIT_TRUSTED_PROXIES", "0");
        assert_eq!(Config::from_env().unwrap().rate_limit.trusted_proxies, 0);

        std::env::set_var("RATE_LIMIT_TRUSTED_PROXIES", "-1");
        assert!(Config::from_env()
            .unwrap_err()
            .contains("RATE_LIMIT_TRUSTED_PROXIES"));
        reset_env();
    }
}
