/// Session token issuing and validation
///
/// Tokens are HS256 JWTs signed with a shared secret. The secret is supplied
/// once at startup through `JwtManager::new` and never read from the
/// environment by this crate.
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::JwtManager;
/// use uuid::Uuid;
///
/// let manager = JwtManager::new("a-very-long-secret-used-only-in-docs!!", 3600);
/// let token = manager.generate_token(Uuid::new_v4(), "ada@example.com").unwrap();
/// let claims = manager.validate_token(&token).unwrap();
/// assert_eq!(claims.email, "ada@example.com");
/// ```
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Email address at issue time
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into a user id
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid("malformed subject".into()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

// ============================================================================
// Manager
// ============================================================================

/// Issues and validates tokens with a single symmetric key
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("keys", &"[REDACTED]")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

impl JwtManager {
    /// Build a manager from the shared secret
    ///
    /// ## Arguments
    ///
    /// * `secret` - HMAC key, at least 32 bytes in production
    /// * `expires_in_secs` - lifetime of every issued token
    pub fn new(secret: &str, expires_in_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in_secs,
        }
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in_secs
    }

    /// Generate a session token for a user
    pub fn generate_token(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let expiry = now + Duration::seconds(self.expires_in_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Validate and decode a token
    ///
    /// ## Errors
    ///
    /// - `TokenError::Expired` when `exp` is in the past
    /// - `TokenError::Invalid` for bad signatures, wrong algorithm or malformed input
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-unit-test-secret-0001";

    #[test]
    fn test_generate_token_has_three_parts() {
        let manager = JwtManager::new(SECRET, 3600);
        let token = manager
            .generate_token(Uuid::new_v4(), "test@example.com")
            .expect("Failed to generate token");
        assert_eq!(token.matches('.').count(), 2);
    }

    #[test]
    fn test_validate_valid_token() {
        let manager = JwtManager::new(SECRET, 3600);
        let user_id = Uuid::new_v4();
        let token = manager.generate_token(user_id, "test@example.com").unwrap();

        let claims = manager.validate_token(&token).expect("token should validate");
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "test@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let manager = JwtManager::new(SECRET, -120);
        let token = manager.generate_token(Uuid::new_v4(), "a@b.co").unwrap();
        assert_eq!(manager.validate_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = JwtManager::new(SECRET, 3600);
        let other = JwtManager::new("another-secret-another-secret-000002", 3600);
        let token = issuer.generate_token(Uuid::new_v4(), "a@b.co").unwrap();
        assert!(matches!(
            other.validate_token(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let manager = JwtManager::new(SECRET, 3600);
        assert!(matches!(
            manager.validate_token("not.a.jwt"),
            Err(TokenError::Invalid(_))
        ));
    }
}
