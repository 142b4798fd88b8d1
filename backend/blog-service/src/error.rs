/// Error types for Blog Service
///
/// Every handler returns `Result<HttpResponse>`; the variants below map onto
/// HTTP status codes and a `{"status", "message"}` JSON body.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use crypto_core::{PasswordError, TokenError};
use std::fmt;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

const GENERIC_SERVER_ERROR: &str = "Something went wrong";

/// Application error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed or invalid input
    BadRequest(String),

    /// Missing, invalid or expired session
    Unauthorized(String),

    /// Role or ownership violation, blocked interaction
    Forbidden(String),

    /// Resource not found
    NotFound(String),

    /// Conflict (duplicate resource, etc.)
    Conflict(String),

    /// Client exceeded the request quota
    TooManyRequests(String),

    /// A downstream dependency failed; the message is safe to show
    ServiceFailure(String),

    /// Database operation failed
    DatabaseError(String),

    /// Internal server error
    Internal(String),
}

impl AppError {
    pub fn not_found_by_id(kind: &str, id: impl fmt::Display) -> Self {
        AppError::NotFound(format!(
            "There is no {} found with the given ID → {}",
            kind, id
        ))
    }

    /// Message returned to the client
    fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(msg) | AppError::Internal(msg) => {
                if cfg!(debug_assertions) {
                    msg.clone()
                } else {
                    GENERIC_SERVER_ERROR.to_string()
                }
            }
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::TooManyRequests(msg)
            | AppError::ServiceFailure(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::TooManyRequests(msg) => write!(f, "Too many requests: {}", msg),
            AppError::ServiceFailure(msg) => write!(f, "Service failure: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceFailure(_) | AppError::DatabaseError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let kind = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "error"
        } else {
            "fail"
        };

        HttpResponse::build(status).json(serde_json::json!({
            "status": kind,
            "message": self.public_message(),
        }))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => AppError::BadRequest(format!(
                    "Duplicate field value: {}. Please use another value",
                    db_err.constraint().unwrap_or("unknown")
                )),
                // foreign_key_violation
                Some("23503") => {
                    AppError::BadRequest("Referenced resource does not exist".to_string())
                }
                // check_violation
                Some("23514") => AppError::BadRequest(format!(
                    "Invalid input data: {}",
                    db_err.constraint().unwrap_or("constraint")
                )),
                _ => AppError::DatabaseError(err.to_string()),
            },
            _ => AppError::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();

        AppError::BadRequest(messages.join(", "))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => {
                AppError::Unauthorized("Your token has expired. Please log in again".to_string())
            }
            TokenError::Invalid(_) => {
                AppError::Unauthorized("Invalid token. Please log in again".to_string())
            }
            TokenError::Encoding(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Name is too short"))]
        name: String,
        #[validate(email(message = "Please enter a valid email address"))]
        email: String,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::TooManyRequests("x".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::ServiceFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_token_errors_map_to_messages() {
        assert_eq!(
            AppError::from(TokenError::Expired),
            AppError::Unauthorized("Your token has expired. Please log in again".into())
        );
        assert_eq!(
            AppError::from(TokenError::Invalid("bad".into())),
            AppError::Unauthorized("Invalid token. Please log in again".into())
        );
    }

    #[test]
    fn test_validation_messages_are_joined() {
        let sample = Sample {
            name: "ab".into(),
            email: "nope".into(),
        };
        let err = AppError::from(sample.validate().unwrap_err());
        assert_eq!(
            err,
            AppError::BadRequest(
                "Please enter a valid email address, Name is too short".into()
            )
        );
    }

    #[test]
    fn test_not_found_by_id_message() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            AppError::not_found_by_id("post", id),
            AppError::NotFound(format!("There is no post found with the given ID → {}", id))
        );
    }

    #[test]
    fn test_service_failure_message_is_public() {
        let err = AppError::ServiceFailure("Server error. Please try again later.".into());
        assert_eq!(err.public_message(), "Server error. Please try again later.");
    }
}
