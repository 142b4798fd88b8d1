/// Authentication service - registration, login and password lifecycle
use crate::error::{AppError, Result};
use crate::models::user::{validate_password_pair, validate_username};
use crate::models::User;
use crate::services::email::EmailService;
use crate::services::users::{NewUser, UserService};
use chrono::{Duration, Utc};
use crypto_core::hash::{random_token_hex, sha256_hex};
use crypto_core::{hash_password, verify_password, JwtManager};
use sqlx::PgPool;
use uuid::Uuid;

const RESET_TOKEN_BYTES: usize = 32;
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Registration input that passed the derive-level checks
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: NewUser,
    pub password: String,
    pub password_confirm: String,
}

/// A signed-in user and the JWT issued for them
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct AuthService<'a> {
    users: UserService,
    jwt: &'a JwtManager,
}

impl<'a> AuthService<'a> {
    pub fn new(pool: PgPool, jwt: &'a JwtManager) -> Self {
        Self {
            users: UserService::new(pool),
            jwt,
        }
    }

    pub fn issue(&self, user: User) -> Result<Session> {
        let token = self.jwt.generate_token(user.id, &user.email)?;
        Ok(Session { user, token })
    }

    pub async fn register(&self, registration: Registration) -> Result<Session> {
        validate_username(&registration.user.username)?;
        validate_password_pair(&registration.password, &registration.password_confirm)?;

        let password_hash = hash_password(&registration.password)?;
        let user = self
            .users
            .create(NewUser {
                password_hash,
                ..registration.user
            })
            .await?;

        self.issue(user)
    }

    pub async fn login(&self, identifier: Option<&str>, password: Option<&str>) -> Result<Session> {
        let (identifier, password) = match (
            identifier.map(str::trim).filter(|i| !i.is_empty()),
            password.filter(|p| !p.is_empty()),
        ) {
            (Some(identifier), Some(password)) => (identifier, password),
            _ => {
                return Err(AppError::BadRequest(
                    "Please provide username/email and password".to_string(),
                ))
            }
        };

        let bad_credentials = || {
            AppError::BadRequest(
                "That username/email and password combination didn't work. Try again.".to_string(),
            )
        };

        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(bad_credentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(bad_credentials());
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.issue(user)
    }

    /// Store a hashed reset token and email the raw one
    ///
    /// Returns the address the link was sent to.
    pub async fn forgot_password(&self, email: Option<&str>, mailer: &EmailService) -> Result<String> {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::BadRequest("Please enter your email address".to_string()))?;

        let user = self.users.find_by_email(email).await?.ok_or_else(|| {
            AppError::NotFound("There is no user with the email address".to_string())
        })?;

        let token = random_token_hex(RESET_TOKEN_BYTES);
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .set_reset_token(user.id, Some(&sha256_hex(&token)), Some(expires))
            .await?;

        let message = mailer.password_reset(&user.email, &user.name, &token);
        if let Err(err) = mailer.send(&message).await {
            tracing::error!(user_id = %user.id, error = %err, "password reset email failed");
            self.users.set_reset_token(user.id, None, None).await?;
            return Err(AppError::ServiceFailure(
                "There was an error sending the password reset email. Try again later!"
                    .to_string(),
            ));
        }

        tracing::info!(user_id = %user.id, "password reset token issued");
        Ok(user.email)
    }

    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<Session> {
        let user = self
            .users
            .find_by_reset_token(&sha256_hex(token))
            .await?
            .ok_or_else(|| AppError::BadRequest("Token is invalid or has expired".to_string()))?;

        validate_password_pair(password, password_confirm)?;
        let user = self
            .users
            .set_password(user.id, &hash_password(password)?)
            .await?;

        tracing::info!(user_id = %user.id, "password reset");
        self.issue(user)
    }

    pub async fn update_password(
        &self,
        user_id: Uuid,
        current: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<Session> {
        let user = self.users.get_active(user_id).await?;

        if !verify_password(current, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Your current password is incorrect".to_string(),
            ));
        }

        validate_password_pair(password, password_confirm)?;
        let user = self
            .users
            .set_password(user.id, &hash_password(password)?)
            .await?;

        tracing::info!(user_id = %user.id, "password updated");
        self.issue(user)
    }
}
