/// Newsletter double opt-in and opt-out flows
use crate::config::NewsletterConfig;
use crate::error::{AppError, Result};
use crate::models::{Subscriber, SubscriberStatus, TokenPurpose};
use crate::services::email::EmailService;
use crate::services::mailchimp::{ListOutcome, MailchimpClient};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

const TOKEN_TTL_MINUTES: i64 = 30;

const SUBSCRIBER_COLUMNS: &str = "id, email, status, confirmation_token, confirmation_token_expires, \
     unsubscribe_token, unsubscribe_token_expires, created_at, updated_at";

/// `hex(HMAC-SHA256(secret, email || now_millis))`
pub fn link_token(secret: &str, email: &str, now: DateTime<Utc>) -> String {
    let message = format!("{}{}", email, now.timestamp_millis());
    crypto_core::hash::hmac_sha256_hex(secret.as_bytes(), message.as_bytes())
}

fn require_email(email: Option<&str>) -> Result<String> {
    email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Please provide an email address".to_string()))
}

pub struct NewsletterService<'a> {
    pool: PgPool,
    secrets: &'a NewsletterConfig,
    mailer: &'a EmailService,
    mailchimp: &'a MailchimpClient,
}

impl<'a> NewsletterService<'a> {
    pub fn new(
        pool: PgPool,
        secrets: &'a NewsletterConfig,
        mailer: &'a EmailService,
        mailchimp: &'a MailchimpClient,
    ) -> Self {
        Self {
            pool,
            secrets,
            mailer,
            mailchimp,
        }
    }

    async fn find(&self, email: &str) -> Result<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscriber)
    }

    /// Store a pending subscription and email the confirmation link
    pub async fn subscribe(&self, email: Option<&str>) -> Result<()> {
        let email = require_email(email)?;

        if let Some(existing) = self.find(&email).await? {
            if existing.status == SubscriberStatus::Confirmed {
                return Err(AppError::Conflict("Email already subscribed".to_string()));
            }
        }

        let now = Utc::now();
        let token = link_token(&self.secrets.confirmation_secret, &email, now);
        sqlx::query(
            r#"
            INSERT INTO subscribers (email, status, confirmation_token, confirmation_token_expires)
            VALUES ($1, 'pending', $2, $3)
            ON CONFLICT (email) DO UPDATE SET
                status = 'pending',
                confirmation_token = EXCLUDED.confirmation_token,
                confirmation_token_expires = EXCLUDED.confirmation_token_expires,
                updated_at = NOW()
            "#,
        )
        .bind(&email)
        .bind(&token)
        .bind(now + Duration::minutes(TOKEN_TTL_MINUTES))
        .execute(&self.pool)
        .await?;

        let message = self.mailer.newsletter_confirmation(&email, &token);
        if let Err(err) = self.mailer.send(&message).await {
            tracing::error!(error = %err, "newsletter confirmation email failed");
            return Err(AppError::ServiceFailure(
                "The subscription confirm email could not be sent due to a server error. \
                 Please check the email address you provided and try again in a few minutes."
                    .to_string(),
            ));
        }

        tracing::info!("newsletter confirmation sent");
        Ok(())
    }

    pub async fn confirm(&self, email: Option<&str>, token: Option<&str>) -> Result<()> {
        let (email, token) = match (email.map(str::trim), token.map(str::trim)) {
            (Some(e), Some(t)) if !e.is_empty() && !t.is_empty() => (e.to_lowercase(), t),
            _ => return Err(AppError::BadRequest("Invalid confirmation link".to_string())),
        };

        let valid = self
            .find(&email)
            .await?
            .filter(|s| s.status == SubscriberStatus::Pending)
            .map(|s| s.token_valid(TokenPurpose::Confirm, token, Utc::now()))
            .unwrap_or(false);
        if !valid {
            return Err(AppError::BadRequest("Invalid or expired token".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE subscribers SET
                status = 'confirmed',
                confirmation_token = NULL,
                confirmation_token_expires = NULL,
                updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .execute(&self.pool)
        .await?;

        if self.mailchimp.subscribe(&email).await? == ListOutcome::AlreadySubscribed {
            tracing::info!("subscriber already present on mailing list");
        }
        tracing::info!("newsletter subscription confirmed");
        Ok(())
    }

    pub async fn request_unsubscribe(&self, email: Option<&str>) -> Result<()> {
        let email = require_email(email)?;

        let confirmed = self
            .find(&email)
            .await?
            .map(|s| s.status == SubscriberStatus::Confirmed)
            .unwrap_or(false);
        if !confirmed {
            return Err(AppError::NotFound(
                "Subscriber not found or not confirmed".to_string(),
            ));
        }

        let now = Utc::now();
        let token = link_token(&self.secrets.unsubscribe_secret, &email, now);
        sqlx::query(
            r#"
            UPDATE subscribers SET
                unsubscribe_token = $2,
                unsubscribe_token_expires = $3,
                updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .bind(&token)
        .bind(now + Duration::minutes(TOKEN_TTL_MINUTES))
        .execute(&self.pool)
        .await?;

        let message = self.mailer.newsletter_unsubscribe(&email, &token);
        if let Err(err) = self.mailer.send(&message).await {
            tracing::error!(error = %err, "newsletter unsubscribe email failed");
            return Err(AppError::ServiceFailure(
                "The unsubscribe confirmation email could not be sent due to a server error. \
                 Please try again later."
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub async fn confirm_unsubscribe(&self, email: Option<&str>, token: Option<&str>) -> Result<()> {
        let (email, token) = match (email.map(str::trim), token.map(str::trim)) {
            (Some(e), Some(t)) if !e.is_empty() && !t.is_empty() => (e.to_lowercase(), t),
            _ => return Err(AppError::BadRequest("Invalid unsubscribe link".to_string())),
        };

        let valid = self
            .find(&email)
            .await?
            .map(|s| s.token_valid(TokenPurpose::Unsubscribe, token, Utc::now()))
            .unwrap_or(false);
        if !valid {
            return Err(AppError::BadRequest("Invalid or expired token".to_string()));
        }

        if self.mailchimp.unsubscribe(&email).await? == ListOutcome::NotFound {
            tracing::warn!("subscriber missing from mailing list; marking unsubscribed anyway");
        }

        sqlx::query(
            r#"
            UPDATE subscribers SET
                status = 'unsubscribed',
                unsubscribe_token = NULL,
                unsubscribe_token_expires = NULL,
                updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .execute(&self.pool)
        .await?;

        tracing::info!("newsletter unsubscribed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_link_token_depends_on_time_and_secret() {
        let t0 = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let t1 = Utc.timestamp_millis_opt(1_700_000_000_001).unwrap();

        let a = link_token("secret", "a@example.com", t0);
        assert_eq!(a.len(), 64);
        assert_eq!(a, link_token("secret", "a@example.com", t0));
        assert_ne!(a, link_token("secret", "a@example.com", t1));
        assert_ne!(a, link_token("other", "a@example.com", t0));
    }

    #[test]
    fn test_require_email() {
        assert_eq!(require_email(Some(" A@Example.com ")).unwrap(), "a@example.com");
        assert_eq!(
            require_email(Some("  ")),
            Err(AppError::BadRequest("Please provide an email address".into()))
        );
        assert!(require_email(None).is_err());
    }
}
