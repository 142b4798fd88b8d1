/// Contact form submissions
use crate::error::{AppError, Result};
use crate::models::Contact;
use crate::services::email::EmailService;
use sqlx::PgPool;
use uuid::Uuid;

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

pub struct ContactService {
    pool: PgPool,
}

impl ContactService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store the message, then forward it to the admin inbox
    pub async fn submit(&self, contact: NewContact, mailer: &EmailService) -> Result<Contact> {
        let stored = sqlx::query_as::<_, Contact>(&format!(
            r#"
            INSERT INTO contacts (name, email, phone, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(contact.name.trim())
        .bind(contact.email.trim().to_lowercase())
        .bind(&contact.phone)
        .bind(contact.subject.trim())
        .bind(contact.message.trim())
        .fetch_one(&self.pool)
        .await?;

        let message = mailer.contact_notification(
            &stored.name,
            &stored.email,
            &stored.subject,
            &stored.message,
        );
        if let Err(err) = mailer.send(&message).await {
            tracing::error!(contact_id = %stored.id, error = %err, "contact notification failed");
            return Err(AppError::ServiceFailure(
                "Server error. Please try again later.".to_string(),
            ));
        }

        tracing::info!(contact_id = %stored.id, "contact message received");
        Ok(stored)
    }

    pub async fn list(&self) -> Result<Vec<Contact>> {
        let contacts = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    pub async fn get(&self, contact_id: Uuid) -> Result<Contact> {
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1"
        ))
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("contact", contact_id))
    }

    pub async fn update(&self, contact_id: Uuid, update: ContactUpdate) -> Result<Contact> {
        sqlx::query_as::<_, Contact>(&format!(
            r#"
            UPDATE contacts SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                subject = COALESCE($5, subject),
                message = COALESCE($6, message),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(contact_id)
        .bind(update.name)
        .bind(update.email)
        .bind(update.phone)
        .bind(update.subject)
        .bind(update.message)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("contact", contact_id))
    }

    pub async fn delete(&self, contact_id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(contact_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found_by_id("contact", contact_id));
        }
        Ok(())
    }
}
