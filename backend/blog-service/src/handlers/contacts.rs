/// Contact form handlers
use crate::error::Result;
use crate::middleware::AdminUser;
use crate::services::{ContactService, ContactUpdate, EmailService, NewContact};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 6, max = 50, message = "A name must have between 6 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Please provide a subject"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Please provide a message"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactUpdateRequest {
    #[validate(length(min = 6, max = 50, message = "A name must have between 6 and 50 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// Public: store the message and notify the admin inbox
pub async fn submit_contact(
    pool: web::Data<PgPool>,
    mailer: web::Data<EmailService>,
    req: web::Json<ContactRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    req.validate()?;

    let service = ContactService::new((**pool).clone());
    let contact = service
        .submit(
            NewContact {
                name: req.name.trim().to_string(),
                email: req.email.trim().to_lowercase(),
                phone: req.phone,
                subject: req.subject.trim().to_string(),
                message: req.message.trim().to_string(),
            },
            &mailer,
        )
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Message sent successfully",
        "email": contact.email,
        "success": true,
    })))
}

pub async fn list_contacts(pool: web::Data<PgPool>, _admin: AdminUser) -> Result<HttpResponse> {
    let service = ContactService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.list().await?))
}

pub async fn get_contact(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    contact_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = ContactService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.get(*contact_id).await?))
}

pub async fn update_contact(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    contact_id: web::Path<Uuid>,
    req: web::Json<ContactUpdateRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    req.validate()?;

    let service = ContactService::new((**pool).clone());
    let contact = service
        .update(
            *contact_id,
            ContactUpdate {
                name: req.name,
                email: req.email,
                phone: req.phone,
                subject: req.subject,
                message: req.message,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(contact))
}

pub async fn delete_contact(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    contact_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = ContactService::new((**pool).clone());
    service.delete(*contact_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/contacts")
            .service(
                web::resource("")
                    .route(web::get().to(list_contacts))
                    .route(web::post().to(submit_contact)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_contact))
                    .route(web::patch().to(update_contact))
                    .route(web::delete().to(delete_contact)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_validation_messages() {
        let req = ContactRequest {
            name: "Jo".into(),
            email: "not-an-email".into(),
            phone: None,
            subject: "Hello".into(),
            message: "".into(),
        };
        let err = crate::error::AppError::from(req.validate().unwrap_err());
        let crate::error::AppError::BadRequest(message) = err else {
            panic!("expected bad request");
        };
        assert!(message.contains("A name must have between 6 and 50 characters"));
        assert!(message.contains("Please provide a valid email"));
        assert!(message.contains("Please provide a message"));
    }
}
