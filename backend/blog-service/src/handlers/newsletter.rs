/// Newsletter handlers - double opt-in subscribe and unsubscribe
use crate::config::Config;
use crate::error::Result;
use crate::services::{EmailService, MailchimpClient, NewsletterService};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

/// Query string of the emailed confirmation links
#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub email: Option<String>,
    pub token: Option<String>,
}

fn message(text: &str) -> serde_json::Value {
    serde_json::json!({ "message": text })
}

fn newsletter<'a>(
    pool: &PgPool,
    config: &'a Config,
    mailer: &'a EmailService,
    mailchimp: &'a MailchimpClient,
) -> NewsletterService<'a> {
    NewsletterService::new(pool.clone(), &config.newsletter, mailer, mailchimp)
}

pub async fn subscribe(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<EmailService>,
    mailchimp: web::Data<MailchimpClient>,
    req: web::Json<EmailRequest>,
) -> Result<HttpResponse> {
    newsletter(&pool, &config, &mailer, &mailchimp)
        .subscribe(req.email.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(message("Confirmation email sent.")))
}

pub async fn confirm_subscription(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<EmailService>,
    mailchimp: web::Data<MailchimpClient>,
    query: web::Query<LinkQuery>,
) -> Result<HttpResponse> {
    newsletter(&pool, &config, &mailer, &mailchimp)
        .confirm(query.email.as_deref(), query.token.as_deref())
        .await?;
    Ok(HttpResponse::Created().json(message("Your subscription is confirmed, Thank you!")))
}

pub async fn unsubscribe(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<EmailService>,
    mailchimp: web::Data<MailchimpClient>,
    req: web::Json<EmailRequest>,
) -> Result<HttpResponse> {
    newsletter(&pool, &config, &mailer, &mailchimp)
        .request_unsubscribe(req.email.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(message(
        "Unsubscribe confirmation email sent. Please check your inbox.",
    )))
}

pub async fn confirm_unsubscribe(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<EmailService>,
    mailchimp: web::Data<MailchimpClient>,
    query: web::Query<LinkQuery>,
) -> Result<HttpResponse> {
    newsletter(&pool, &config, &mailer, &mailchimp)
        .confirm_unsubscribe(query.email.as_deref(), query.token.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(message(
        "You have successfully unsubscribed from our newsletter",
    )))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/newsletter")
            .route("/subscribe/init", web::post().to(subscribe))
            .route("/subscribe/confirm", web::get().to(confirm_subscription))
            .route("/unsubscribe/init", web::post().to(unsubscribe))
            .route("/unsubscribe/confirm", web::get().to(confirm_unsubscribe)),
    );
}
