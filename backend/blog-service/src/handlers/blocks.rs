/// Block handlers
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::moderation::Toggle;
use crate::services::RelationService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct BlockRequest {
    pub reason: Option<String>,
}

pub async fn blocked_users(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse> {
    let service = RelationService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.blocked_users(user.0.id).await?))
}

/// Block the target user, or unblock when already blocked
///
/// The body is optional; an empty request blocks with the default reason.
pub async fn toggle_block(
    pool: web::Data<PgPool>,
    user: AuthUser,
    target_id: web::Path<Uuid>,
    req: Option<web::Json<BlockRequest>>,
) -> Result<HttpResponse> {
    let reason = req.and_then(|r| r.into_inner().reason);
    let service = RelationService::new((**pool).clone());
    let outcome = service
        .toggle_block(user.0.id, *target_id, reason.as_deref())
        .await?;

    let message = match outcome {
        Toggle::Added(_) => "User blocked successfully",
        Toggle::Removed(_) => "User unblocked successfully",
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message,
        "blocked": outcome.is_added(),
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/blocks")
            .route("", web::get().to(blocked_users))
            .route("/{id}", web::patch().to(toggle_block)),
    );
}
