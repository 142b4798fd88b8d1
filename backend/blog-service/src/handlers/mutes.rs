/// Mute handlers - hide users, comments or replies from the caller's views
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::moderation::{MuteEntry, TargetType, Toggle};
use crate::services::RelationService;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteRequest {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MuteResponse {
    pub message: String,
    pub muted: bool,
    pub entry: MuteEntry,
}

pub async fn muted_entities(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse> {
    let service = RelationService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.muted_lists(user.0.id).await?))
}

/// Mute the target, or unmute it when already muted
pub async fn toggle_mute(
    pool: web::Data<PgPool>,
    user: AuthUser,
    req: web::Json<MuteRequest>,
) -> Result<HttpResponse> {
    let target = req.target_type.with_id(req.target_id);
    let service = RelationService::new((**pool).clone());
    let outcome = service
        .toggle_mute(user.0.id, target, req.reason.as_deref())
        .await?;

    let response = match outcome {
        Toggle::Added(entry) => MuteResponse {
            message: format!("{} muted successfully", req.target_type),
            muted: true,
            entry,
        },
        Toggle::Removed(entry) => MuteResponse {
            message: format!("{} unmuted successfully", req.target_type),
            muted: false,
            entry,
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

pub async fn unmute(
    pool: web::Data<PgPool>,
    user: AuthUser,
    req: web::Json<MuteRequest>,
) -> Result<HttpResponse> {
    let target = req.target_type.with_id(req.target_id);
    let service = RelationService::new((**pool).clone());
    let entry = service.unmute(user.0.id, target).await?;

    Ok(HttpResponse::Ok().json(MuteResponse {
        message: format!("{} unmuted successfully", req.target_type),
        muted: false,
        entry,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/mutes")
            .route("/unmute", web::post().to(unmute))
            .service(
                web::resource("")
                    .route(web::get().to(muted_entities))
                    .route(web::post().to(toggle_mute)),
            ),
    );
}
