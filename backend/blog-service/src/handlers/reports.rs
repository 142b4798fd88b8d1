/// Report handlers - filing reports and the admin review queue
use crate::error::Result;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{ReportReason, ReportStatus};
use crate::moderation::{ReportDraft, TargetType};
use crate::services::{ReportService, ReviewRequest};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub custom_reason: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReportRequest {
    pub status: Option<ReportStatus>,
    pub admin_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<ReportStatus>,
}

pub async fn create_report(
    pool: web::Data<PgPool>,
    user: AuthUser,
    req: web::Json<CreateReportRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let draft = ReportDraft::validate(
        user.0.id,
        req.target_type.with_id(req.target_id),
        req.reason,
        req.custom_reason,
        req.details,
    )?;

    let service = ReportService::new((**pool).clone());
    let report = service.create(draft).await?;
    Ok(HttpResponse::Created().json(report))
}

pub async fn get_report(
    pool: web::Data<PgPool>,
    user: AuthUser,
    report_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = ReportService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.get(*report_id, &user.0).await?))
}

pub async fn list_reports(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    query: web::Query<ReportListQuery>,
) -> Result<HttpResponse> {
    let service = ReportService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.list(query.status).await?))
}

pub async fn review_report(
    pool: web::Data<PgPool>,
    admin: AdminUser,
    report_id: web::Path<Uuid>,
    req: web::Json<ReviewReportRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let service = ReportService::new((**pool).clone());
    let report = service
        .review(
            *report_id,
            &admin.0,
            ReviewRequest {
                status: req.status,
                admin_note: req.admin_note,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn delete_report(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    report_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = ReportService::new((**pool).clone());
    service.delete(*report_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            .route("/admin", web::get().to(list_reports))
            .route("/admin/{id}/review", web::patch().to(review_report))
            .route("/admin/{id}", web::delete().to(delete_report))
            .route("/{id}", web::get().to(get_report))
            .route("", web::post().to(create_report)),
    );
}
