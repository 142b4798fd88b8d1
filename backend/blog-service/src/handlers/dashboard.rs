/// Admin moderation dashboard
use crate::error::Result;
use crate::middleware::AdminUser;
use crate::services::DashboardService;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

pub async fn dashboard(pool: web::Data<PgPool>, _admin: AdminUser) -> Result<HttpResponse> {
    let service = DashboardService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.load().await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/dashboard", web::get().to(dashboard));
}
