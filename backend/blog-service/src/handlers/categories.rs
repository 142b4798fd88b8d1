/// Category handlers; reads are public, writes are admin-only
use crate::error::Result;
use crate::middleware::AdminUser;
use crate::services::CategoryService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn list_categories(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = CategoryService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.list().await?))
}

pub async fn get_category(
    pool: web::Data<PgPool>,
    category_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = CategoryService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.get(*category_id).await?))
}

pub async fn create_category(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    req: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let service = CategoryService::new((**pool).clone());
    let category = service.create(&req.name, req.description).await?;
    Ok(HttpResponse::Created().json(category))
}

pub async fn update_category(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    category_id: web::Path<Uuid>,
    req: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let service = CategoryService::new((**pool).clone());
    let category = service
        .update(*category_id, req.name.as_deref(), req.description)
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

pub async fn delete_category(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    category_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = CategoryService::new((**pool).clone());
    service.delete(*category_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .service(
                web::resource("")
                    .route(web::get().to(list_categories))
                    .route(web::post().to(create_category)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_category))
                    .route(web::patch().to(update_category))
                    .route(web::delete().to(delete_category)),
            ),
    );
}
