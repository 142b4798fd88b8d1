/// Reply handlers - top-level `/replies` and nested `/comments/{commentId}/replies`
use crate::error::{AppError, Result};
use crate::handlers::{viewer_context, VisibilityQuery, DEFAULT_PAGE_LIMIT, USER_PAGE_LIMIT};
use crate::middleware::{ActiveUser, MaybeUser};
use crate::models::ReactionKind;
use crate::pagination::PageQuery;
use crate::services::ReplyService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyContent {
    #[serde(default)]
    pub content: String,
    pub parent_reply: Option<Uuid>,
}

/// Body of `POST /replies`; the comment id is inline
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    pub comment: Option<Uuid>,
    #[serde(default)]
    pub content: String,
    pub parent_reply: Option<Uuid>,
}

pub async fn list_replies(
    pool: web::Data<PgPool>,
    user: MaybeUser,
    visibility: web::Query<VisibilityQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let ctx = viewer_context(&pool, user.0.as_ref(), &visibility).await?;
    let service = ReplyService::new((**pool).clone());
    let replies = service.all(&ctx, page.resolve(DEFAULT_PAGE_LIMIT)).await?;
    Ok(HttpResponse::Ok().json(replies))
}

/// Flat list, oldest first
pub async fn list_comment_replies(
    pool: web::Data<PgPool>,
    user: MaybeUser,
    comment_id: web::Path<Uuid>,
    visibility: web::Query<VisibilityQuery>,
) -> Result<HttpResponse> {
    let ctx = viewer_context(&pool, user.0.as_ref(), &visibility).await?;
    let service = ReplyService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.for_comment(*comment_id, &ctx).await?))
}

/// Visible replies of a comment as a forest
pub async fn reply_tree(
    pool: web::Data<PgPool>,
    user: MaybeUser,
    comment_id: web::Path<Uuid>,
    visibility: web::Query<VisibilityQuery>,
) -> Result<HttpResponse> {
    let ctx = viewer_context(&pool, user.0.as_ref(), &visibility).await?;
    let service = ReplyService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.tree(*comment_id, &ctx).await?))
}

pub async fn create_reply(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    req: web::Json<CreateReplyRequest>,
) -> Result<HttpResponse> {
    let comment_id = req
        .comment
        .ok_or_else(|| AppError::BadRequest("A reply must belong to a comment".to_string()))?;

    let service = ReplyService::new((**pool).clone());
    let reply = service
        .create(comment_id, req.parent_reply, &user.0, &req.content)
        .await?;
    Ok(HttpResponse::Created().json(reply))
}

pub async fn create_comment_reply(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    comment_id: web::Path<Uuid>,
    req: web::Json<ReplyContent>,
) -> Result<HttpResponse> {
    let service = ReplyService::new((**pool).clone());
    let reply = service
        .create(*comment_id, req.parent_reply, &user.0, &req.content)
        .await?;
    Ok(HttpResponse::Created().json(reply))
}

pub async fn get_reply(
    pool: web::Data<PgPool>,
    user: MaybeUser,
    reply_id: web::Path<Uuid>,
    visibility: web::Query<VisibilityQuery>,
) -> Result<HttpResponse> {
    let ctx = viewer_context(&pool, user.0.as_ref(), &visibility).await?;
    let service = ReplyService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.get(*reply_id, &ctx).await?))
}

pub async fn update_reply(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    reply_id: web::Path<Uuid>,
    req: web::Json<ReplyContent>,
) -> Result<HttpResponse> {
    let service = ReplyService::new((**pool).clone());
    let reply = service.update(*reply_id, &user.0, &req.content).await?;
    Ok(HttpResponse::Ok().json(reply))
}

pub async fn delete_reply(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    reply_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = ReplyService::new((**pool).clone());
    service.delete(*reply_id, &user.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn like_reply(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    reply_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = ReplyService::new((**pool).clone());
    let reply = service.react(*reply_id, user.0.id, ReactionKind::Like).await?;
    Ok(HttpResponse::Ok().json(reply))
}

pub async fn dislike_reply(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    reply_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = ReplyService::new((**pool).clone());
    let reply = service
        .react(*reply_id, user.0.id, ReactionKind::Dislike)
        .await?;
    Ok(HttpResponse::Ok().json(reply))
}

pub async fn replies_by_user(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    author_id: web::Path<Uuid>,
    visibility: web::Query<VisibilityQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let ctx = viewer_context(&pool, Some(&user.0), &visibility).await?;
    let service = ReplyService::new((**pool).clone());
    let replies = service
        .by_user(*author_id, &ctx, page.resolve(USER_PAGE_LIMIT))
        .await?;
    Ok(HttpResponse::Ok().json(replies))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/replies")
            .route("/{commentId}/comment", web::get().to(list_comment_replies))
            .route("/{userId}/user", web::get().to(replies_by_user))
            .route("/{id}/like", web::patch().to(like_reply))
            .route("/{id}/dislike", web::patch().to(dislike_reply))
            .service(
                web::resource("")
                    .route(web::get().to(list_replies))
                    .route(web::post().to(create_reply)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_reply))
                    .route(web::patch().to(update_reply))
                    .route(web::delete().to(delete_reply)),
            ),
    );
}
