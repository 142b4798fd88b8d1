/// User handlers - self-service profile, saved posts and admin user management
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::handlers::auth::{removal_cookie, session_response};
use crate::middleware::{AdminUser, AuthUser};
use crate::models::user::validate_username;
use crate::models::{Role, UserProfile};
use crate::services::{Session, UserService, UserUpdate};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use crypto_core::JwtManager;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Fields a user may change on their own profile
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    #[validate(length(min = 6, max = 50, message = "A name must have between 6 and 50 characters"))]
    pub name: Option<String>,
    pub username: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: Option<String>,
    pub bio: Option<String>,
    pub about: Option<String>,
    pub image: Option<String>,
    pub banner: Option<String>,
    /// Present only to reject the request
    pub password: Option<serde_json::Value>,
    pub password_confirm: Option<serde_json::Value>,
}

impl UpdateMeRequest {
    fn into_update(self) -> Result<UserUpdate> {
        if self.password.is_some() || self.password_confirm.is_some() {
            return Err(AppError::BadRequest(
                "This route is not for password updates. Please use /api/v1/auth/update-my-password"
                    .to_string(),
            ));
        }
        if let Some(username) = &self.username {
            validate_username(username)?;
        }

        Ok(UserUpdate {
            name: self.name,
            username: self.username,
            email: self.email,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            country: self.country,
            bio: self.bio,
            about: self.about,
            image: self.image,
            banner: self.banner,
            ..UserUpdate::default()
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdateRequest {
    #[validate(length(min = 6, max = 50, message = "A name must have between 6 and 50 characters"))]
    pub name: Option<String>,
    pub username: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub country: Option<String>,
    pub bio: Option<String>,
    pub about: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub new: Option<String>,
}

pub async fn get_me(user: AuthUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(user.0.profile()))
}

pub async fn update_me(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtManager>,
    config: web::Data<Config>,
    user: AuthUser,
    req: web::Json<UpdateMeRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let update = req.into_inner().into_update()?;

    let service = UserService::new((**pool).clone());
    let updated = service.update(user.0.id, update).await?;
    let token = jwt.generate_token(updated.id, &updated.email)?;

    session_response(
        StatusCode::OK,
        Session {
            user: updated,
            token,
        },
        &jwt,
        &config,
    )
}

pub async fn delete_me(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse> {
    let service = UserService::new((**pool).clone());
    service.deactivate(user.0.id).await?;

    Ok(HttpResponse::NoContent().cookie(removal_cookie()).finish())
}

pub async fn delete_avatar(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse> {
    let service = UserService::new((**pool).clone());
    let updated = service.clear_image(user.0.id).await?;
    Ok(HttpResponse::Ok().json(updated.profile()))
}

pub async fn delete_banner(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse> {
    let service = UserService::new((**pool).clone());
    let updated = service.clear_banner(user.0.id).await?;
    Ok(HttpResponse::Ok().json(updated.profile()))
}

/// Toggle a post in the caller's saved list
pub async fn save_post(
    pool: web::Data<PgPool>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if user.0.role != Role::User {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this operation".to_string(),
        ));
    }

    let service = UserService::new((**pool).clone());
    let saved = service.toggle_saved_post(user.0.id, *post_id).await?;
    let saved_posts = service.saved_post_ids(user.0.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "saved": saved,
        "savedPosts": saved_posts,
    })))
}

pub async fn saved_posts(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse> {
    let service = UserService::new((**pool).clone());
    let posts = service.saved_posts(user.0.id).await?;
    Ok(HttpResponse::Ok().json(posts))
}

// =====================================================================
// Admin
// =====================================================================

pub async fn list_users(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse> {
    let newest_only = query.new.as_deref() == Some("true");
    let service = UserService::new((**pool).clone());
    let users: Vec<UserProfile> = service
        .list(newest_only)
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

pub async fn create_user(_admin: AdminUser) -> Result<HttpResponse> {
    Err(AppError::ServiceFailure(
        "This route is not defined! Please use /auth/register instead".to_string(),
    ))
}

pub async fn user_stats(pool: web::Data<PgPool>, _admin: AdminUser) -> Result<HttpResponse> {
    let service = UserService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.stats().await?))
}

pub async fn get_user(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = UserService::new((**pool).clone());
    let user = service.get_active(*user_id).await?;
    Ok(HttpResponse::Ok().json(user.profile()))
}

pub async fn update_user(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    user_id: web::Path<Uuid>,
    req: web::Json<AdminUserUpdateRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();
    if let Some(username) = &req.username {
        validate_username(username)?;
    }

    let service = UserService::new((**pool).clone());
    let user = service
        .update(
            *user_id,
            UserUpdate {
                name: req.name,
                username: req.username,
                email: req.email,
                country: req.country,
                bio: req.bio,
                about: req.about,
                role: req.role,
                is_active: req.is_active,
                ..UserUpdate::default()
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, "user updated by admin");
    Ok(HttpResponse::Ok().json(user.profile()))
}

pub async fn delete_user(
    pool: web::Data<PgPool>,
    admin: AdminUser,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = UserService::new((**pool).clone());
    service.delete(*user_id).await?;

    tracing::info!(user_id = %user_id, admin_id = %admin.0.id, "user deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me", web::get().to(get_me))
            .route("/update-me", web::patch().to(update_me))
            .route("/delete-me", web::delete().to(delete_me))
            .route("/delete-avatar", web::delete().to(delete_avatar))
            .route("/delete-banner", web::delete().to(delete_banner))
            .route("/saved-posts", web::get().to(saved_posts))
            .route("/stats", web::get().to(user_stats))
            .route("/{postId}/save-post", web::patch().to(save_post))
            .service(
                web::resource("")
                    .route(web::get().to(list_users))
                    .route(web::post().to(create_user)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_user))
                    .route(web::patch().to(update_user))
                    .route(web::delete().to(delete_user)),
            ),
    );
}
