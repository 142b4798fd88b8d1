/// Auth handlers - registration, login and password management
use crate::config::Config;
use crate::error::Result;
use crate::middleware::{AuthUser, AUTH_COOKIE};
use crate::models::{Role, UserDetails};
use crate::services::{AuthService, EmailService, NewUser, Registration, Session};
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use crypto_core::JwtManager;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 6, max = 50, message = "A name must have between 6 and 50 characters"))]
    pub name: String,
    pub username: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Please tell us your country"))]
    pub country: String,
    #[validate(length(min = 1, message = "Please tell us something about yourself"))]
    pub bio: String,
    pub about: Option<String>,
    pub image: Option<String>,
    pub banner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

/// Body of every token-issuing response; `tokenExpiration` is the JWT `exp`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub details: UserDetails,
    pub role: Role,
    pub token_expiration: i64,
}

fn auth_cookie(config: &Config, token: String) -> Cookie<'static> {
    let production = config.is_production();
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(if production { SameSite::None } else { SameSite::Lax })
        .max_age(CookieDuration::days(config.auth.cookie_expires_in_days))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").http_only(true).finish();
    cookie.make_removal();
    cookie
}

/// Set the session cookie and return `{details, role}`
pub fn session_response(
    status: StatusCode,
    session: Session,
    jwt: &JwtManager,
    config: &Config,
) -> Result<HttpResponse> {
    let claims = jwt.validate_token(&session.token)?;
    let body = SessionResponse {
        details: session.user.details(),
        role: session.user.role,
        token_expiration: claims.exp,
    };

    Ok(HttpResponse::build(status)
        .cookie(auth_cookie(config, session.token))
        .json(body))
}

/// Register a new account
pub async fn register(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtManager>,
    config: web::Data<Config>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();

    let service = AuthService::new((**pool).clone(), jwt.get_ref());
    let session = service
        .register(Registration {
            user: NewUser {
                name: req.name.trim().to_string(),
                username: req.username.trim().to_string(),
                email: req.email.trim().to_string(),
                password_hash: String::new(),
                phone: req.phone,
                date_of_birth: req.date_of_birth,
                country: req.country.trim().to_string(),
                bio: req.bio.trim().to_string(),
                about: req.about,
                image: req.image,
                banner: req.banner,
            },
            password: req.password,
            password_confirm: req.password_confirm,
        })
        .await?;

    session_response(StatusCode::CREATED, session, &jwt, &config)
}

pub async fn login(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtManager>,
    config: web::Data<Config>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new((**pool).clone(), jwt.get_ref());
    let session = service
        .login(req.identifier.as_deref(), req.password.as_deref())
        .await?;

    session_response(StatusCode::OK, session, &jwt, &config)
}

pub async fn logout() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json("User has been logged out"))
}

pub async fn forgot_password(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtManager>,
    mailer: web::Data<EmailService>,
    req: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new((**pool).clone(), jwt.get_ref());
    let email = service
        .forgot_password(req.email.as_deref(), &mailer)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "A link to reset your password has been sent to the email address you provided. \
                    Please check your email and click on the link to set a new password. \
                    This link will expire in 10 minutes.",
        "email": email,
        "success": true,
    })))
}

pub async fn reset_password(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtManager>,
    config: web::Data<Config>,
    token: web::Path<String>,
    req: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new((**pool).clone(), jwt.get_ref());
    let session = service
        .reset_password(&token, &req.password, &req.password_confirm)
        .await?;

    session_response(StatusCode::OK, session, &jwt, &config)
}

pub async fn update_my_password(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtManager>,
    config: web::Data<Config>,
    user: AuthUser,
    req: web::Json<UpdatePasswordRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new((**pool).clone(), jwt.get_ref());
    let session = service
        .update_password(
            user.0.id,
            &req.password_current,
            &req.password,
            &req.password_confirm,
        )
        .await?;

    session_response(StatusCode::OK, session, &jwt, &config)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::get().to(logout))
            .route("/forgot-password", web::post().to(forgot_password))
            .route("/reset-password/{token}", web::patch().to(reset_password))
            .route("/update-my-password", web::patch().to(update_my_password)),
    );
}
