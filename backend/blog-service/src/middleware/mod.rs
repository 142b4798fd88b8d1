/// HTTP middleware utilities for blog-service
///
/// `JwtAuthMiddleware` resolves the caller once per request and stores an
/// [`AuthOutcome`]; the extractors below turn that into per-route access
/// rules (`AuthUser`, `ActiveUser`, `AdminUser`, `MaybeUser`).
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{http::header, Error, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use crypto_core::JwtManager;
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::metrics;
use crate::models::User;
use crate::services::UserService;

pub mod permissions;
pub mod rate_limit;

pub use rate_limit::RateLimitMiddleware;

pub const AUTH_COOKIE: &str = "authToken";

// ============================================================================
// Authentication
// ============================================================================

/// Result of resolving the caller for one request
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// No token was presented
    Anonymous,
    Authenticated(User),
    /// A token was presented but could not be honoured
    Rejected(AppError),
}

/// Bearer header first, then the session cookie
fn extract_token(req: &ServiceRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        req.cookie(AUTH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Validate the token and load the user behind it
///
/// A soft ban whose expiry has passed is lifted here.
pub async fn authenticate(jwt: &JwtManager, pool: &PgPool, token: &str) -> Result<User, AppError> {
    let claims = jwt.validate_token(token)?;
    let user_id = claims.user_id()?;

    let users = UserService::new(pool.clone());
    let mut user = users.find_active(user_id).await?.ok_or_else(|| {
        AppError::Unauthorized("The user belonging to this token does no longer exist".to_string())
    })?;

    if user.changed_password_after(claims.iat) {
        return Err(AppError::Unauthorized(
            "User recently changed password! Please log in again".to_string(),
        ));
    }

    if user.soft_ban_lapsed(Utc::now()) {
        users.lift_soft_ban(user.id).await?;
        user.is_soft_banned = false;
        user.soft_ban_expires = None;
    }

    Ok(user)
}

pub struct JwtAuthMiddleware {
    jwt: Arc<JwtManager>,
    pool: PgPool,
}

impl JwtAuthMiddleware {
    pub fn new(jwt: Arc<JwtManager>, pool: PgPool) -> Self {
        Self { jwt, pool }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
            pool: self.pool.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    jwt: Arc<JwtManager>,
    pool: PgPool,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt = self.jwt.clone();
        let pool = self.pool.clone();
        let token = extract_token(&req);

        Box::pin(async move {
            let outcome = match token {
                None => AuthOutcome::Anonymous,
                Some(token) => match authenticate(&jwt, &pool, &token).await {
                    Ok(user) => AuthOutcome::Authenticated(user),
                    Err(err) => {
                        tracing::debug!(error = %err, path = %req.path(), "token rejected");
                        AuthOutcome::Rejected(err)
                    }
                },
            };

            req.extensions_mut().insert(outcome);
            service.call(req).await
        })
    }
}

// ============================================================================
// Extractors
// ============================================================================

fn outcome(req: &HttpRequest) -> AuthOutcome {
    req.extensions()
        .get::<AuthOutcome>()
        .cloned()
        .unwrap_or(AuthOutcome::Anonymous)
}

fn require_user(req: &HttpRequest) -> Result<User, AppError> {
    match outcome(req) {
        AuthOutcome::Authenticated(user) => Ok(user),
        AuthOutcome::Rejected(err) => Err(err),
        AuthOutcome::Anonymous => Err(AppError::Unauthorized(
            "You are not logged in! Please log in to get access".to_string(),
        )),
    }
}

fn require_active(req: &HttpRequest) -> Result<User, AppError> {
    let user = require_user(req)?;
    if user.is_soft_banned {
        return Err(AppError::Forbidden(
            "Your account is temporarily restricted due to a policy violation".to_string(),
        ));
    }
    Ok(user)
}

fn require_admin(req: &HttpRequest) -> Result<User, AppError> {
    let user = require_user(req)?;
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this operation".to_string(),
        ));
    }
    Ok(user)
}

/// Any authenticated user
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Authenticated and not soft-banned
#[derive(Debug, Clone)]
pub struct ActiveUser(pub User);

#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// The caller when a valid token was presented; never fails
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(require_user(req).map(AuthUser))
    }
}

impl FromRequest for ActiveUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(require_active(req).map(ActiveUser))
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(require_admin(req).map(AdminUser))
    }
}

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = match outcome(req) {
            AuthOutcome::Authenticated(user) => Some(user),
            _ => None,
        };
        ready(Ok(MaybeUser(user)))
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Records request count and latency per method/status
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let status = match &result {
                Ok(res) => res.status().as_u16(),
                Err(err) => err.as_response_error().status_code().as_u16(),
            };
            metrics::record_http(&method, status, start.elapsed().as_secs_f64());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.0.username)
    }

    async fn optional(user: MaybeUser) -> HttpResponse {
        HttpResponse::Ok().body(if user.0.is_some() { "user" } else { "anonymous" })
    }

    #[actix_web::test]
    async fn test_extractors_without_middleware_are_anonymous() {
        let app = test::init_service(
            App::new()
                .route("/me", web::get().to(whoami))
                .route("/maybe", web::get().to(optional)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(
            body["message"],
            "You are not logged in! Please log in to get access"
        );

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/maybe").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "anonymous");
    }

    #[::core::prelude::v1::test]
    fn test_bearer_header_wins_over_cookie() {
        let req = test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer header-token"))
            .cookie(actix_web::cookie::Cookie::new(AUTH_COOKIE, "cookie-token"))
            .to_srv_request();
        assert_eq!(extract_token(&req).as_deref(), Some("header-token"));

        let req = test::TestRequest::default()
            .cookie(actix_web::cookie::Cookie::new(AUTH_COOKIE, "cookie-token"))
            .to_srv_request();
        assert_eq!(extract_token(&req).as_deref(), Some("cookie-token"));

        let req = test::TestRequest::default().to_srv_request();
        assert_eq!(extract_token(&req), None);
    }
}
