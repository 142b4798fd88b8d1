/// HTTP request handlers for blog-service
///
/// Route groups mounted under `/api/v1`:
/// - auth, users: sessions, profiles, saved posts, admin user management
/// - posts, comments, replies, categories: blog content
/// - reports, mutes, blocks, admin dashboard: moderation
/// - newsletter, contacts, upload: outward integrations
/// - health: liveness and readiness probes
pub mod auth;
pub mod blocks;
pub mod categories;
pub mod comments;
pub mod contacts;
pub mod dashboard;
pub mod health;
pub mod mutes;
pub mod newsletter;
pub mod posts;
pub mod replies;
pub mod reports;
pub mod upload;
pub mod users;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::moderation::ViewerContext;
use crate::services::RelationService;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

pub use health::HealthState;

/// Request bodies above this size are rejected
pub const JSON_LIMIT_BYTES: usize = 10 * 1024;

/// Default page size for general listings
pub const DEFAULT_PAGE_LIMIT: i64 = 20;
/// Default page size for per-user listings
pub const USER_PAGE_LIMIT: i64 = 6;

/// `?includeHidden=true` opens the moderation view for admins
#[derive(Debug, Default, Deserialize)]
pub struct VisibilityQuery {
    #[serde(rename = "includeHidden")]
    pub include_hidden: Option<String>,
}

impl VisibilityQuery {
    pub fn requested(&self) -> bool {
        self.include_hidden.as_deref() == Some("true")
    }
}

/// Visibility filter for the caller of this request
pub async fn viewer_context(
    pool: &PgPool,
    viewer: Option<&User>,
    query: &VisibilityQuery,
) -> Result<ViewerContext> {
    RelationService::new(pool.clone())
        .viewer_context(viewer, query.requested())
        .await
}

/// Client-facing text for a rejected JSON body
fn payload_message(err: &JsonPayloadError) -> String {
    match err {
        JsonPayloadError::Deserialize(err) => {
            let text = err.to_string();
            match text.split_once(" at line ") {
                Some((message, _)) => message.to_string(),
                None => text,
            }
        }
        other => other.to_string(),
    }
}

/// JSON extractor settings shared by every route
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| AppError::BadRequest(payload_message(&err)).into())
}

/// Fallback for unmatched routes
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse> {
    Err(AppError::NotFound(format!(
        "Can't find {} on this server",
        req.path()
    )))
}

/// Register every `/api/v1` route group
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(auth::configure)
        .configure(users::configure)
        .configure(posts::configure)
        .configure(comments::configure)
        .configure(replies::configure)
        .configure(reports::configure)
        .configure(mutes::configure)
        .configure(blocks::configure)
        .configure(dashboard::configure)
        .configure(newsletter::configure)
        .configure(contacts::configure)
        .configure(categories::configure)
        .configure(upload::configure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[::core::prelude::v1::test]
    fn test_include_hidden_must_be_literal_true() {
        let query = VisibilityQuery {
            include_hidden: Some("true".into()),
        };
        assert!(query.requested());
        assert!(!VisibilityQuery::default().requested());
        assert!(!VisibilityQuery {
            include_hidden: Some("1".into())
        }
        .requested());
    }

    #[::core::prelude::v1::test]
    fn test_deserialize_errors_drop_position() {
        let err = serde_json::from_str::<crate::moderation::TargetType>("\"post\"").unwrap_err();
        let message = payload_message(&JsonPayloadError::Deserialize(err));
        assert_eq!(
            message,
            "Invalid targetType: post. Must be one of 'User', 'Comment', or 'Reply'"
        );
    }

    #[actix_web::test]
    async fn test_unknown_route_message() {
        let app = test::init_service(App::new().default_service(web::to(not_found))).await;
        let req = test::TestRequest::get().uri("/api/v1/nowhere").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Can't find /api/v1/nowhere on this server");
    }
}
