//! HTTP surface tests that run without a database
//!
//! The app is wired the same way as `main.rs`, backed by a pool that never
//! connects, so every request here must be answered before the first query.

mod common;

use actix_web::{body, http::StatusCode, test, web, App};
use blog_service::config::RateLimitConfig;
use blog_service::handlers;
use blog_service::middleware::{JwtAuthMiddleware, RateLimitMiddleware};
use blog_service::services::{EmailService, UploadSigner};
use crypto_core::JwtManager;
use serial_test::serial;
use std::sync::Arc;

macro_rules! blog_app {
    ($config:expr, $limits:expr) => {{
        let config = $config;
        let pool = common::lazy_pool();
        let jwt = Arc::new(JwtManager::new(
            &config.auth.jwt_secret,
            config.auth.jwt_expires_in_secs,
        ));
        let mailer = EmailService::new(&config.email, &config.app).expect("mailer");

        test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .app_data(web::Data::from(jwt.clone()))
                .app_data(web::Data::new(mailer))
                .app_data(web::Data::new(UploadSigner::new(&config.upload)))
                .app_data(web::Data::new(config.clone()))
                .app_data(handlers::json_config())
                .service(
                    web::scope("/api/v1")
                        .wrap(JwtAuthMiddleware::new(jwt, pool))
                        .wrap(RateLimitMiddleware::new(&$limits))
                        .configure(handlers::configure),
                )
                .default_service(web::to(handlers::not_found)),
        )
        .await
    }};
}

fn generous_limits() -> RateLimitConfig {
    RateLimitConfig::default()
}

#[actix_web::test]
#[serial]
async fn test_unknown_path_is_reported() {
    let app = blog_app!(common::test_config(), generous_limits());

    let req = test::TestRequest::get().uri("/api/v2/posts").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Can't find /api/v2/posts on this server");
}

#[actix_web::test]
#[serial]
async fn test_protected_routes_require_login() {
    let app = blog_app!(common::test_config(), generous_limits());

    for (method, uri) in [
        ("POST", "/api/v1/posts"),
        ("GET", "/api/v1/users/me"),
        ("GET", "/api/v1/mutes"),
        ("GET", "/api/v1/blocks"),
        ("POST", "/api/v1/reports"),
        ("GET", "/api/v1/admin/dashboard"),
    ] {
        let req = match method {
            "POST" => test::TestRequest::post()
                .uri(uri)
                .set_json(serde_json::json!({})),
            _ => test::TestRequest::get().uri(uri),
        }
        .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(
            body["message"],
            "You are not logged in! Please log in to get access"
        );
    }
}

#[actix_web::test]
#[serial]
async fn test_forged_token_is_rejected() {
    let app = blog_app!(common::test_config(), generous_limits());

    let forged = JwtManager::new("some-other-secret-some-other-secret", 3600)
        .generate_token(uuid::Uuid::new_v4(), "mallory@example.com")
        .expect("token");

    let req = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header(("Authorization", format!("Bearer {}", forged)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_registration_validation_runs_before_storage() {
    let app = blog_app!(common::test_config(), generous_limits());

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(serde_json::json!({
            "name": "Al",
            "username": "al",
            "email": "not-an-email",
            "password": "Passw0rd!",
            "passwordConfirm": "Passw0rd!",
            "country": "Nowhere",
            "bio": "hi"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(res).await;
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("email"), "unexpected message: {}", message);
}

#[actix_web::test]
#[serial]
async fn test_malformed_json_is_a_bad_request() {
    let app = blog_app!(common::test_config(), generous_limits());

    let req = test::TestRequest::post()
        .uri("/api/v1/contacts")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"name\": ")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "fail");
}

#[actix_web::test]
#[serial]
async fn test_oversized_body_is_rejected() {
    let app = blog_app!(common::test_config(), generous_limits());

    let req = test::TestRequest::post()
        .uri("/api/v1/contacts")
        .set_json(serde_json::json!({
            "name": "Someone Curious",
            "email": "curious@example.com",
            "subject": "Long",
            "message": "x".repeat(handlers::JSON_LIMIT_BYTES + 1),
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_rate_limit_applies_per_client() {
    let app = blog_app!(
        common::test_config(),
        RateLimitConfig {
            max_requests: 2,
            ..RateLimitConfig::default()
        }
    );

    let call = |ip: &'static str| {
        test::TestRequest::get()
            .uri("/api/v1/health/live")
            .insert_header(("X-Forwarded-For", ip))
            .to_request()
    };

    for _ in 0..2 {
        let res = test::call_service(&app, call("203.0.113.7")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    // Middleware rejections surface as service errors
    let err = test::try_call_service(&app, call("203.0.113.7"))
        .await
        .unwrap_err();
    let res = err.error_response();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = body::to_bytes(res.into_body()).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body["message"],
        "Too many request from this IP, Please try again in 15 minutes"
    );

    // A forged leading hop still lands on the proxy-appended address
    let err = test::try_call_service(&app, call("198.51.100.99, 203.0.113.7"))
        .await
        .unwrap_err();
    assert_eq!(
        err.error_response().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    let res = test::call_service(&app, call("198.51.100.20")).await;
    assert_eq!(res.status(), StatusCode::OK);
}
