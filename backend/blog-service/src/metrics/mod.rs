//! Prometheus metrics for blog-service.
//!
//! Exposes HTTP and moderation collectors and an HTTP handler for the
//! `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Total HTTP requests by method and status code.
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_http_requests_total",
        "Total HTTP requests segmented by method and status",
        &["method", "status"]
    )
    .expect("failed to register blog_http_requests_total");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blog_http_request_duration_seconds",
        "HTTP request latency segmented by method",
        &["method"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("failed to register blog_http_request_duration_seconds");

    /// Reports filed, by target type (User/Comment/Reply).
    pub static ref REPORTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_reports_total",
        "Reports filed segmented by target type",
        &["target_type"]
    )
    .expect("failed to register blog_reports_total");

    /// Moderation side effects applied by `action_taken` reviews.
    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_moderation_actions_total",
        "Moderation actions applied segmented by action",
        &["action"]
    )
    .expect("failed to register blog_moderation_actions_total");
}

pub fn record_http(method: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(duration_secs);
}

pub fn record_report(target_type: &str) {
    REPORTS_TOTAL.with_label_values(&[target_type]).inc();
}

pub fn record_moderation_action(action: &str) {
    MODERATION_ACTIONS_TOTAL.with_label_values(&[action]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
