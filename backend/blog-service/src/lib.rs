/// Blog Service Library
///
/// REST backend for a blog and community platform: posts, comments, nested
/// replies, users, categories, reports and moderation, mutes and blocks,
/// newsletter subscriptions, contact messages and upload authorization.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers grouped by resource
/// - `services`: Business logic layer
/// - `moderation`: Visibility filtering, reply trees, report rules
/// - `models`: Row types and response views
/// - `db`: Shared SQL for reactions, mutes and blocks
/// - `middleware`: Authentication, extractors, rate limiting, metrics
/// - `pagination`: `page`/`limit` handling and the page envelope
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod moderation;
pub mod pagination;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
