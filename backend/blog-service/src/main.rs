use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use blog_service::handlers::{self, health::SERVICE_NAME, HealthState};
use blog_service::middleware::{JwtAuthMiddleware, MetricsMiddleware, RateLimitMiddleware};
use blog_service::services::{EmailService, MailchimpClient, UploadSigner};
use blog_service::{metrics, Config};
use crypto_core::JwtManager;
use db_pool::{create_pool, DbConfig};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

/// Container probe: exit 0 when `/api/v1/health` answers 2xx
async fn healthcheck() -> io::Result<()> {
    let port = std::env::var("BLOG_SERVICE_PORT").unwrap_or_else(|_| "8080".to_string());
    let url = format!("http://127.0.0.1:{}/api/v1/health", port);
    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => {
            eprintln!("healthcheck HTTP status: {}", resp.status());
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"))
        }
        Err(e) => {
            eprintln!("healthcheck HTTP error: {}", e);
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"))
        }
    }
}

fn fatal(context: &str, err: impl std::fmt::Display) -> ! {
    tracing::error!("{}: {}", context, err);
    eprintln!("ERROR: {}: {}", context, err);
    std::process::exit(1);
}

/// Blog Service
///
/// Serves the blog REST API under `/api/v1`, Prometheus metrics under
/// `/metrics`, and health probes under `/api/v1/health`.
///
/// Runs on `BLOG_SERVICE_PORT` (default 8080). Pass `healthcheck` as the
/// first argument to probe a running instance instead of starting one.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        return healthcheck().await;
    }

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => fatal("Failed to load configuration", e),
    };

    tracing::info!("Starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let mut db_cfg = match DbConfig::from_env(SERVICE_NAME) {
        Ok(cfg) => cfg,
        Err(e) => fatal("Invalid database configuration", e),
    };
    if db_cfg.max_connections < config.database.max_connections {
        db_cfg.max_connections = config.database.max_connections;
    }
    db_cfg.log_config();

    let db_pool = match create_pool(db_cfg).await {
        Ok(pool) => pool,
        Err(e) => fatal("Failed to create database pool", e),
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
        fatal("Database migration failed", e);
    }
    tracing::info!("Database migrations applied");

    let jwt = Arc::new(JwtManager::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expires_in_secs,
    ));
    let mailer = match EmailService::new(&config.email, &config.app) {
        Ok(mailer) => web::Data::new(mailer),
        Err(e) => fatal("Failed to initialize email service", e),
    };
    let mailchimp = match MailchimpClient::new(&config.mailchimp) {
        Ok(client) => web::Data::new(client),
        Err(e) => fatal("Failed to initialize Mailchimp client", e),
    };
    let signer = web::Data::new(UploadSigner::new(&config.upload));
    let rate_limiter = RateLimitMiddleware::new(&config.rate_limit);

    let pool_data = web::Data::new(db_pool.clone());
    let jwt_data = web::Data::from(jwt.clone());
    let health_state = web::Data::new(HealthState::new(db_pool.clone()));
    let config_data = web::Data::new(config.clone());

    let bind_address = config.bind_address();
    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in config.cors.allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(pool_data.clone())
            .app_data(jwt_data.clone())
            .app_data(config_data.clone())
            .app_data(mailer.clone())
            .app_data(mailchimp.clone())
            .app_data(signer.clone())
            .app_data(health_state.clone())
            .app_data(handlers::json_config())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(jwt.clone(), db_pool.clone()))
                    .wrap(rate_limiter.clone())
                    .wrap(MetricsMiddleware)
                    .configure(handlers::configure),
            )
            .default_service(web::to(handlers::not_found))
    })
    .bind(&bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();
    let mut server_task = tokio::spawn(server);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let joined = tokio::select! {
        result = &mut server_task => result,
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
            server_task.await
        }
    };

    match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("HTTP server task join error: {}", e);
            Err(io::Error::new(io::ErrorKind::Other, e.to_string()))
        }
    }
}
