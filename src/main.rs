//! First-blood Telegram sidecar entrypoint.
//!
//! This binary launches an Axum-based HTTP server exposing the announcer's
//! admin surface against the host platform's database.
//!
//! Endpoints:
//! - `GET /admin/first_blood_telegram/` – current settings and placeholders
//! - `POST /admin/first_blood_telegram/` – partial settings update
//! - `POST /admin/first_blood_telegram/test` – manual test send
//! - `GET /health` – liveness probe
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control binding address
//! - `DATABASE_URL` points at the host platform's database
//! - `ADMIN_API_KEY` guards the admin routes
//! - `CONFIG_FILE` optional path to `config.toml`

use axum::http::Method;
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors;

use first_blood_telegram::config::ServiceConfig;
use first_blood_telegram::handlers::{self, AdminState};
use first_blood_telegram::notifier::{ChatSink, TelegramNotifier};
use first_blood_telegram::security::AdminAuth;
use first_blood_telegram::settings::SettingsStore;
use first_blood_telegram::sig_down::SigDown;
use first_blood_telegram::telemetry::Telemetry;

/// Initializes the announcer sidecar.
///
/// - Loads `.env` variables.
/// - Initializes tracing.
/// - Connects to the host platform's database.
/// - Starts an Axum HTTP server with the admin surface.
///
/// Binds to the address specified by the `HOST` and `PORT` env vars.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    let telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    // Load configuration
    let app_config = match ServiceConfig::from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            tracing::info!("Using default configuration");
            ServiceConfig::default()
        }
    };

    // Abort early without a database to talk to
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::error!("DATABASE_URL is not set");
            std::process::exit(1);
        }
    };
    let pool = match SqlitePoolOptions::new()
        .max_connections(app_config.database.max_connections)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to {}: {}", database_url, e);
            std::process::exit(1);
        }
    };

    let notifier = match TelegramNotifier::new() {
        Ok(notifier) => notifier,
        Err(e) => {
            tracing::error!("Failed to build telegram client: {}", e);
            std::process::exit(1);
        }
    };
    let sink: Arc<dyn ChatSink> = Arc::new(notifier);

    let state = Arc::new(AdminState {
        settings: SettingsStore::new(pool.clone()),
        sink,
        pool,
    });
    let admin_auth = AdminAuth::from_env();

    // Configure CORS
    let cors_layer = if app_config.cors.allowed_origins.is_empty() {
        tracing::info!("CORS: Allowing all origins (*)");
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any)
    } else {
        tracing::info!("CORS: Restricting to {:?}", app_config.cors.allowed_origins);
        let origins: Vec<_> = app_config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors::CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any)
    };

    let http_endpoints = handlers::routes(state, admin_auth)
        .layer(tower_http::limit::RequestBodyLimitLayer::new(
            app_config.request.max_body_size_bytes,
        ))
        .layer(telemetry.http_tracing())
        .layer(cors_layer);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::new(host.parse().expect("HOST must be a valid IP address"), port);
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    let sig_down = SigDown::try_new()?;
    let axum_cancellation_token = sig_down.cancellation_token();
    let axum_graceful_shutdown = async move { axum_cancellation_token.cancelled().await };
    axum::serve(
        listener,
        http_endpoints.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(axum_graceful_shutdown)
    .await?;

    Ok(())
}
