//! pg-timemachine server entry point.
//!
//! Starts the Axum HTTP server with the REST endpoints.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pg_timemachine::api;
use pg_timemachine::app_state::AppState;
use pg_timemachine::config::TimeMachineConfig;
use pg_timemachine::persistence::{ConnectionCache, DirectoryIndex};
use pg_timemachine::service::{ProcessRunner, ToolPaths};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    // Load configuration
    let config = TimeMachineConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting pg-timemachine");

    // Backup directory
    let index = DirectoryIndex::new(&config.backup_dir);
    index.ensure_dir().await?;
    tracing::info!(backup_dir = %index.backup_dir().display(), "backup directory ready");

    // Client tools
    let tools = ToolPaths::discover(config.pg_dump_path.clone(), config.psql_path.clone());
    if let Err(e) = tools.validate() {
        tracing::warn!(error = %e, "PostgreSQL client tools unavailable; snapshots and restores will fail");
    }

    // Build application state
    let connections = Arc::new(ConnectionCache::new(
        config.database_max_connections,
        config.connect_timeout(),
    ));
    let app_state = AppState::new(
        Arc::new(index),
        Arc::clone(&connections),
        Arc::new(tools),
        Arc::new(ProcessRunner),
    )
    .with_restore_retention(config.retained_restores);

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_allowed_origins))
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    connections.close_all().await;
    tracing::info!("server stopped");
    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
