//! System endpoints: health check and tool information.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    ApiResponse, ApplicationDto, HealthDto, ServicesDto, SystemInfoDto, ToolHealthDto,
    ToolInfoDto,
};
use crate::app_state::AppState;
use crate::service::tools::Tool;

/// Display name reported by `GET /system/info`.
pub const APPLICATION_NAME: &str = "PostgreSQL Time Machine";

/// `GET /system/health` — Service and client tool health.
///
/// Always answers 200; `success` is `false` and `status` is `degraded`
/// while `pg_dump` or `psql` is missing.
#[utoipa::path(
    get,
    path = "/api/v1/system/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, timestamp and the status of the PostgreSQL client tools.",
    responses(
        (status = 200, description = "System health check", body = ApiResponse<HealthDto>),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let tools = match state.tools.validate() {
        Ok(()) => ToolHealthDto {
            status: "healthy".to_string(),
            error: None,
            versions: Some(state.tools.versions(state.runner.as_ref()).await),
        },
        Err(e) => ToolHealthDto {
            status: "error".to_string(),
            error: Some(e.to_string()),
            versions: None,
        },
    };
    let healthy = tools.error.is_none();

    let health = HealthDto {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: ServicesDto {
            postgresql_tools: tools,
        },
    };
    Json(ApiResponse {
        success: healthy,
        message: "System health check".to_string(),
        data: health,
    })
}

/// `GET /system/info` — Application identity and tool locations.
#[utoipa::path(
    get,
    path = "/api/v1/system/info",
    tag = "System",
    summary = "System information",
    description = "Returns the application name and version plus the resolved pg_dump and psql paths and versions.",
    responses(
        (status = 200, description = "System information", body = ApiResponse<SystemInfoDto>),
    )
)]
pub async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let paths: BTreeMap<String, String> = [Tool::PgDump, Tool::Psql]
        .into_iter()
        .map(|tool| (tool.to_string(), state.tools.path(tool).display().to_string()))
        .collect();

    let postgresql_tools = match state.tools.validate() {
        Ok(()) => ToolInfoDto {
            available: true,
            error: None,
            versions: Some(state.tools.versions(state.runner.as_ref()).await),
            paths,
        },
        Err(e) => ToolInfoDto {
            available: false,
            error: Some(e.to_string()),
            versions: None,
            paths,
        },
    };

    Json(ApiResponse::ok(
        "System information",
        SystemInfoDto {
            application: ApplicationDto {
                name: APPLICATION_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            postgresql_tools,
        },
    ))
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/system/health", get(health_handler))
        .route("/system/info", get(info_handler))
}
