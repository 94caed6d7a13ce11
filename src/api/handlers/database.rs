//! Connection handlers: test, save, info.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, MessageResponse};
use crate::app_state::AppState;
use crate::domain::ConnectionDescriptor;
use crate::error::{ErrorResponse, TimeMachineError};
use crate::persistence::DatabaseInfo;

/// `POST /database/test` — Check that a database is reachable.
///
/// # Errors
///
/// Returns [`TimeMachineError::Connect`] if connecting or pinging fails.
#[utoipa::path(
    post,
    path = "/api/v1/database/test",
    tag = "Database",
    summary = "Test a connection",
    description = "Opens a connection with the given parameters, pings the server and closes it again.",
    request_body = ConnectionDescriptor,
    responses(
        (status = 200, description = "Connection test successful", body = MessageResponse),
        (status = 502, description = "Server unreachable or login rejected", body = ErrorResponse),
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Json(descriptor): Json<ConnectionDescriptor>,
) -> Result<impl IntoResponse, TimeMachineError> {
    state.connections.test(&descriptor).await?;
    Ok(Json(MessageResponse::ok("Connection test successful")))
}

/// `POST /database/save` — Validate a descriptor and assign it an id.
///
/// # Errors
///
/// Returns [`TimeMachineError::Connect`] if the connection test fails.
#[utoipa::path(
    post,
    path = "/api/v1/database/save",
    tag = "Database",
    summary = "Save a connection",
    description = "Tests the connection and returns the descriptor with an id and timestamps. The password is never echoed back.",
    request_body = ConnectionDescriptor,
    responses(
        (status = 201, description = "Connection saved successfully", body = ApiResponse<ConnectionDescriptor>),
        (status = 502, description = "Server unreachable or login rejected", body = ErrorResponse),
    )
)]
pub async fn save_connection(
    State(state): State<AppState>,
    Json(descriptor): Json<ConnectionDescriptor>,
) -> Result<impl IntoResponse, TimeMachineError> {
    let saved = state.connections.save(&descriptor).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Connection saved successfully", saved)),
    ))
}

/// `POST /database/info` — Size, table count and schemas of a database.
///
/// # Errors
///
/// Returns [`TimeMachineError::Connect`] if the database is unreachable.
#[utoipa::path(
    post,
    path = "/api/v1/database/info",
    tag = "Database",
    summary = "Get database info",
    description = "Connects (caching the handle) and reports size, table count and non-system schemas.",
    request_body = ConnectionDescriptor,
    responses(
        (status = 200, description = "Database info retrieved successfully", body = ApiResponse<DatabaseInfo>),
        (status = 502, description = "Server unreachable or login rejected", body = ErrorResponse),
    )
)]
pub async fn database_info(
    State(state): State<AppState>,
    Json(descriptor): Json<ConnectionDescriptor>,
) -> Result<impl IntoResponse, TimeMachineError> {
    let info = state.connections.database_info(&descriptor).await?;
    Ok(Json(ApiResponse::ok("Database info retrieved successfully", info)))
}

/// Connection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/database/test", post(test_connection))
        .route("/database/save", post(save_connection))
        .route("/database/info", post(database_info))
}
