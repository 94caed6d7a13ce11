//! Snapshot and restore handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, CreateSnapshotBody, ListSnapshotsParams, MessageResponse, RestoreSnapshotBody,
};
use crate::app_state::AppState;
use crate::domain::{JobId, RestoreJob, SnapshotJob, SnapshotProgress};
use crate::error::{ErrorResponse, TimeMachineError};

/// `POST /snapshots/create` — Start a dump.
///
/// The dump runs in the background; the response carries the job as it
/// stood when the dump was started. Failures of the dump itself are
/// only visible through later queries.
#[utoipa::path(
    post,
    path = "/api/v1/snapshots/create",
    tag = "Snapshots",
    summary = "Create a snapshot",
    description = "Starts pg_dump in the background and returns the creating job with its full id.",
    request_body = CreateSnapshotBody,
    responses(
        (status = 201, description = "Snapshot creation started", body = ApiResponse<SnapshotJob>),
        (status = 422, description = "Malformed request body"),
    )
)]
pub async fn create_snapshot(
    State(state): State<AppState>,
    Json(body): Json<CreateSnapshotBody>,
) -> impl IntoResponse {
    let tracked = state
        .snapshots
        .create(&body.database_config, &body.snapshot_request);
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok("Snapshot creation started", tracked.initial)),
    )
}

/// `POST /snapshots/restore` — Restore a snapshot into a new database.
///
/// # Errors
///
/// Returns [`TimeMachineError::InvalidRequest`] for an invalid explicit
/// target name.
#[utoipa::path(
    post,
    path = "/api/v1/snapshots/restore",
    tag = "Snapshots",
    summary = "Restore a snapshot",
    description = "Creates the target database and replays the dump into it with psql, in the background.",
    request_body = RestoreSnapshotBody,
    responses(
        (status = 201, description = "Restore operation started", body = ApiResponse<RestoreJob>),
        (status = 400, description = "Invalid target database name", body = ErrorResponse),
    )
)]
pub async fn restore_snapshot(
    State(state): State<AppState>,
    Json(body): Json<RestoreSnapshotBody>,
) -> Result<impl IntoResponse, TimeMachineError> {
    let tracked = state
        .restores
        .create(&body.database_config, &body.restore_request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Restore operation started", tracked.initial)),
    ))
}

/// `GET /snapshots` — List snapshots in the backup directory.
///
/// # Errors
///
/// Returns [`TimeMachineError::InvalidRequest`] without `database_id`,
/// [`TimeMachineError::Io`] if the directory cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/snapshots",
    tag = "Snapshots",
    summary = "List snapshots",
    description = "Returns every dump in the backup directory, newest first, with status inferred from the file.",
    params(ListSnapshotsParams),
    responses(
        (status = 200, description = "Snapshots retrieved successfully", body = ApiResponse<Vec<SnapshotJob>>),
        (status = 400, description = "Missing database_id", body = ErrorResponse),
    )
)]
pub async fn list_snapshots(
    State(state): State<AppState>,
    Query(params): Query<ListSnapshotsParams>,
) -> Result<impl IntoResponse, TimeMachineError> {
    if params.database_id.is_empty() {
        return Err(TimeMachineError::InvalidRequest(
            "database_id query parameter is required".to_string(),
        ));
    }
    let snapshots = state.snapshots.list(&params.database_id).await?;
    Ok(Json(ApiResponse::ok("Snapshots retrieved successfully", snapshots)))
}

/// `GET /snapshots/{id}` — One snapshot.
///
/// # Errors
///
/// Returns [`TimeMachineError::NotFound`] if no dump matches.
#[utoipa::path(
    get,
    path = "/api/v1/snapshots/{id}",
    tag = "Snapshots",
    summary = "Get a snapshot",
    params(
        ("id" = String, Path, description = "Snapshot id or its 8-character prefix"),
    ),
    responses(
        (status = 200, description = "Snapshot retrieved successfully", body = ApiResponse<SnapshotJob>),
        (status = 404, description = "Snapshot not found", body = ErrorResponse),
    )
)]
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TimeMachineError> {
    let snapshot = state.snapshots.get(&id).await?;
    Ok(Json(ApiResponse::ok("Snapshot retrieved successfully", snapshot)))
}

/// `DELETE /snapshots/{id}` — Delete a snapshot's dump file.
///
/// # Errors
///
/// Returns [`TimeMachineError::Io`] if the file cannot be removed.
#[utoipa::path(
    delete,
    path = "/api/v1/snapshots/{id}",
    tag = "Snapshots",
    summary = "Delete a snapshot",
    description = "Removes the dump file. Deleting an unknown snapshot succeeds.",
    params(
        ("id" = String, Path, description = "Snapshot id or its 8-character prefix"),
    ),
    responses(
        (status = 200, description = "Snapshot deleted successfully", body = MessageResponse),
        (status = 500, description = "Filesystem failure", body = ErrorResponse),
    )
)]
pub async fn delete_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TimeMachineError> {
    state.snapshots.delete(&id).await?;
    Ok(Json(MessageResponse::ok("Snapshot deleted successfully")))
}

/// `GET /snapshots/{id}/progress` — Estimated progress of a dump.
///
/// # Errors
///
/// Returns [`TimeMachineError::Io`] if the directory cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/snapshots/{id}/progress",
    tag = "Snapshots",
    summary = "Get snapshot progress",
    description = "Time-based estimate from the dump file's last write. Unknown ids read as initializing.",
    params(
        ("id" = String, Path, description = "Snapshot id or its 8-character prefix"),
    ),
    responses(
        (status = 200, description = "Snapshot progress retrieved successfully", body = ApiResponse<SnapshotProgress>),
    )
)]
pub async fn snapshot_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TimeMachineError> {
    let progress = state.snapshots.progress(&id).await?;
    Ok(Json(ApiResponse::ok(
        "Snapshot progress retrieved successfully",
        progress,
    )))
}

/// `GET /restores/{id}` — State of a restore started by this process.
///
/// # Errors
///
/// Returns [`TimeMachineError::NotFound`] for unknown ids.
#[utoipa::path(
    get,
    path = "/api/v1/restores/{id}",
    tag = "Snapshots",
    summary = "Get a restore",
    description = "Restore jobs are kept in memory and do not survive a restart.",
    params(
        ("id" = uuid::Uuid, Path, description = "Restore job UUID"),
    ),
    responses(
        (status = 200, description = "Restore retrieved successfully", body = ApiResponse<RestoreJob>),
        (status = 404, description = "Restore not found", body = ErrorResponse),
    )
)]
pub async fn get_restore(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, TimeMachineError> {
    let job = state.restores.get(JobId::from_uuid(id)).await?;
    Ok(Json(ApiResponse::ok("Restore retrieved successfully", job)))
}

/// Snapshot and restore routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/snapshots", get(list_snapshots))
        .route("/snapshots/create", post(create_snapshot))
        .route("/snapshots/restore", post(restore_snapshot))
        .route("/snapshots/{id}", get(get_snapshot).delete(delete_snapshot))
        .route("/snapshots/{id}/progress", get(snapshot_progress))
        .route("/restores/{id}", get(get_restore))
}
