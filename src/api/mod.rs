//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints are mounted under `/api/v1`. With the `swagger-ui`
//! feature the OpenAPI document is served at `/api-docs/openapi.json`
//! and browsable at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document covering every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "pg-timemachine", description = "Snapshot and restore service for PostgreSQL"),
    paths(
        handlers::database::test_connection,
        handlers::database::save_connection,
        handlers::database::database_info,
        handlers::snapshot::create_snapshot,
        handlers::snapshot::restore_snapshot,
        handlers::snapshot::list_snapshots,
        handlers::snapshot::get_snapshot,
        handlers::snapshot::delete_snapshot,
        handlers::snapshot::snapshot_progress,
        handlers::snapshot::get_restore,
        handlers::system::health_handler,
        handlers::system::info_handler,
    ),
    tags(
        (name = "Database", description = "Connection checks and database facts"),
        (name = "Snapshots", description = "Dump, restore and snapshot queries"),
        (name = "System", description = "Health and tool information"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().nest("/api/v1", handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
