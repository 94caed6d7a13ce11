//! Request bodies for snapshot and restore endpoints.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{ConnectionDescriptor, RestoreRequest, SnapshotRequest};

/// Body of `POST /api/v1/snapshots/create`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSnapshotBody {
    /// Database to dump.
    pub database_config: ConnectionDescriptor,
    /// Snapshot metadata.
    pub snapshot_request: SnapshotRequest,
}

/// Body of `POST /api/v1/snapshots/restore`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RestoreSnapshotBody {
    /// Server to restore onto.
    pub database_config: ConnectionDescriptor,
    /// Snapshot and target selection.
    pub restore_request: RestoreRequest,
}

/// Query parameters of `GET /api/v1/snapshots`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSnapshotsParams {
    /// Owning database id, echoed on every listed snapshot. Required.
    #[serde(default)]
    pub database_id: String,
}
