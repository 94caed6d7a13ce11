//! Snapshot job records and progress reports.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a snapshot as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// The dump tool is (probably) still writing.
    Creating,
    /// The dump finished.
    Completed,
    /// The dump failed or the file looks truncated.
    Failed,
}

/// A snapshot job.
///
/// Built in two ways that are deliberately not reconciled: the ephemeral
/// record returned by `create` (full UUID id, updated by the dump task)
/// and the record derived from the dump file on every later query
/// (8-character id, status inferred from size and mtime).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotJob {
    /// Full UUID on the creation response, id prefix on derived records.
    pub id: String,
    /// Owning database id as supplied by the caller.
    pub database_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Location of the dump file.
    #[schema(value_type = String)]
    pub file_path: PathBuf,
    /// Size of the dump file in bytes.
    pub file_size: u64,
    /// Lifecycle status.
    pub status: SnapshotStatus,
    /// Failure detail, when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Completion time, when `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Caller input for a new snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotRequest {
    /// Owning database id.
    #[serde(default)]
    pub database_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Status reported by the progress estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// The dump is assumed to be running.
    InProgress,
    /// The dump is assumed to be finished.
    Completed,
}

/// Coarse, time-based progress of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotProgress {
    /// Snapshot id as supplied by the caller.
    pub snapshot_id: String,
    /// Estimated status.
    pub status: ProgressStatus,
    /// Estimated percentage, 0 to 100.
    pub progress: u8,
    /// Human-readable status line.
    pub message: String,
    /// Current dump size, once the file exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}
