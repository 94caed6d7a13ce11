//! Restore job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::JobId;

/// Lifecycle of a restore job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RestoreStatus {
    /// Accepted, task not started.
    Pending,
    /// Resolving, provisioning or restoring.
    InProgress,
    /// The restore tool exited successfully.
    Completed,
    /// Any step failed; see `error_message`.
    Failed,
}

impl RestoreStatus {
    /// Returns `true` for `completed` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A restore job. Lives in memory only; nothing about it is written to
/// disk, so it is gone once the process exits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestoreJob {
    /// Job identifier.
    pub id: JobId,
    /// Snapshot id as supplied by the caller.
    pub snapshot_id: String,
    /// Owning database id as supplied by the caller.
    pub database_id: String,
    /// Database the dump is restored into.
    pub target_db_name: String,
    /// Lifecycle status.
    pub status: RestoreStatus,
    /// Failure detail, when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Completion time, when `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RestoreJob {
    /// Records a terminal failure.
    pub fn fail(&mut self, message: String) {
        self.status = RestoreStatus::Failed;
        self.error_message = Some(message);
    }

    /// Records successful completion.
    pub fn complete(&mut self) {
        self.status = RestoreStatus::Completed;
        self.completed_at = Some(Utc::now());
    }
}

/// Caller input for a new restore.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestoreRequest {
    /// Snapshot to restore (full id or its 8-character prefix).
    pub snapshot_id: String,
    /// Owning database id.
    #[serde(default)]
    pub database_id: String,
    /// Explicit target database; generated when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_db_name: Option<String>,
}
