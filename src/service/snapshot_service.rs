//! Snapshot service: starts dump jobs and answers snapshot queries.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::progress;
use super::tools::{self, ToolInvocation, ToolPaths, ToolRunner};
use crate::domain::{
    ConnectionDescriptor, JobId, SnapshotFileName, SnapshotJob, SnapshotProgress, SnapshotRequest,
    SnapshotStatus, TrackedJob,
};
use crate::error::TimeMachineError;
use crate::persistence::SnapshotIndex;
use crate::persistence::directory_index::stat_file;

/// Orchestration layer for snapshots.
///
/// `create` hands back an ephemeral job and leaves the dump to a detached
/// task. Every other method answers from the [`SnapshotIndex`], never
/// from that ephemeral job.
#[derive(Debug, Clone)]
pub struct SnapshotService {
    index: Arc<dyn SnapshotIndex>,
    runner: Arc<dyn ToolRunner>,
    tools: Arc<ToolPaths>,
}

impl SnapshotService {
    /// Creates a new `SnapshotService`.
    #[must_use]
    pub fn new(
        index: Arc<dyn SnapshotIndex>,
        runner: Arc<dyn ToolRunner>,
        tools: Arc<ToolPaths>,
    ) -> Self {
        Self {
            index,
            runner,
            tools,
        }
    }

    /// Starts a dump of `connection.database`.
    ///
    /// Returns immediately with a `creating` job whose id is the full UUID.
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn create(
        &self,
        connection: &ConnectionDescriptor,
        request: &SnapshotRequest,
    ) -> TrackedJob<SnapshotJob> {
        let id = JobId::new();
        let created_at = Utc::now();
        let file = SnapshotFileName::new(&connection.database, created_at, &id);
        let file_path = self.index.location(&file);

        let job = SnapshotJob {
            id: id.to_string(),
            database_id: request.database_id.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            file_path: file_path.clone(),
            file_size: 0,
            status: SnapshotStatus::Creating,
            error_message: None,
            created_at,
            completed_at: None,
        };
        let shared = Arc::new(RwLock::new(job.clone()));

        let task = BackupTask {
            id,
            runner: Arc::clone(&self.runner),
            invocation: self.tools.dump(connection, &file_path),
            file_path,
            job: Arc::clone(&shared),
        };
        let handle = tokio::spawn(task.run());

        tracing::info!(snapshot_id = %id, database = %connection.database, "snapshot creation started");
        TrackedJob {
            initial: job,
            shared,
            handle,
        }
    }

    /// All snapshots in the backup directory, newest first.
    ///
    /// Every record carries `database_id` as given; the directory cannot
    /// tell which caller a file belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Io`] if the directory cannot be read.
    pub async fn list(&self, database_id: &str) -> Result<Vec<SnapshotJob>, TimeMachineError> {
        self.index.list(database_id).await
    }

    /// One snapshot by id (full or 8-character prefix).
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::NotFound`] if no dump file matches.
    pub async fn get(&self, id: &str) -> Result<SnapshotJob, TimeMachineError> {
        self.index.get(id).await
    }

    /// Deletes a snapshot's dump file. Unknown ids succeed.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Io`] if the file cannot be removed.
    pub async fn delete(&self, id: &str) -> Result<(), TimeMachineError> {
        self.index.remove(id).await
    }

    /// Estimated progress of a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Io`] if the directory cannot be read.
    pub async fn progress(&self, id: &str) -> Result<SnapshotProgress, TimeMachineError> {
        let stat = self.index.inspect(id).await?;
        Ok(progress::estimate(id, stat.as_ref(), Utc::now()))
    }
}

/// Background half of [`SnapshotService::create`].
struct BackupTask {
    id: JobId,
    runner: Arc<dyn ToolRunner>,
    invocation: ToolInvocation,
    file_path: PathBuf,
    job: Arc<RwLock<SnapshotJob>>,
}

impl BackupTask {
    async fn run(self) {
        tracing::info!(snapshot_id = %self.id, "starting backup");

        if let Err(e) = tools::invoke(self.runner.as_ref(), &self.invocation).await {
            tracing::error!(snapshot_id = %self.id, error = %e, "backup failed");
            self.fail(e.to_string()).await;
            return;
        }

        let stat = match stat_file(&self.file_path).await {
            Ok(Some(stat)) => stat,
            Ok(None) => {
                tracing::error!(snapshot_id = %self.id, "dump file missing after backup");
                self.fail("Failed to get file info: file does not exist".to_string())
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(snapshot_id = %self.id, error = %e, "failed to get file info");
                self.fail(format!("Failed to get file info: {e}")).await;
                return;
            }
        };

        {
            let mut job = self.job.write().await;
            job.file_size = stat.size;
            job.status = SnapshotStatus::Completed;
            job.completed_at = Some(Utc::now());
        }

        #[allow(clippy::cast_precision_loss)]
        let size_mb = stat.size as f64 / (1024.0 * 1024.0);
        tracing::info!(snapshot_id = %self.id, size_mb = %format_args!("{size_mb:.2}"), "backup completed");
    }

    async fn fail(&self, message: String) {
        let mut job = self.job.write().await;
        job.status = SnapshotStatus::Failed;
        job.error_message = Some(message);
    }
}
