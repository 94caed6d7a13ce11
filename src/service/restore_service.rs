//! Restore service: replays a snapshot into a freshly created database.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::tools::{self, ToolPaths, ToolRunner};
use crate::domain::{
    ConnectionDescriptor, DatabaseName, JobId, RestoreJob, RestoreRequest, RestoreStatus,
    TrackedJob,
};
use crate::error::TimeMachineError;
use crate::persistence::{DatabaseProvisioner, SnapshotIndex};

/// Finished restores kept for lookup before the oldest are evicted.
pub const DEFAULT_RETAINED_RESTORES: usize = 1000;

type Registry = Arc<RwLock<HashMap<JobId, Arc<RwLock<RestoreJob>>>>>;

/// Orchestration layer for restores.
///
/// Restore jobs are kept in an in-process registry so they can be looked
/// up while running. The registry is never persisted. Once it holds
/// `max_retained` jobs, the oldest finished ones are evicted on the next
/// `create`; running jobs are never evicted.
#[derive(Debug, Clone)]
pub struct RestoreService {
    index: Arc<dyn SnapshotIndex>,
    runner: Arc<dyn ToolRunner>,
    tools: Arc<ToolPaths>,
    provisioner: Arc<dyn DatabaseProvisioner>,
    jobs: Registry,
    max_retained: usize,
}

impl RestoreService {
    /// Creates a new `RestoreService` with an empty registry.
    #[must_use]
    pub fn new(
        index: Arc<dyn SnapshotIndex>,
        runner: Arc<dyn ToolRunner>,
        tools: Arc<ToolPaths>,
        provisioner: Arc<dyn DatabaseProvisioner>,
    ) -> Self {
        Self {
            index,
            runner,
            tools,
            provisioner,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            max_retained: DEFAULT_RETAINED_RESTORES,
        }
    }

    /// Caps how many jobs the registry holds before finished ones are
    /// evicted, oldest first.
    #[must_use]
    pub fn with_retention(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained.max(1);
        self
    }

    /// Starts restoring `request.snapshot_id` into a new database.
    ///
    /// The target is `request.target_db_name` when given, otherwise
    /// `{database}_restored_{timestamp}`. Returns a `pending` job
    /// immediately; every later failure is recorded on the job.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::InvalidRequest`] if an explicit target
    /// name is not a valid identifier.
    pub async fn create(
        &self,
        connection: &ConnectionDescriptor,
        request: &RestoreRequest,
    ) -> Result<TrackedJob<RestoreJob>, TimeMachineError> {
        let created_at = Utc::now();
        let target = match request.target_db_name.as_deref() {
            Some(name) if !name.is_empty() => DatabaseName::parse(name)?,
            _ => DatabaseName::restored_from(&connection.database, created_at),
        };

        let id = JobId::new();
        let job = RestoreJob {
            id,
            snapshot_id: request.snapshot_id.clone(),
            database_id: request.database_id.clone(),
            target_db_name: target.to_string(),
            status: RestoreStatus::Pending,
            error_message: None,
            created_at,
            completed_at: None,
        };
        let shared = Arc::new(RwLock::new(job.clone()));
        {
            let mut jobs = self.jobs.write().await;
            self.evict_finished(&mut jobs).await;
            jobs.insert(id, Arc::clone(&shared));
        }

        let task = RestoreTask {
            service: self.clone(),
            connection: connection.clone(),
            target,
            job: Arc::clone(&shared),
        };
        let handle = tokio::spawn(task.run());

        tracing::info!(
            restore_id = %id,
            snapshot_id = %request.snapshot_id,
            target = %job.target_db_name,
            "restore started"
        );
        Ok(TrackedJob {
            initial: job,
            shared,
            handle,
        })
    }

    /// Current state of a restore started by this process.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::NotFound`] for unknown ids.
    pub async fn get(&self, id: JobId) -> Result<RestoreJob, TimeMachineError> {
        let entry = self.jobs.read().await.get(&id).map(Arc::clone);
        match entry {
            Some(job) => Ok(job.read().await.clone()),
            None => Err(TimeMachineError::NotFound {
                kind: "restore",
                id: id.to_string(),
            }),
        }
    }

    async fn evict_finished(&self, jobs: &mut HashMap<JobId, Arc<RwLock<RestoreJob>>>) {
        let excess = (jobs.len() + 1).saturating_sub(self.max_retained);
        if excess == 0 {
            return;
        }
        let mut finished = Vec::new();
        for (id, job) in jobs.iter() {
            let job = job.read().await;
            if job.status.is_terminal() {
                finished.push((job.created_at, *id));
            }
        }
        finished.sort_by_key(|(created_at, _)| *created_at);
        for (_, id) in finished.into_iter().take(excess) {
            jobs.remove(&id);
            tracing::debug!(restore_id = %id, "evicted finished restore");
        }
    }
}

/// Background half of [`RestoreService::create`].
struct RestoreTask {
    service: RestoreService,
    connection: ConnectionDescriptor,
    target: DatabaseName,
    job: Arc<RwLock<RestoreJob>>,
}

impl RestoreTask {
    async fn run(self) {
        let (id, snapshot_id) = {
            let mut job = self.job.write().await;
            job.status = RestoreStatus::InProgress;
            (job.id, job.snapshot_id.clone())
        };

        let file = match self.service.index.resolve(&snapshot_id).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(restore_id = %id, snapshot_id = %snapshot_id, error = %e, "snapshot not found");
                self.job
                    .write()
                    .await
                    .fail(format!("Snapshot file not found for ID: {snapshot_id}"));
                return;
            }
        };

        if let Err(e) = self
            .service
            .provisioner
            .create_database(&self.connection.admin(), &self.target)
            .await
        {
            tracing::error!(restore_id = %id, target = %self.target, error = %e, "failed to create target database");
            self.job
                .write()
                .await
                .fail(format!("Failed to create target database: {e}"));
            return;
        }

        let invocation = self.service.tools.restore(&self.connection, &self.target, &file);
        match tools::invoke(self.service.runner.as_ref(), &invocation).await {
            Ok(_) => {
                self.job.write().await.complete();
                tracing::info!(restore_id = %id, target = %self.target, "restore completed");
            }
            Err(e) => {
                tracing::error!(restore_id = %id, error = %e, "restore failed");
                let message = match e {
                    TimeMachineError::ToolInvocation { status, output, .. } => {
                        format!("psql restore failed: {status}\nOutput: {output}")
                    }
                    other => other.to_string(),
                };
                self.job.write().await.fail(message);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::path::{Path, PathBuf};

    use tokio::sync::Notify;

    use super::*;
    use crate::persistence::DirectoryIndex;
    use crate::service::test_support::{FakeProvisioner, FakeRunner, connection};
    use crate::service::tools::{PASSWORD_ENV, Tool};

    const SNAPSHOT: &str = "orders_20261014_120000_abcd1234.sql";

    fn temp_dir() -> tempfile::TempDir {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        dir
    }

    fn write_snapshot(dir: &Path) -> PathBuf {
        let path = dir.join(SNAPSHOT);
        if let Err(e) = std::fs::write(&path, vec![b'-'; 4096]) {
            panic!("write snapshot: {e}");
        }
        path
    }

    fn service(
        dir: &tempfile::TempDir,
        runner: Arc<FakeRunner>,
        provisioner: Arc<FakeProvisioner>,
    ) -> RestoreService {
        RestoreService::new(
            Arc::new(DirectoryIndex::new(dir.path())),
            runner,
            Arc::new(ToolPaths::fixed("pg_dump", "psql")),
            provisioner,
        )
    }

    fn request(snapshot_id: &str, target: Option<&str>) -> RestoreRequest {
        RestoreRequest {
            snapshot_id: snapshot_id.to_string(),
            database_id: "db-1".to_string(),
            target_db_name: target.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn unknown_snapshot_fails_without_provisioning() {
        let dir = temp_dir();
        let runner = Arc::new(FakeRunner::default());
        let provisioner = Arc::new(FakeProvisioner::default());
        let service = service(&dir, Arc::clone(&runner), Arc::clone(&provisioner));

        let Ok(tracked) = service.create(&connection(), &request("zzzzzzzz", None)).await else {
            panic!("create failed");
        };
        assert_eq!(tracked.initial.status, RestoreStatus::Pending);

        let Ok(finished) = tracked.finish().await else {
            panic!("restore task panicked");
        };
        assert_eq!(finished.status, RestoreStatus::Failed);
        assert_eq!(
            finished.error_message.as_deref(),
            Some("Snapshot file not found for ID: zzzzzzzz")
        );
        assert!(provisioner.created().is_empty());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn restore_provisions_then_replays_into_generated_target() {
        let dir = temp_dir();
        let file = write_snapshot(dir.path());
        let runner = Arc::new(FakeRunner::default());
        let provisioner = Arc::new(FakeProvisioner::default());
        let service = service(&dir, Arc::clone(&runner), Arc::clone(&provisioner));

        let Ok(tracked) = service.create(&connection(), &request("abcd1234", None)).await else {
            panic!("create failed");
        };
        let target = tracked.initial.target_db_name.clone();
        assert!(target.starts_with("orders_restored_"));
        assert!(DatabaseName::parse(&target).is_ok());

        let Ok(finished) = tracked.finish().await else {
            panic!("restore task panicked");
        };
        assert_eq!(finished.status, RestoreStatus::Completed);
        assert!(finished.completed_at.is_some());
        assert_eq!(finished.error_message, None);

        assert_eq!(provisioner.created(), vec![("postgres".to_string(), target.clone())]);

        let calls = runner.calls();
        let Some(call) = calls.first() else {
            panic!("psql not invoked");
        };
        assert_eq!(call.tool, Tool::Psql);
        assert_eq!(call.arg_value("dbname"), Some(target.as_str()));
        assert_eq!(call.arg_value("file"), file.to_str());
        assert_eq!(call.env, vec![(PASSWORD_ENV.to_string(), "p".to_string())]);
    }

    #[tokio::test]
    async fn provisioning_failure_never_runs_the_tool() {
        let dir = temp_dir();
        write_snapshot(dir.path());
        let runner = Arc::new(FakeRunner::default());
        let provisioner = Arc::new(FakeProvisioner {
            refuse: true,
            ..FakeProvisioner::default()
        });
        let service = service(&dir, Arc::clone(&runner), provisioner);

        let Ok(tracked) = service
            .create(&connection(), &request("abcd1234", Some("orders_copy")))
            .await
        else {
            panic!("create failed");
        };
        assert_eq!(tracked.initial.target_db_name, "orders_copy");

        let Ok(finished) = tracked.finish().await else {
            panic!("restore task panicked");
        };
        assert_eq!(finished.status, RestoreStatus::Failed);
        let message = finished.error_message.unwrap_or_default();
        assert!(message.starts_with("Failed to create target database:"));
        assert!(message.contains("already exists"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn tool_failure_is_recorded() {
        let dir = temp_dir();
        write_snapshot(dir.path());
        let service = service(
            &dir,
            Arc::new(FakeRunner::failing("syntax error at line 1")),
            Arc::new(FakeProvisioner::default()),
        );

        let Ok(tracked) = service.create(&connection(), &request("abcd1234", None)).await else {
            panic!("create failed");
        };
        let Ok(finished) = tracked.finish().await else {
            panic!("restore task panicked");
        };
        assert_eq!(finished.status, RestoreStatus::Failed);
        assert_eq!(
            finished.error_message.as_deref(),
            Some("psql restore failed: exit status: 1\nOutput: syntax error at line 1")
        );
    }

    #[tokio::test]
    async fn invalid_target_is_rejected_up_front() {
        let dir = temp_dir();
        let provisioner = Arc::new(FakeProvisioner::default());
        let service = service(&dir, Arc::new(FakeRunner::default()), Arc::clone(&provisioner));

        let result = service
            .create(&connection(), &request("abcd1234", Some("x\"; DROP DATABASE y; --")))
            .await;
        assert!(matches!(result, Err(TimeMachineError::InvalidRequest(_))));
        assert!(provisioner.created().is_empty());
    }

    #[tokio::test]
    async fn registry_tracks_the_running_job() {
        let dir = temp_dir();
        write_snapshot(dir.path());
        let service = service(
            &dir,
            Arc::new(FakeRunner::default()),
            Arc::new(FakeProvisioner::default()),
        );

        let Ok(tracked) = service.create(&connection(), &request("abcd1234", None)).await else {
            panic!("create failed");
        };
        let id = tracked.initial.id;
        let Ok(_) = tracked.finish().await else {
            panic!("restore task panicked");
        };

        let Ok(job) = service.get(id).await else {
            panic!("restore not registered");
        };
        assert!(job.status.is_terminal());
        assert_eq!(job.status, RestoreStatus::Completed);

        let missing = service.get(JobId::new()).await;
        assert!(matches!(missing, Err(TimeMachineError::NotFound { kind: "restore", .. })));
    }

    #[tokio::test]
    async fn oldest_finished_restores_are_evicted() {
        let dir = temp_dir();
        let service = service(
            &dir,
            Arc::new(FakeRunner::default()),
            Arc::new(FakeProvisioner::default()),
        )
        .with_retention(2);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let Ok(tracked) = service.create(&connection(), &request("zzzzzzzz", None)).await else {
                panic!("create failed");
            };
            ids.push(tracked.initial.id);
            let Ok(_) = tracked.finish().await else {
                panic!("restore task panicked");
            };
        }

        let [oldest, middle, newest] = ids.as_slice() else {
            panic!("three restores");
        };
        assert!(matches!(service.get(*oldest).await, Err(TimeMachineError::NotFound { .. })));
        assert!(service.get(*middle).await.is_ok());
        assert!(service.get(*newest).await.is_ok());
    }

    #[tokio::test]
    async fn running_restores_survive_eviction() {
        let dir = temp_dir();
        write_snapshot(dir.path());
        let gate = Arc::new(Notify::new());
        let runner = Arc::new(FakeRunner {
            gate: Some(Arc::clone(&gate)),
            ..FakeRunner::default()
        });
        let service = service(&dir, runner, Arc::new(FakeProvisioner::default())).with_retention(1);

        let Ok(running) = service.create(&connection(), &request("abcd1234", None)).await else {
            panic!("create failed");
        };
        let Ok(failed) = service.create(&connection(), &request("zzzzzzzz", None)).await else {
            panic!("create failed");
        };
        let failed_id = failed.initial.id;
        let Ok(_) = failed.finish().await else {
            panic!("restore task panicked");
        };
        let Ok(_) = service.create(&connection(), &request("zzzzzzzz", None)).await else {
            panic!("create failed");
        };

        assert!(service.get(running.initial.id).await.is_ok());
        assert!(matches!(service.get(failed_id).await, Err(TimeMachineError::NotFound { .. })));

        gate.notify_one();
        let Ok(done) = running.finish().await else {
            panic!("restore task panicked");
        };
        assert_eq!(done.status, RestoreStatus::Completed);
    }
}
