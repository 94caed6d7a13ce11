//! Snapshot state reconstructed from the backup directory.
//!
//! Every query re-reads the directory; nothing is cached. A job's status
//! is inferred from the size and modification time of its dump file by
//! [`classify`], so a slow dump of a small database can read as `failed`
//! and a fast dump of a large one may never read as `creating`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::models::FileStat;
use crate::domain::job_id::id_prefix;
use crate::domain::snapshot_file::SNAPSHOT_EXTENSION;
use crate::domain::{SnapshotFileName, SnapshotJob, SnapshotStatus};
use crate::error::TimeMachineError;

/// Files younger than this many seconds and smaller than
/// [`CREATING_MAX_SIZE`] are reported as `creating`.
pub const CREATING_WINDOW_SECS: i64 = 2 * 60;
/// Size bound for the `creating` heuristic, in bytes.
pub const CREATING_MAX_SIZE: u64 = 1024;
/// Files older than this many seconds and smaller than [`FAILED_MAX_SIZE`]
/// are reported as `failed`.
pub const FAILED_AFTER_SECS: i64 = 5 * 60;
/// Size bound for the `failed` heuristic, in bytes.
pub const FAILED_MAX_SIZE: u64 = 100;
/// Error message attached to files classified as `failed`.
pub const INCOMPLETE_MESSAGE: &str = "Backup file appears to be incomplete or corrupted";

/// Where snapshot jobs are looked up.
///
/// The only implementation is [`DirectoryIndex`]; the trait keeps the
/// orchestrators independent of the filename convention.
#[async_trait]
pub trait SnapshotIndex: Send + Sync + fmt::Debug {
    /// Path a new dump for `file` should be written to.
    fn location(&self, file: &SnapshotFileName) -> PathBuf;

    /// Finds the dump file for a snapshot id.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::NotFound`] if no file matches.
    async fn resolve(&self, id: &str) -> Result<PathBuf, TimeMachineError>;

    /// Size and mtime of the dump file for a snapshot id, or `None` if it
    /// does not exist (yet, or any more).
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Io`] if the directory cannot be read.
    async fn inspect(&self, id: &str) -> Result<Option<FileStat>, TimeMachineError>;

    /// All snapshot jobs, newest first, each tagged with `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Io`] if the directory exists but cannot
    /// be read.
    async fn list(&self, owner_id: &str) -> Result<Vec<SnapshotJob>, TimeMachineError>;

    /// The snapshot job for one id.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::NotFound`] if no file matches.
    async fn get(&self, id: &str) -> Result<SnapshotJob, TimeMachineError>;

    /// Deletes the dump file for a snapshot id. A missing file is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Io`] if the file exists but cannot be
    /// removed.
    async fn remove(&self, id: &str) -> Result<(), TimeMachineError>;
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Inferred status.
    pub status: SnapshotStatus,
    /// Set when `status` is `failed`.
    pub error_message: Option<String>,
    /// Set when `status` is `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Infers a snapshot's status from its dump file.
///
/// Defaults to `completed` at `modified`. A file younger than two minutes
/// and under 1 KiB is `creating`; then a file older than five minutes and
/// under 100 bytes is `failed`. The checks run in that order.
#[must_use]
pub fn classify(size: u64, modified: DateTime<Utc>, now: DateTime<Utc>) -> Classification {
    let age = now - modified;
    let mut status = SnapshotStatus::Completed;
    let mut error_message = None;

    if age < Duration::seconds(CREATING_WINDOW_SECS) && size < CREATING_MAX_SIZE {
        status = SnapshotStatus::Creating;
    }
    if size < FAILED_MAX_SIZE && age > Duration::seconds(FAILED_AFTER_SECS) {
        status = SnapshotStatus::Failed;
        error_message = Some(INCOMPLETE_MESSAGE.to_string());
    }

    Classification {
        status,
        error_message,
        completed_at: (status == SnapshotStatus::Completed).then_some(modified),
    }
}

/// Rebuilds a snapshot job from its filename and file metadata.
#[must_use]
pub fn derive_job(
    file: &SnapshotFileName,
    stat: &FileStat,
    owner_id: &str,
    now: DateTime<Utc>,
) -> SnapshotJob {
    let created_at = file.created_at().unwrap_or(stat.modified);
    let Classification {
        status,
        error_message,
        completed_at,
    } = classify(stat.size, stat.modified, now);

    SnapshotJob {
        id: file.id_prefix.clone(),
        database_id: owner_id.to_string(),
        name: format!("Backup of {}", file.database),
        description: format!("Created on {}", created_at.format("%Y-%m-%d %H:%M:%S")),
        file_path: stat.path.clone(),
        file_size: stat.size,
        status,
        error_message,
        created_at,
        completed_at,
    }
}

/// [`SnapshotIndex`] over a directory of `{db}_{ts}_{id}.sql` files.
#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    backup_dir: PathBuf,
}

impl DirectoryIndex {
    /// Creates an index over `backup_dir`. The directory need not exist.
    #[must_use]
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Creates the backup directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Io`] if creation fails.
    pub async fn ensure_dir(&self) -> Result<(), TimeMachineError> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        Ok(())
    }

    /// The directory this index reads.
    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Reads every parseable dump file with its metadata.
    ///
    /// Entries that vanish mid-scan or carry foreign names are skipped.
    async fn scan(&self) -> Result<Vec<(SnapshotFileName, FileStat)>, TimeMachineError> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.ends_with(SNAPSHOT_EXTENSION) {
                continue;
            }
            let parsed = match SnapshotFileName::parse(file_name) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!(file = %file_name, error = %e, "skipping file with unexpected format");
                    continue;
                }
            };
            match stat_file(&entry.path()).await {
                Ok(Some(stat)) => found.push((parsed, stat)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "failed to get file info");
                }
            }
        }
        Ok(found)
    }

    /// The newest file whose id prefix matches `id`.
    async fn find(&self, id: &str) -> Result<Option<(SnapshotFileName, FileStat)>, TimeMachineError> {
        let Some(prefix) = id_prefix(id) else {
            return Ok(None);
        };
        Ok(self
            .scan()
            .await?
            .into_iter()
            .filter(|(file, _)| file.id_prefix == prefix)
            .max_by_key(|(_, stat)| stat.modified))
    }
}

#[async_trait]
impl SnapshotIndex for DirectoryIndex {
    fn location(&self, file: &SnapshotFileName) -> PathBuf {
        self.backup_dir.join(file.encode())
    }

    async fn resolve(&self, id: &str) -> Result<PathBuf, TimeMachineError> {
        self.find(id)
            .await?
            .map(|(_, stat)| stat.path)
            .ok_or_else(|| TimeMachineError::snapshot_not_found(id))
    }

    async fn inspect(&self, id: &str) -> Result<Option<FileStat>, TimeMachineError> {
        Ok(self.find(id).await?.map(|(_, stat)| stat))
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<SnapshotJob>, TimeMachineError> {
        let now = Utc::now();
        let mut jobs: Vec<SnapshotJob> = self
            .scan()
            .await?
            .iter()
            .map(|(file, stat)| derive_job(file, stat, owner_id, now))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn get(&self, id: &str) -> Result<SnapshotJob, TimeMachineError> {
        let (file, stat) = self
            .find(id)
            .await?
            .ok_or_else(|| TimeMachineError::snapshot_not_found(id))?;
        Ok(derive_job(&file, &stat, "", Utc::now()))
    }

    async fn remove(&self, id: &str) -> Result<(), TimeMachineError> {
        let path = match self.resolve(id).await {
            Ok(path) => path,
            Err(TimeMachineError::NotFound { .. }) => {
                tracing::info!(snapshot_id = %id, "no snapshot file to delete");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(snapshot_id = %id, path = %path.display(), "deleted snapshot");
        Ok(())
    }
}

/// Stats a single file, mapping "vanished" to `None`.
///
/// # Errors
///
/// Returns [`TimeMachineError::Io`] for any failure other than the file
/// not existing.
pub async fn stat_file(path: &Path) -> Result<Option<FileStat>, TimeMachineError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Ok(None);
    }
    Ok(Some(FileStat {
        path: path.to_path_buf(),
        size: metadata.len(),
        modified: DateTime::<Utc>::from(metadata.modified()?),
    }))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::fs::{self, File};
    use std::time::{Duration as StdDuration, SystemTime};

    use super::*;

    fn write_file(dir: &Path, name: &str, size: usize, age: StdDuration) -> PathBuf {
        let path = dir.join(name);
        if let Err(e) = fs::write(&path, vec![b'-'; size]) {
            panic!("write {name}: {e}");
        }
        let Ok(file) = File::options().write(true).open(&path) else {
            panic!("open {name}");
        };
        let Some(mtime) = SystemTime::now().checked_sub(age) else {
            panic!("valid mtime");
        };
        if let Err(e) = file.set_modified(mtime) {
            panic!("set mtime on {name}: {e}");
        }
        path
    }

    fn temp_dir() -> tempfile::TempDir {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        dir
    }

    #[test]
    fn small_recent_file_is_creating() {
        let now = Utc::now();
        let c = classify(512, now - Duration::seconds(30), now);
        assert_eq!(c.status, SnapshotStatus::Creating);
        assert_eq!(c.completed_at, None);
        assert_eq!(c.error_message, None);
    }

    #[test]
    fn creating_turns_completed_after_two_minutes() {
        let modified = Utc::now();
        let later = modified + Duration::minutes(2) + Duration::seconds(1);
        let c = classify(512, modified, later);
        assert_eq!(c.status, SnapshotStatus::Completed);
        assert_eq!(c.completed_at, Some(modified));
    }

    #[test]
    fn tiny_old_file_is_failed() {
        let now = Utc::now();
        let c = classify(10, now - Duration::minutes(6), now);
        assert_eq!(c.status, SnapshotStatus::Failed);
        assert_eq!(c.error_message.as_deref(), Some(INCOMPLETE_MESSAGE));
        assert_eq!(c.completed_at, None);
    }

    #[test]
    fn tiny_file_between_two_and_five_minutes_is_completed() {
        let now = Utc::now();
        let c = classify(10, now - Duration::minutes(3), now);
        assert_eq!(c.status, SnapshotStatus::Completed);
    }

    #[test]
    fn large_recent_file_is_completed() {
        let now = Utc::now();
        let c = classify(4096, now - Duration::seconds(5), now);
        assert_eq!(c.status, SnapshotStatus::Completed);
    }

    #[tokio::test]
    async fn missing_directory_lists_empty() {
        let dir = temp_dir();
        let index = DirectoryIndex::new(dir.path().join("absent"));
        let Ok(jobs) = index.list("db-1").await else {
            panic!("list failed");
        };
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn list_skips_malformed_names() {
        let dir = temp_dir();
        write_file(dir.path(), "orders_20261014_120000_abcd1234.sql", 4096, StdDuration::from_secs(600));
        write_file(dir.path(), "orders_abcd1234.sql", 4096, StdDuration::from_secs(600));
        write_file(dir.path(), "notes.txt", 10, StdDuration::from_secs(600));

        let index = DirectoryIndex::new(dir.path());
        let Ok(jobs) = index.list("db-1").await else {
            panic!("list failed");
        };
        assert_eq!(jobs.len(), 1);
        let Some(job) = jobs.first() else {
            panic!("one job");
        };
        assert_eq!(job.id, "abcd1234");
        assert_eq!(job.database_id, "db-1");
        assert_eq!(job.name, "Backup of orders");
        assert_eq!(job.description, "Created on 2026-10-14 12:00:00");
        assert_eq!(job.status, SnapshotStatus::Completed);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let dir = temp_dir();
        write_file(dir.path(), "a_20240101_000000_11111111.sql", 2048, StdDuration::from_secs(600));
        write_file(dir.path(), "b_20260101_000000_22222222.sql", 2048, StdDuration::from_secs(600));
        write_file(dir.path(), "c_20250101_000000_33333333.sql", 2048, StdDuration::from_secs(600));

        let index = DirectoryIndex::new(dir.path());
        let Ok(jobs) = index.list("").await else {
            panic!("list failed");
        };
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["22222222", "33333333", "11111111"]);
    }

    #[tokio::test]
    async fn unparseable_timestamp_falls_back_to_mtime() {
        let dir = temp_dir();
        let path = write_file(dir.path(), "orders_nightly_abcd1234.sql", 2048, StdDuration::from_secs(600));
        let index = DirectoryIndex::new(dir.path());
        let Ok(job) = index.get("abcd1234").await else {
            panic!("get failed");
        };
        let Ok(Some(stat)) = stat_file(&path).await else {
            panic!("stat failed");
        };
        assert_eq!(job.created_at, stat.modified);
        assert_eq!(job.database_id, "");
    }

    #[tokio::test]
    async fn resolve_prefers_most_recently_modified() {
        let dir = temp_dir();
        write_file(dir.path(), "a_20261014_120000_abcd1234.sql", 2048, StdDuration::from_secs(900));
        let newer = write_file(dir.path(), "b_20261014_120000_abcd1234.sql", 2048, StdDuration::from_secs(60));

        let index = DirectoryIndex::new(dir.path());
        let Ok(resolved) = index.resolve("abcd1234-ffff-4fff-8fff-ffffffffffff").await else {
            panic!("resolve failed");
        };
        assert_eq!(resolved, newer);
    }

    #[tokio::test]
    async fn unknown_or_short_ids_are_not_found() {
        let dir = temp_dir();
        write_file(dir.path(), "orders_20261014_120000_abcd1234.sql", 2048, StdDuration::from_secs(60));
        let index = DirectoryIndex::new(dir.path());

        assert!(matches!(index.resolve("deadbeef").await, Err(TimeMachineError::NotFound { .. })));
        assert!(matches!(index.resolve("abcd").await, Err(TimeMachineError::NotFound { .. })));
        assert!(matches!(index.get("deadbeef").await, Err(TimeMachineError::NotFound { .. })));
        assert!(matches!(index.inspect("deadbeef").await, Ok(None)));
    }

    #[tokio::test]
    async fn remove_deletes_file_and_tolerates_missing() {
        let dir = temp_dir();
        let path = write_file(dir.path(), "orders_20261014_120000_abcd1234.sql", 2048, StdDuration::from_secs(60));
        let index = DirectoryIndex::new(dir.path());

        assert!(index.remove("abcd1234").await.is_ok());
        assert!(!path.exists());
        assert!(index.remove("abcd1234").await.is_ok());
    }

    #[tokio::test]
    async fn location_joins_encoded_name() {
        let index = DirectoryIndex::new("/var/backups");
        let file = SnapshotFileName {
            database: "orders".to_string(),
            timestamp: "20261014_120000".to_string(),
            id_prefix: "abcd1234".to_string(),
        };
        assert_eq!(
            index.location(&file),
            PathBuf::from("/var/backups/orders_20261014_120000_abcd1234.sql")
        );
    }

    #[test]
    fn location_stays_inside_backup_dir() {
        let backup_dir = Path::new("/var/backups");
        let index = DirectoryIndex::new(backup_dir);
        for database in ["../x", "/tmp/x", "..", "a/../../b"] {
            let file = SnapshotFileName::new(database, Utc::now(), &crate::domain::JobId::new());
            let path = index.location(&file);
            assert!(path.starts_with(backup_dir), "{database} escaped to {}", path.display());
            assert_eq!(path.parent(), Some(backup_dir), "{database}");
        }
    }
}
