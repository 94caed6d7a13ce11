//! Time-based progress estimation for running snapshots.
//!
//! `pg_dump` reports no progress, so the estimate is a ramp over the
//! minute following the dump file's last write. A file untouched for a
//! minute reads as complete whether or not the dump succeeded.

use chrono::{DateTime, Utc};

use crate::domain::{ProgressStatus, SnapshotProgress};
use crate::persistence::FileStat;

/// Length of the progress ramp, in seconds.
pub const RAMP_SECS: i64 = 60;
/// Reported before the dump file exists.
pub const INITIALIZING_PERCENT: u8 = 5;
/// The ramp never reaches 100 on its own.
pub const RAMP_CAP_PERCENT: u8 = 95;

/// Estimates progress for `snapshot_id` from its dump file, if any.
#[must_use]
pub fn estimate(snapshot_id: &str, stat: Option<&FileStat>, now: DateTime<Utc>) -> SnapshotProgress {
    let Some(stat) = stat else {
        return SnapshotProgress {
            snapshot_id: snapshot_id.to_string(),
            status: ProgressStatus::InProgress,
            progress: INITIALIZING_PERCENT,
            message: "Initializing backup...".to_string(),
            file_size: None,
        };
    };

    let elapsed_ms = (now - stat.modified).num_milliseconds().max(0);
    if elapsed_ms < RAMP_SECS * 1000 {
        let percent = (elapsed_ms * 100 / (RAMP_SECS * 1000)).min(i64::from(RAMP_CAP_PERCENT));
        return SnapshotProgress {
            snapshot_id: snapshot_id.to_string(),
            status: ProgressStatus::InProgress,
            progress: u8::try_from(percent).unwrap_or(RAMP_CAP_PERCENT),
            message: format!("Creating backup... ({} bytes)", stat.size),
            file_size: Some(stat.size),
        };
    }

    SnapshotProgress {
        snapshot_id: snapshot_id.to_string(),
        status: ProgressStatus::Completed,
        progress: 100,
        message: format!("Backup completed ({} bytes)", stat.size),
        file_size: Some(stat.size),
    }
}
