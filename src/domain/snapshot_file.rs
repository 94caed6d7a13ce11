//! Snapshot filename codec.
//!
//! The backup directory is the only persisted state, so a job's identity
//! lives in its filename:
//!
//! ```text
//! {database}_{yyyyMMdd}_{HHmmss}_{id-prefix}.sql
//! ```
//!
//! Database names may themselves contain underscores, so names are parsed
//! from the right.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::JobId;
use super::database_name::TIMESTAMP_FORMAT;
use crate::error::TimeMachineError;

/// Extension of every dump file.
pub const SNAPSHOT_EXTENSION: &str = ".sql";

/// The three components encoded into a snapshot filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFileName {
    /// Name of the dumped database, reduced to a single path component.
    pub database: String,
    /// Raw timestamp segment as it appears in the filename.
    pub timestamp: String,
    /// Short job id.
    pub id_prefix: String,
}

impl SnapshotFileName {
    /// Builds the filename for a new job.
    ///
    /// Every character of `database` other than alphanumerics, `-` and `_`
    /// becomes `_`, so the name never leaves the backup directory.
    #[must_use]
    pub fn new(database: &str, created_at: DateTime<Utc>, id: &JobId) -> Self {
        Self {
            database: file_safe(database),
            timestamp: created_at.format(TIMESTAMP_FORMAT).to_string(),
            id_prefix: id.prefix(),
        }
    }

    /// Parses a bare filename (no directory part).
    ///
    /// The last segment is the id prefix. When the two segments before it
    /// form a valid timestamp they are taken together and the rest is the
    /// database name. Otherwise only the second-to-last segment is treated
    /// as the timestamp, which then fails [`Self::created_at`].
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Format`] when the name lacks the `.sql`
    /// suffix or has fewer than three `_`-delimited segments.
    pub fn parse(file_name: &str) -> Result<Self, TimeMachineError> {
        let stem = file_name
            .strip_suffix(SNAPSHOT_EXTENSION)
            .ok_or_else(|| TimeMachineError::Format(file_name.to_string()))?;
        let parts: Vec<&str> = stem.split('_').collect();

        let Some((id_prefix, rest)) = parts.split_last() else {
            return Err(TimeMachineError::Format(file_name.to_string()));
        };
        let Some((last_ts, head)) = rest.split_last() else {
            return Err(TimeMachineError::Format(file_name.to_string()));
        };
        if head.is_empty() {
            return Err(TimeMachineError::Format(file_name.to_string()));
        }

        if let Some((date, db_parts)) = head.split_last()
            && !db_parts.is_empty()
        {
            let candidate = format!("{date}_{last_ts}");
            if parse_timestamp(&candidate).is_some() {
                return Ok(Self {
                    database: db_parts.join("_"),
                    timestamp: candidate,
                    id_prefix: (*id_prefix).to_string(),
                });
            }
        }

        Ok(Self {
            database: head.join("_"),
            timestamp: (*last_ts).to_string(),
            id_prefix: (*id_prefix).to_string(),
        })
    }

    /// Renders the filename.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}_{}_{}{SNAPSHOT_EXTENSION}",
            self.database, self.timestamp, self.id_prefix
        )
    }

    /// Creation time carried in the name, if the timestamp segment parses.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

fn file_safe(database: &str) -> String {
    database
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
