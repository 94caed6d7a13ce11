//! Records produced by the persistence layer.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Basic facts about a live database.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseInfo {
    /// Database name.
    pub name: String,
    /// Server-formatted size (e.g. `"8137 kB"`), or `"Unknown"`.
    pub size: String,
    /// Number of tables outside the system schemas.
    pub tables: i64,
    /// Non-system schema names, sorted.
    pub schemas: Vec<String>,
}

/// Filesystem facts about one dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Full path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}
