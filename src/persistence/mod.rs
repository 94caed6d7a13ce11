//! Persistence layer: live PostgreSQL handles and the backup directory.
//!
//! There is no metadata database. [`postgres::ConnectionCache`] holds the
//! `sqlx::PgPool` handles opened on behalf of callers, and
//! [`directory_index::DirectoryIndex`] reconstructs snapshot jobs from the
//! dump files themselves. Both sit behind traits
//! ([`postgres::DatabaseProvisioner`], [`directory_index::SnapshotIndex`])
//! so the orchestrators never depend on the concrete storage.

pub mod directory_index;
pub mod models;
pub mod postgres;

pub use directory_index::{DirectoryIndex, SnapshotIndex};
pub use models::{DatabaseInfo, FileStat};
pub use postgres::{ConnectionCache, DatabaseProvisioner};
