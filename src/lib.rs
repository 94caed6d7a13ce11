//! # pg-timemachine
//!
//! REST service that snapshots PostgreSQL databases with `pg_dump` and
//! restores them into new databases with `psql`.
//!
//! Dumps are plain-SQL files in a single backup directory. There is no
//! metadata store: the state of a snapshot (its database, creation time,
//! id and status) is reconstructed from the file's name, size and
//! modification time on every query. Dumps and restores run on detached
//! Tokio tasks; callers poll for their outcome.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── SnapshotService / RestoreService (service/)
//!     ├── ToolRunner ── pg_dump, psql
//!     │
//!     ├── DirectoryIndex (persistence/) ── backup directory
//!     └── ConnectionCache (persistence/) ── PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
