//! Domain layer: job identity, connection descriptors, and job records.
//!
//! This module holds the types shared by the persistence and service
//! layers: the job identifier and its short form, the connection
//! descriptor, validated database names, the snapshot filename codec, and
//! the snapshot/restore job records.

pub mod connection;
pub mod database_name;
pub mod job_id;
pub mod restore;
pub mod snapshot;
pub mod snapshot_file;
pub mod tracked_job;

pub use connection::{ConnectionDescriptor, SslMode};
pub use database_name::DatabaseName;
pub use job_id::JobId;
pub use restore::{RestoreJob, RestoreRequest, RestoreStatus};
pub use snapshot::{ProgressStatus, SnapshotJob, SnapshotProgress, SnapshotRequest, SnapshotStatus};
pub use snapshot_file::SnapshotFileName;
pub use tracked_job::TrackedJob;
