//! Service layer: job orchestration.
//!
//! [`SnapshotService`] and [`RestoreService`] start dump and restore jobs
//! on detached tasks and answer queries about them. External tools are
//! driven through [`tools::ToolRunner`]; progress is estimated by
//! [`progress::estimate`].

pub mod progress;
pub mod restore_service;
pub mod snapshot_service;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use restore_service::RestoreService;
pub use snapshot_service::SnapshotService;
pub use tools::{ProcessRunner, ToolPaths, ToolRunner};
