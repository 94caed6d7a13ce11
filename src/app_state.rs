//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::{ConnectionCache, DatabaseProvisioner, SnapshotIndex};
use crate::service::{RestoreService, SnapshotService, ToolPaths, ToolRunner};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Snapshot orchestration.
    pub snapshots: Arc<SnapshotService>,
    /// Restore orchestration and the restore registry.
    pub restores: Arc<RestoreService>,
    /// Live database handles.
    pub connections: Arc<ConnectionCache>,
    /// Resolved client tool locations.
    pub tools: Arc<ToolPaths>,
    /// Executes client tools.
    pub runner: Arc<dyn ToolRunner>,
}

impl AppState {
    /// Wires both services onto the same index, tools and runner.
    ///
    /// Restore targets are provisioned through `connections`.
    #[must_use]
    pub fn new(
        index: Arc<dyn SnapshotIndex>,
        connections: Arc<ConnectionCache>,
        tools: Arc<ToolPaths>,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        let provisioner: Arc<dyn DatabaseProvisioner> = Arc::<ConnectionCache>::clone(&connections);
        let snapshots = SnapshotService::new(
            Arc::clone(&index),
            Arc::clone(&runner),
            Arc::clone(&tools),
        );
        let restores = RestoreService::new(index, Arc::clone(&runner), Arc::clone(&tools), provisioner);
        Self {
            snapshots: Arc::new(snapshots),
            restores: Arc::new(restores),
            connections,
            tools,
            runner,
        }
    }

    /// Caps the restore registry at `max_retained` jobs.
    #[must_use]
    pub fn with_restore_retention(mut self, max_retained: usize) -> Self {
        let restores = RestoreService::clone(&self.restores).with_retention(max_retained);
        self.restores = Arc::new(restores);
        self
    }
}
