//! Handle to a job running on a detached task.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// A job record shared with the background task that drives it.
///
/// `initial` is the record as it stood when the creation call returned.
/// `shared` is updated in place by the task. `handle` is the task itself;
/// dropping the `TrackedJob` detaches it, which is how every creation
/// path uses it. Nothing cancels or times out a job.
#[derive(Debug)]
pub struct TrackedJob<T> {
    /// Snapshot of the record at creation time.
    pub initial: T,
    /// Live record, mutated by the task.
    pub shared: Arc<RwLock<T>>,
    /// The background task.
    pub handle: JoinHandle<()>,
}

impl<T: Clone> TrackedJob<T> {
    /// Waits for the task and returns the final record.
    ///
    /// # Errors
    ///
    /// Returns the [`tokio::task::JoinError`] if the task panicked.
    pub async fn finish(self) -> Result<T, tokio::task::JoinError> {
        self.handle.await?;
        Ok(self.shared.read().await.clone())
    }
}
