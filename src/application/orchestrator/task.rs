//! Handle to a running feed task.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::FeedOperation;

/// The one live resource attached to a subscription entry.
///
/// Owns the cancellation token checked by the push loop and poll ticks and
/// the join handle of the spawned task. Dropping a `FeedTask` without
/// calling [`stop`](Self::stop) still cancels the loop.
pub struct FeedTask {
    id: u64,
    operation: FeedOperation,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl FeedTask {
    pub(crate) fn new(
        id: u64,
        operation: FeedOperation,
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            operation,
            cancel,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Operation the task was started with. A push task that fell back to
    /// polling keeps reporting its original operation here; the entry holds
    /// the current one.
    #[must_use]
    pub fn operation(&self) -> FeedOperation {
        self.operation
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the loop, abort the task and wait for it to be gone.
    ///
    /// Returns only once the task no longer runs, so a restart for the same
    /// key can never overlap with it.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            match handle.await {
                Ok(()) => debug!(task_id = self.id, "Feed task finished"),
                Err(e) if e.is_cancelled() => debug!(task_id = self.id, "Feed task aborted"),
                Err(e) => warn!(task_id = self.id, error = %e, "Feed task panicked"),
            }
        }
    }
}

impl Drop for FeedTask {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for FeedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedTask")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
