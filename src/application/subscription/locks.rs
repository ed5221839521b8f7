//! Per-key async locks sequencing feed start and stop.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per encoded subscription key.
///
/// Held across a whole subscribe, unsubscribe or restart so a stop for a
/// key always completes before the next start for the same key begins.
/// Different keys never contend.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, encoded: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(encoded.to_string())
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }

    /// Lock several keys in sorted order.
    pub async fn lock_all(&self, encoded: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<&String> = encoded.iter().collect();
        sorted.sort();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Forget the lock for a key nobody holds or waits on.
    pub fn prune(&self, encoded: &str) {
        self.locks
            .remove_if(encoded, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
