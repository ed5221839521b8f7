//! Deduplicating, refcounted table of live feeds.
//!
//! Every method is one short critical section on a single mutex; nothing
//! awaits while holding it. Start/stop sequencing per key is the caller's
//! job (see [`KeyLocks`](super::KeyLocks)).

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::entry::{ActiveSubscription, SubscriptionEntry};
use crate::application::orchestrator::FeedTask;
use crate::domain::{DataKind, FeedOperation, SubscriptionKey, TransportMethod};

/// Result of [`SubscriptionRegistry::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// First subscriber; the entry must be started.
    Created,
    /// Entry already existed and now has `count` subscribers.
    Joined {
        count: usize,
        /// The entry was started under a different global preference.
        stale: bool,
        active: bool,
    },
}

/// Result of [`SubscriptionRegistry::release`].
#[derive(Debug)]
pub enum Release {
    /// No entry for the key.
    Missing,
    /// Entry kept with this many subscribers.
    Remaining(usize),
    /// Last subscriber left; the entry is gone and its task must be stopped.
    Removed(Option<FeedTask>),
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Mutex<HashMap<String, SubscriptionEntry>>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a subscriber in, creating the entry on first use.
    pub fn acquire(&self, key: &SubscriptionKey, preferred: TransportMethod) -> Acquire {
        let encoded = key.encode();
        let mut entries = self.entries.lock();
        match entries.get_mut(&encoded) {
            Some(entry) => {
                entry.subscriber_count += 1;
                debug!(key = %encoded, count = entry.subscriber_count, "Subscriber joined");
                Acquire::Joined {
                    count: entry.subscriber_count,
                    stale: entry.preferred != preferred,
                    active: entry.is_active,
                }
            }
            None => {
                info!(key = %encoded, method = %preferred, "Subscription created");
                entries.insert(encoded, SubscriptionEntry::new(key.clone(), preferred));
                Acquire::Created
            }
        }
    }

    /// Count a subscriber out, removing the entry at zero.
    pub fn release(&self, encoded: &str) -> Release {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(encoded) else {
            return Release::Missing;
        };
        entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
        if entry.subscriber_count > 0 {
            debug!(key = %encoded, count = entry.subscriber_count, "Subscriber left");
            return Release::Remaining(entry.subscriber_count);
        }
        let removed = entries.remove(encoded).and_then(|mut e| e.task.take());
        info!(key = %encoded, "Subscription removed");
        Release::Removed(removed)
    }

    /// Reset an entry for a fresh start and return its new generation.
    ///
    /// Returns `None` when the entry no longer exists.
    pub fn begin(&self, encoded: &str, method: TransportMethod, fallback: bool) -> Option<u64> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(encoded)?;
        entry.generation += 1;
        entry.method = method;
        entry.is_fallback = fallback;
        entry.is_active = false;
        entry.operation = None;
        entry.last_error = None;
        Some(entry.generation)
    }

    /// Record the chosen client operation.
    pub fn set_operation(&self, encoded: &str, generation: u64, operation: FeedOperation) {
        self.with_current(encoded, generation, |entry| entry.operation = Some(operation));
    }

    /// Attach a running task and mark the entry active.
    ///
    /// # Errors
    ///
    /// Hands the task back when the entry is gone or was restarted in the
    /// meantime; the caller must stop it.
    pub fn attach(&self, encoded: &str, generation: u64, task: FeedTask) -> Result<(), FeedTask> {
        let mut entries = self.entries.lock();
        match entries.get_mut(encoded) {
            Some(entry) if entry.generation == generation => {
                entry.task = Some(task);
                entry.is_active = true;
                Ok(())
            }
            _ => Err(task),
        }
    }

    /// Take the attached task and mark the entry inactive.
    ///
    /// Idempotent: an inactive entry yields `None`.
    pub fn detach(&self, encoded: &str) -> Option<FeedTask> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(encoded)?;
        entry.generation += 1;
        entry.is_active = false;
        entry.task.take()
    }

    /// Mark a start as failed.
    pub fn fail(&self, encoded: &str, generation: u64, error: &str) {
        self.with_current(encoded, generation, |entry| {
            entry.is_active = false;
            entry.last_error = Some(error.to_string());
        });
    }

    /// Record a transient error without changing liveness.
    pub fn note_error(&self, encoded: &str, generation: u64, error: &str) {
        self.with_current(encoded, generation, |entry| {
            entry.last_error = Some(error.to_string());
        });
    }

    /// Switch the entry to polling after push was unsupported or failed.
    pub fn fall_back(&self, encoded: &str, generation: u64, operation: FeedOperation) {
        self.with_current(encoded, generation, |entry| {
            entry.method = TransportMethod::Pull;
            entry.is_fallback = true;
            entry.operation = Some(operation);
        });
    }

    /// Stamp the last-update time after a merge.
    pub fn touch(&self, encoded: &str) {
        if let Some(entry) = self.entries.lock().get_mut(encoded) {
            entry.last_update = Some(Utc::now());
        }
    }

    pub fn set_preferred(&self, encoded: &str, method: TransportMethod) {
        if let Some(entry) = self.entries.lock().get_mut(encoded) {
            entry.preferred = method;
        }
    }

    /// Keys of every entry, sorted by encoding.
    #[must_use]
    pub fn keys(&self) -> Vec<SubscriptionKey> {
        let entries = self.entries.lock();
        let mut keys: Vec<_> = entries.values().map(|e| e.key.clone()).collect();
        keys.sort_by_key(SubscriptionKey::encode);
        keys
    }

    /// Entries of `kind` currently polling, with their fallback flag.
    #[must_use]
    pub fn polling(&self, kind: DataKind) -> Vec<(SubscriptionKey, bool)> {
        let entries = self.entries.lock();
        let mut polling: Vec<_> = entries
            .values()
            .filter(|e| e.key.kind() == kind && e.method == TransportMethod::Pull)
            .map(|e| (e.key.clone(), e.is_fallback))
            .collect();
        polling.sort_by_key(|(key, _)| key.encode());
        polling
    }

    #[must_use]
    pub fn view(&self, encoded: &str) -> Option<ActiveSubscription> {
        self.entries.lock().get(encoded).map(SubscriptionEntry::view)
    }

    /// Diagnostic copies of every entry, sorted by key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActiveSubscription> {
        let entries = self.entries.lock();
        let mut views: Vec<_> = entries.values().map(SubscriptionEntry::view).collect();
        views.sort_by(|a, b| a.key.cmp(&b.key));
        views
    }

    /// Remove every entry, returning the attached tasks.
    pub fn drain(&self) -> Vec<FeedTask> {
        self.entries
            .lock()
            .drain()
            .filter_map(|(_, mut entry)| entry.task.take())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, encoded: &str) -> bool {
        self.entries.lock().contains_key(encoded)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_current(&self, encoded: &str, generation: u64, f: impl FnOnce(&mut SubscriptionEntry)) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(encoded) {
            if entry.generation == generation {
                f(entry);
            }
        }
    }
}
