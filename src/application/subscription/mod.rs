//! Subscription registry: dedup and refcount of live feeds.

mod entry;
mod locks;
mod registry;

pub use entry::ActiveSubscription;
pub use locks::KeyLocks;
pub use registry::{Acquire, Release, SubscriptionRegistry};
