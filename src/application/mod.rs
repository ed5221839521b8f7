//! Application services (use cases).
//!
//! The subscription registry, fetch orchestrator, merge store and event hub,
//! composed behind the [`MarketFeed`](service::MarketFeed) facade. Depends on
//! `domain` and `port` only.

pub mod events;
pub mod orchestrator;
pub mod provider;
pub mod service;
pub mod settings;
pub mod store;
pub mod subscription;

pub use events::ChartEventHub;
pub use orchestrator::{FeedTask, FetchOrchestrator};
pub use provider::{ExchangeMapping, ProviderRegistry};
pub use service::MarketFeed;
pub use settings::{FeedSettings, PollIntervals};
pub use store::MarketDataStore;
pub use subscription::{ActiveSubscription, SubscriptionRegistry};
