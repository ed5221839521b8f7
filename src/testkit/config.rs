//! Canonical test configurations.
//!
//! Single source of truth for the settings and service wiring used across
//! tests, so each test module does not grow its own slightly-different
//! defaults.

use std::sync::Arc;
use std::time::Duration;

use crate::application::provider::ProviderRegistry;
use crate::application::service::MarketFeed;
use crate::application::settings::{FeedSettings, PollIntervals};
use crate::domain::{Provider, TransportMethod};
use crate::infrastructure::exchange::pool::ClientPool;
use crate::port::ClientCache;

use super::client::ScriptedFactory;

/// Feed settings with one-second polls and a short settle delay.
pub fn settings(method: TransportMethod) -> FeedSettings {
    FeedSettings {
        method,
        poll_intervals: PollIntervals {
            candles: Duration::from_secs(1),
            trades: Duration::from_secs(1),
            order_book: Duration::from_secs(1),
        },
        settle_delay: Duration::from_millis(10),
        ..FeedSettings::default()
    }
}

/// A market feed wired to a real [`ClientPool`] over `factory`.
pub struct TestFeed {
    pub feed: Arc<MarketFeed>,
    pub pool: Arc<ClientPool>,
    pub factory: Arc<ScriptedFactory>,
}

/// Wire a feed with the given settings and providers.
pub fn feed_with(
    settings: FeedSettings,
    providers: Vec<Provider>,
    factory: Arc<ScriptedFactory>,
) -> TestFeed {
    let registry =
        Arc::new(ProviderRegistry::with_providers(providers).expect("unique provider ids"));
    let pool = Arc::new(
        ClientPool::new(factory.clone(), Duration::from_secs(30 * 60)).expect("non-zero ttl"),
    );
    let clients: Arc<dyn ClientCache> = pool.clone();
    TestFeed {
        feed: Arc::new(MarketFeed::new(settings, registry, clients)),
        pool,
        factory,
    }
}

/// Push-preferring feed with one wildcard provider.
pub fn feed(factory: Arc<ScriptedFactory>) -> TestFeed {
    feed_with(
        settings(TransportMethod::Push),
        vec![super::domain::provider("default", &["*"], 100)],
        factory,
    )
}
