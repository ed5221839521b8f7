//! Feedhub - deduplicated live market data for multi-widget dashboards.
//!
//! Many independent consumers (charts, trade tapes, depth views) ask for
//! the same exchange data. Feedhub keeps exactly one live feed per
//! distinct request, merges what it receives into a shared store and
//! notifies chart listeners of what changed.
//!
//! # Architecture
//!
//! - [`domain`] - Pure data: subscription keys, candles, trades, books,
//!   providers
//! - [`port`] - Traits at the edges: connectivity client, client cache,
//!   credentials, chart listeners, operator use cases
//! - [`application`] - Subscription registry, fetch orchestrator, merge
//!   store, event hub and the [`MarketFeed`](application::MarketFeed) facade
//! - [`infrastructure`] - Configuration, the TTL client pool and wiring
//! - [`adapter`] - The operator CLI
//!
//! # Example
//!
//! ```no_run
//! # async fn demo(factory: std::sync::Arc<dyn feedhub::port::ClientFactory>) -> feedhub::error::Result<()> {
//! use feedhub::domain::{MarketType, SubscriberId, SubscriptionKey, Timeframe};
//! use feedhub::infrastructure::bootstrap;
//! use feedhub::infrastructure::config::settings::Config;
//!
//! let config = Config::load("config.toml")?;
//! let mut runtime = bootstrap::build(&config, factory)?;
//! runtime.start();
//!
//! let key = SubscriptionKey::candles("binance", MarketType::Spot, "BTC/USDT", Timeframe::one_minute())?;
//! runtime.feed().subscribe(&SubscriberId::new("chart-1"), &key).await?;
//! let bars = runtime.feed().candles("binance", "BTC/USDT", None, None);
//! # let _ = bars;
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
