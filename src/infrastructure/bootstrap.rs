//! Composition root: builds the service graph from configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::application::provider::ProviderRegistry;
use crate::application::service::MarketFeed;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::exchange::pool::ClientPool;
use crate::port::{ClientCache, ClientFactory, PoolStats};

/// A wired-up market feed plus the pieces it needs at runtime.
pub struct FeedRuntime {
    feed: Arc<MarketFeed>,
    pool: Arc<ClientPool>,
    sweep_interval: Duration,
    sweeper: Option<JoinHandle<()>>,
}

/// Assemble providers, client pool and market feed from `config`.
///
/// The connectivity library is injected through `factory`. Nothing is
/// spawned until [`FeedRuntime::start`].
///
/// # Errors
///
/// Invalid provider seeds or pool settings.
pub fn build(config: &Config, factory: Arc<dyn ClientFactory>) -> Result<FeedRuntime> {
    let providers = Arc::new(ProviderRegistry::with_providers(config.providers()?)?);
    let pool = Arc::new(ClientPool::from_config(factory, &config.pool)?);
    let clients: Arc<dyn ClientCache> = pool.clone();
    let feed = Arc::new(MarketFeed::new(
        config.feed.settings(),
        Arc::clone(&providers),
        clients,
    ));

    info!(
        providers = providers.len(),
        method = %config.feed.method,
        ttl_secs = config.pool.ttl_secs,
        "Market feed assembled"
    );
    Ok(FeedRuntime {
        feed,
        pool,
        sweep_interval: config.pool.sweep_interval(),
        sweeper: None,
    })
}

impl FeedRuntime {
    /// Start background maintenance (the client pool sweep). Idempotent.
    pub fn start(&mut self) {
        if self.sweeper.is_none() {
            self.sweeper = Some(self.pool.spawn_sweeper(self.sweep_interval));
            info!(interval_secs = self.sweep_interval.as_secs(), "Client sweeper started");
        }
    }

    #[must_use]
    pub fn feed(&self) -> &Arc<MarketFeed> {
        &self.feed
    }

    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the sweeper, then every feed and cached client.
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
            let _ = sweeper.await;
        }
        self.feed.shutdown().await;
        info!("Market feed stopped");
    }
}

impl Drop for FeedRuntime {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

impl std::fmt::Debug for FeedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedRuntime")
            .field("feed", &self.feed)
            .field("pool", &self.pool)
            .field("running", &self.is_running())
            .finish()
    }
}
