//! `MarketFeed`: the facade the surrounding application talks to.
//!
//! Owns the registry, orchestrator, store and event hub and sequences
//! every start/stop for a key under that key's lock. Consumers get
//! `Result`s and copies; nothing here panics into caller code.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::events::ChartEventHub;
use super::orchestrator::FetchOrchestrator;
use super::provider::{ExchangeMapping, ProviderRegistry};
use super::settings::FeedSettings;
use super::store::MarketDataStore;
use super::subscription::{Acquire, ActiveSubscription, KeyLocks, Release, SubscriptionRegistry};
use crate::domain::{
    Candle, DataKind, ExchangeId, ExchangeScope, ListenerId, MarketType, OrderBook, Provider,
    ProviderId, ProviderStatus, SubscriberId, SubscriptionKey, Timeframe, Trade, TransportMethod,
};
use crate::error::{ConfigError, Result};
use crate::port::{ChartListener, ClientCache, CredentialStore};

/// Live market data service.
///
/// Construct once at startup and share behind an `Arc`.
pub struct MarketFeed {
    registry: Arc<SubscriptionRegistry>,
    orchestrator: FetchOrchestrator,
    store: Arc<MarketDataStore>,
    events: Arc<ChartEventHub>,
    providers: Arc<ProviderRegistry>,
    clients: Arc<dyn ClientCache>,
    settings: Arc<RwLock<FeedSettings>>,
    locks: KeyLocks,
    /// Serialises global reconfiguration (`set_method`, `set_poll_interval`).
    reconfigure: Mutex<()>,
}

impl MarketFeed {
    #[must_use]
    pub fn new(
        settings: FeedSettings,
        providers: Arc<ProviderRegistry>,
        clients: Arc<dyn ClientCache>,
    ) -> Self {
        let events = Arc::new(ChartEventHub::new());
        let store = Arc::new(MarketDataStore::new(
            settings.trade_capacity,
            Arc::clone(&events),
        ));
        let registry = Arc::new(SubscriptionRegistry::new());
        let settings = Arc::new(RwLock::new(settings));
        let orchestrator = FetchOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&clients),
            Arc::clone(&providers),
            Arc::clone(&settings),
        );

        Self {
            registry,
            orchestrator,
            store,
            events,
            providers,
            clients,
            settings,
            locks: KeyLocks::new(),
            reconfigure: Mutex::new(()),
        }
    }

    // -- Subscriptions -------------------------------------------------------

    /// Count a subscriber in and make sure the feed is running.
    ///
    /// The first subscriber starts the feed with the current global
    /// transport preference. Later subscribers join it; if the preference
    /// changed since the feed started, the feed is restarted with the new
    /// one, and an inactive feed is retried.
    ///
    /// # Errors
    ///
    /// Start failures are returned here. The entry stays registered
    /// (inactive) either way, so the subscriber still owes an `unsubscribe`.
    pub async fn subscribe(&self, subscriber: &SubscriberId, key: &SubscriptionKey) -> Result<()> {
        let encoded = key.encode();
        let _guard = self.locks.lock(&encoded).await;
        let preferred = self.settings.read().method;

        match self.registry.acquire(key, preferred) {
            Acquire::Created => {
                debug!(subscriber = %subscriber, key = %encoded, "First subscriber");
                self.orchestrator.start(key, preferred, false).await
            }
            Acquire::Joined { stale: true, .. } => {
                info!(key = %encoded, method = %preferred, "Transport preference changed, restarting feed");
                self.orchestrator.stop(&encoded).await;
                self.registry.set_preferred(&encoded, preferred);
                self.orchestrator.start(key, preferred, false).await
            }
            Acquire::Joined { active: false, .. } => {
                info!(key = %encoded, "Retrying inactive feed");
                self.orchestrator.stop(&encoded).await;
                self.orchestrator.start(key, preferred, false).await
            }
            Acquire::Joined { count, .. } => {
                debug!(subscriber = %subscriber, key = %encoded, count, "Joined running feed");
                Ok(())
            }
        }
    }

    /// Count a subscriber out; the last one out stops the feed and drops
    /// the stored data. Unknown keys are ignored.
    pub async fn unsubscribe(&self, subscriber: &SubscriberId, key: &SubscriptionKey) {
        let encoded = key.encode();
        let guard = self.locks.lock(&encoded).await;

        match self.registry.release(&encoded) {
            Release::Missing => {
                debug!(subscriber = %subscriber, key = %encoded, "Unsubscribe for unknown key");
            }
            Release::Remaining(count) => {
                debug!(subscriber = %subscriber, key = %encoded, count, "Subscriber left");
            }
            Release::Removed(task) => {
                if let Some(task) = task {
                    task.stop().await;
                }
                self.store.remove(key);
                info!(key = %encoded, "Feed released");
            }
        }

        drop(guard);
        self.locks.prune(&encoded);
    }

    /// [`subscribe`](Self::subscribe) from loose arguments.
    ///
    /// # Errors
    ///
    /// Invalid keys fail before anything is registered.
    pub async fn subscribe_to(
        &self,
        subscriber: &SubscriberId,
        exchange: &str,
        market: MarketType,
        symbol: &str,
        kind: DataKind,
        timeframe: Option<Timeframe>,
    ) -> Result<()> {
        let key = SubscriptionKey::new(exchange, market, symbol, kind, timeframe)?;
        self.subscribe(subscriber, &key).await
    }

    /// [`unsubscribe`](Self::unsubscribe) from loose arguments. An invalid
    /// key cannot have an entry, so it is ignored.
    pub async fn unsubscribe_from(
        &self,
        subscriber: &SubscriberId,
        exchange: &str,
        market: MarketType,
        symbol: &str,
        kind: DataKind,
        timeframe: Option<Timeframe>,
    ) {
        if let Ok(key) = SubscriptionKey::new(exchange, market, symbol, kind, timeframe) {
            self.unsubscribe(subscriber, &key).await;
        }
    }

    // -- Global configuration ------------------------------------------------

    /// Change the global transport preference and restart every feed.
    ///
    /// All feeds are stopped first, then after the settle delay all are
    /// started again with the new method, so no feed runs on the old
    /// transport once this returns. Individual start failures are logged
    /// and left on the entries.
    pub async fn set_method(&self, method: TransportMethod) {
        let _serial = self.reconfigure.lock().await;
        let settle = {
            let mut settings = self.settings.write();
            settings.method = method;
            settings.settle_delay
        };

        let keys = self.registry.keys();
        let encoded: Vec<String> = keys.iter().map(SubscriptionKey::encode).collect();
        let _guards = self.locks.lock_all(&encoded).await;
        info!(method = %method, feeds = keys.len(), "Switching transport");

        join_all(encoded.iter().map(|e| self.orchestrator.stop(e))).await;
        tokio::time::sleep(settle).await;

        let starts = keys.iter().map(|key| async move {
            self.registry.set_preferred(&key.encode(), method);
            if let Err(e) = self.orchestrator.start(key, method, false).await {
                warn!(key = %key, error = %e, "Feed failed to restart");
            }
        });
        join_all(starts).await;
    }

    /// Change the poll interval for one data kind and restart the feeds of
    /// that kind that are currently polling.
    ///
    /// # Errors
    ///
    /// Rejects a zero interval.
    pub async fn set_poll_interval(&self, kind: DataKind, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        let _serial = self.reconfigure.lock().await;
        self.settings.write().poll_intervals.set(kind, interval);

        let polling = self.registry.polling(kind);
        info!(
            kind = %kind,
            interval_ms = interval.as_millis() as u64,
            feeds = polling.len(),
            "Poll interval changed"
        );
        for (key, fallback) in polling {
            let encoded = key.encode();
            let _guard = self.locks.lock(&encoded).await;
            self.orchestrator.stop(&encoded).await;
            if let Err(e) = self
                .orchestrator
                .start(&key, TransportMethod::Pull, fallback)
                .await
            {
                warn!(key = %encoded, error = %e, "Feed failed to restart");
            }
        }
        Ok(())
    }

    /// Current settings snapshot.
    #[must_use]
    pub fn settings(&self) -> FeedSettings {
        self.settings.read().clone()
    }

    // -- Data access ---------------------------------------------------------

    /// Stored candles. Omitted market and timeframe fall back to the
    /// configured defaults. Never blocks; empty until data arrives.
    #[must_use]
    pub fn candles(
        &self,
        exchange: &str,
        symbol: &str,
        market: Option<MarketType>,
        timeframe: Option<Timeframe>,
    ) -> Vec<Candle> {
        let (market, timeframe) = self.defaults(market, timeframe);
        SubscriptionKey::candles(exchange, market, symbol, timeframe)
            .map(|key| self.store.candles(&key))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn trades(&self, exchange: &str, symbol: &str, market: Option<MarketType>) -> Vec<Trade> {
        let (market, _) = self.defaults(market, None);
        SubscriptionKey::trades(exchange, market, symbol)
            .map(|key| self.store.trades(&key))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn order_book(
        &self,
        exchange: &str,
        symbol: &str,
        market: Option<MarketType>,
    ) -> Option<OrderBook> {
        let (market, _) = self.defaults(market, None);
        SubscriptionKey::order_book(exchange, market, symbol)
            .ok()
            .and_then(|key| self.store.order_book(&key))
    }

    /// Direct read access to the store, by key.
    #[must_use]
    pub fn store(&self) -> &MarketDataStore {
        &self.store
    }

    /// Diagnostic view of every registered feed, sorted by key.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<ActiveSubscription> {
        self.registry.snapshot()
    }

    #[must_use]
    pub fn subscription(&self, key: &SubscriptionKey) -> Option<ActiveSubscription> {
        self.registry.view(&key.encode())
    }

    /// Historical candles for seeding a chart before subscribing.
    ///
    /// Not written to the store.
    ///
    /// # Errors
    ///
    /// Provider resolution, client and fetch errors are returned as-is.
    pub async fn initialize_chart_data(
        &self,
        exchange: &str,
        symbol: &str,
        timeframe: Timeframe,
        market: Option<MarketType>,
    ) -> Result<Vec<Candle>> {
        let (market, timeframe) = self.defaults(market, Some(timeframe));
        let key = SubscriptionKey::candles(exchange, market, symbol, timeframe)?;
        let limit = self.settings.read().candle_backfill_limit;
        self.orchestrator.load_candles(&key, limit).await
    }

    // -- Chart events --------------------------------------------------------

    /// # Errors
    ///
    /// Only candle keys accept listeners.
    pub fn add_chart_listener(
        &self,
        key: &SubscriptionKey,
        listener: Arc<dyn ChartListener>,
    ) -> Result<ListenerId> {
        Ok(self.events.add_listener(key, listener)?)
    }

    pub fn remove_chart_listener(&self, key: &SubscriptionKey, id: ListenerId) -> bool {
        self.events.remove_listener(key, id)
    }

    // -- Providers -----------------------------------------------------------

    #[must_use]
    pub fn providers(&self) -> Vec<Provider> {
        self.providers.list()
    }

    #[must_use]
    pub fn resolve_provider(&self, exchange: &ExchangeId) -> Option<Provider> {
        self.providers.resolve(exchange)
    }

    pub fn create_mapping(
        &self,
        exchanges: &[ExchangeId],
        credentials: &dyn CredentialStore,
    ) -> Vec<ExchangeMapping> {
        self.providers.create_mapping(exchanges, credentials)
    }

    /// # Errors
    ///
    /// Invalid or duplicate providers are rejected.
    pub fn add_provider(&self, provider: Provider) -> Result<()> {
        let scope = provider.exchanges.clone();
        self.providers.add(provider)?;
        self.invalidate_scope(&scope);
        Ok(())
    }

    /// # Errors
    ///
    /// Unknown or invalid providers are rejected.
    pub fn update_provider(&self, provider: Provider) -> Result<()> {
        let id = provider.id.clone();
        let scope = provider.exchanges.clone();
        let previous = self.providers.update(provider)?;
        self.clients.invalidate_provider(&id);
        self.invalidate_scope(&previous.exchanges);
        self.invalidate_scope(&scope);
        Ok(())
    }

    /// # Errors
    ///
    /// Unknown providers are rejected.
    pub fn remove_provider(&self, id: &ProviderId) -> Result<Provider> {
        let removed = self.providers.remove(id)?;
        self.clients.invalidate_provider(id);
        self.invalidate_scope(&removed.exchanges);
        Ok(removed)
    }

    /// # Errors
    ///
    /// Unknown providers are rejected.
    pub fn set_provider_enabled(&self, id: &ProviderId, enabled: bool) -> Result<()> {
        let provider = self.providers.set_enabled(id, enabled)?;
        self.invalidate_scope(&provider.exchanges);
        Ok(())
    }

    /// Status only affects tie-breaks between equal priorities, so cached
    /// clients are kept.
    ///
    /// # Errors
    ///
    /// Unknown providers are rejected.
    pub fn set_provider_status(&self, id: &ProviderId, status: ProviderStatus) -> Result<()> {
        self.providers.set_status(id, status)?;
        Ok(())
    }

    // -- Lifecycle -----------------------------------------------------------

    /// Stop every feed, drop all entries and stored data, and close the
    /// cached clients.
    pub async fn shutdown(&self) {
        let _serial = self.reconfigure.lock().await;
        let tasks = self.registry.drain();
        info!(feeds = tasks.len(), "Shutting down market feed");
        join_all(tasks.into_iter().map(|task| task.stop())).await;
        self.store.clear();
        self.clients.close_all().await;
    }

    fn defaults(
        &self,
        market: Option<MarketType>,
        timeframe: Option<Timeframe>,
    ) -> (MarketType, Timeframe) {
        let settings = self.settings.read();
        (
            market.unwrap_or(settings.default_market),
            timeframe.unwrap_or_else(|| settings.default_timeframe.clone()),
        )
    }

    /// Drop cached clients that a provider change may have re-routed.
    fn invalidate_scope(&self, scope: &ExchangeScope) {
        match scope {
            ExchangeScope::All => self.clients.invalidate_all(),
            ExchangeScope::Listed(exchanges) => {
                for exchange in exchanges {
                    self.clients.invalidate(exchange, None);
                }
            }
        }
    }
}

impl std::fmt::Debug for MarketFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketFeed")
            .field("feeds", &self.registry.len())
            .field("providers", &self.providers.len())
            .finish_non_exhaustive()
    }
}
