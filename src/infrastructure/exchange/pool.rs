//! Client pool: TTL cache of connectivity clients.
//!
//! Clients are keyed by `(exchange, provider, mode)` and expire after a
//! fixed idle time measured from last use (sliding expiry). A miss builds
//! the client through the injected [`ClientFactory`] and runs its one-time
//! `load_markets` before caching it.
//!
//! # Concurrency
//!
//! Each key owns an async slot mutex. Concurrent lookups for the same key
//! queue on it, so at most one construction is in flight per key; lookups
//! for different keys never wait on each other. The slot map itself is a
//! [`DashMap`], so inserts, hits and evictions are safe under any
//! interleaving.
//!
//! Eviction only drops the pool's reference. Feeds already holding a client
//! keep using it until they are restarted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{ClientMode, ExchangeId, Provider, ProviderConnection, ProviderId, ProviderKind};
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::config::pool::PoolConfig;
use crate::port::{ClientCache, ClientFactory, ExchangeClient, PoolStats};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    exchange: ExchangeId,
    provider: ProviderId,
    mode: ClientMode,
}

struct CachedClient {
    client: Arc<dyn ExchangeClient>,
    /// Provider settings the client was built from.
    kind: ProviderKind,
    connection: ProviderConnection,
    last_access: Instant,
}

impl CachedClient {
    fn built_for(&self, provider: &Provider) -> bool {
        self.kind == provider.kind && self.connection == provider.connection
    }
}

#[derive(Default)]
struct Slot {
    cached: Mutex<Option<CachedClient>>,
    /// Mirrors `cached.is_some()` so counting never needs the lock.
    ready: AtomicBool,
}

impl Slot {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// TTL cache of ready-to-use connectivity clients.
pub struct ClientPool {
    factory: Arc<dyn ClientFactory>,
    ttl: Duration,
    slots: DashMap<ClientKey, Arc<Slot>>,
    counters: Counters,
}

impl ClientPool {
    /// Create an empty pool.
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl` is zero.
    pub fn new(factory: Arc<dyn ClientFactory>, ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "pool.ttl_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(Self {
            factory,
            ttl,
            slots: DashMap::new(),
            counters: Counters::default(),
        })
    }

    /// Create a pool from the `[pool]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured TTL is zero.
    pub fn from_config(factory: Arc<dyn ClientFactory>, config: &PoolConfig) -> Result<Self> {
        Self::new(factory, config.ttl())
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached client or build one.
    ///
    /// # Errors
    ///
    /// Factory and `load_markets` errors are returned and nothing is cached.
    pub async fn get(
        &self,
        exchange: &ExchangeId,
        provider: &Provider,
        mode: ClientMode,
    ) -> Result<Arc<dyn ExchangeClient>> {
        let key = ClientKey {
            exchange: exchange.clone(),
            provider: provider.id.clone(),
            mode,
        };
        let slot = Arc::clone(self.slots.entry(key).or_default().value());
        let mut cached = slot.cached.lock().await;
        let now = Instant::now();

        if let Some(entry) = cached.as_mut() {
            let fresh = now.duration_since(entry.last_access) < self.ttl;
            if fresh && entry.built_for(provider) {
                entry.last_access = now;
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(exchange = %exchange, provider = %provider.id, mode = %mode, "Client cache hit");
                return Ok(Arc::clone(&entry.client));
            }
            debug!(
                exchange = %exchange,
                provider = %provider.id,
                mode = %mode,
                expired = !fresh,
                "Discarding cached client"
            );
            *cached = None;
            slot.ready.store(false, Ordering::Release);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let client = self.factory.create(exchange, provider, mode).await?;
        client.load_markets().await?;
        info!(exchange = %exchange, provider = %provider.id, mode = %mode, "Client created");

        *cached = Some(CachedClient {
            client: Arc::clone(&client),
            kind: provider.kind,
            connection: provider.connection.clone(),
            last_access: Instant::now(),
        });
        slot.ready.store(true, Ordering::Release);
        Ok(client)
    }

    /// Evict clients idle for longer than the TTL. Returns how many went.
    ///
    /// Slots busy with a lookup are left alone; that lookup refreshes or
    /// replaces them itself.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        let mut empty = Vec::new();

        for item in &self.slots {
            let Ok(cached) = item.value().cached.try_lock() else {
                continue;
            };
            match cached.as_ref() {
                Some(entry) if now.duration_since(entry.last_access) >= self.ttl => {
                    expired.push((item.key().clone(), Arc::clone(item.value())));
                }
                Some(_) => {}
                None => empty.push((item.key().clone(), Arc::clone(item.value()))),
            }
        }

        let mut evicted = 0;
        for (key, slot) in expired {
            if self.slots.remove_if(&key, |_, v| Arc::ptr_eq(v, &slot)).is_some() {
                evicted += 1;
            }
        }
        for (key, slot) in empty {
            self.slots.remove_if(&key, |_, v| Arc::ptr_eq(v, &slot));
        }

        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            info!(evicted, remaining = self.slots.len(), "Expired clients swept");
        }
        evicted
    }

    /// Spawn the periodic sweep. The first sweep runs one interval from now.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                pool.sweep();
            }
        })
    }

    /// Evict matching slots, counting populated ones.
    fn evict_where(&self, matches: impl Fn(&ClientKey) -> bool) -> usize {
        let keys: Vec<ClientKey> = self
            .slots
            .iter()
            .filter(|item| matches(item.key()))
            .map(|item| item.key().clone())
            .collect();

        let mut evicted = 0;
        for key in keys {
            if let Some((_, slot)) = self.slots.remove(&key) {
                if slot.is_ready() {
                    evicted += 1;
                }
            }
        }
        self.counters
            .evictions
            .fetch_add(evicted as u64, Ordering::Relaxed);
        evicted
    }

    /// Drop every cached client and close its connections.
    pub async fn clear(&self) {
        let keys: Vec<ClientKey> = self.slots.iter().map(|item| item.key().clone()).collect();
        for key in keys {
            let Some((_, slot)) = self.slots.remove(&key) else {
                continue;
            };
            slot.ready.store(false, Ordering::Release);
            let Some(entry) = slot.cached.lock().await.take() else {
                continue;
            };
            if let Err(e) = entry.client.close().await {
                warn!(exchange = %key.exchange, provider = %key.provider, error = %e, "Client close failed");
            }
        }
        debug!("Client pool cleared");
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let cached = self.slots.iter().filter(|item| item.value().is_ready()).count();
        PoolStats {
            cached,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ClientCache for ClientPool {
    async fn client(
        &self,
        exchange: &ExchangeId,
        provider: &Provider,
        mode: ClientMode,
    ) -> std::result::Result<Arc<dyn ExchangeClient>, Error> {
        self.get(exchange, provider, mode).await
    }

    fn invalidate(&self, exchange: &ExchangeId, provider: Option<&ProviderId>) {
        let evicted = self.evict_where(|key| {
            &key.exchange == exchange && provider.map_or(true, |p| &key.provider == p)
        });
        debug!(exchange = %exchange, evicted, "Clients invalidated");
    }

    fn invalidate_provider(&self, provider: &ProviderId) {
        let evicted = self.evict_where(|key| &key.provider == provider);
        debug!(provider = %provider, evicted, "Clients invalidated");
    }

    fn invalidate_all(&self) {
        let evicted = self.evict_where(|_| true);
        debug!(evicted, "All clients invalidated");
    }

    async fn close_all(&self) {
        self.clear().await;
    }
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("ttl", &self.ttl)
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExchangeScope;
    use crate::testkit::client::ScriptedFactory;

    fn provider(id: &str) -> Provider {
        Provider::new(id, id, ExchangeScope::All, 1)
    }

    fn pool(factory: &Arc<ScriptedFactory>, ttl: Duration) -> ClientPool {
        ClientPool::new(factory.clone(), ttl).unwrap()
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let factory = Arc::new(ScriptedFactory::new());
        assert!(ClientPool::new(factory, Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_reuses_client() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        let exchange = ExchangeId::new("binance");

        let a = pool.get(&exchange, &provider("p"), ClientMode::Push).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let b = pool.get(&exchange, &provider("p"), ClientMode::Push).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.create_count(), 1);
        let stats = pool.stats();
        assert_eq!((stats.hits, stats.misses, stats.cached), (1, 1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_slides_with_access() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        let exchange = ExchangeId::new("binance");
        let p = provider("p");

        pool.get(&exchange, &p, ClientMode::Pull).await.unwrap();
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(45)).await;
            pool.get(&exchange, &p, ClientMode::Pull).await.unwrap();
        }
        assert_eq!(factory.create_count(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        pool.get(&exchange, &p, ClientMode::Pull).await.unwrap();
        assert_eq!(factory.create_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn modes_and_providers_are_cached_separately() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        let exchange = ExchangeId::new("binance");

        pool.get(&exchange, &provider("a"), ClientMode::Push).await.unwrap();
        pool.get(&exchange, &provider("a"), ClientMode::Pull).await.unwrap();
        pool.get(&exchange, &provider("b"), ClientMode::Pull).await.unwrap();
        assert_eq!(factory.create_count(), 3);
        assert_eq!(pool.stats().cached, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        let p = provider("p");

        pool.get(&ExchangeId::new("binance"), &p, ClientMode::Pull).await.unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;
        pool.get(&ExchangeId::new("okx"), &p, ClientMode::Pull).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(pool.sweep(), 1);
        let stats = pool.stats();
        assert_eq!(stats.cached, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_by_exchange_and_provider() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        let binance = ExchangeId::new("binance");

        pool.get(&binance, &provider("a"), ClientMode::Pull).await.unwrap();
        pool.get(&binance, &provider("b"), ClientMode::Pull).await.unwrap();
        pool.get(&ExchangeId::new("okx"), &provider("a"), ClientMode::Pull)
            .await
            .unwrap();

        pool.invalidate(&binance, Some(&ProviderId::new("a")));
        assert_eq!(pool.stats().cached, 2);
        pool.invalidate(&binance, None);
        assert_eq!(pool.stats().cached, 1);
        pool.invalidate_provider(&ProviderId::new("a"));
        assert_eq!(pool.stats().cached, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_connection_settings_rebuild_client() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        let exchange = ExchangeId::new("binance");
        let mut p = provider("p");

        pool.get(&exchange, &p, ClientMode::Pull).await.unwrap();
        p.connection.sandbox = true;
        pool.get(&exchange, &p, ClientMode::Pull).await.unwrap();
        assert_eq!(factory.create_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_construction_is_not_cached() {
        let factory = Arc::new(ScriptedFactory::new());
        factory.fail_next("library missing");
        let pool = pool(&factory, Duration::from_secs(60));
        let exchange = ExchangeId::new("binance");

        assert!(pool.get(&exchange, &provider("p"), ClientMode::Pull).await.is_err());
        assert_eq!(pool.stats().cached, 0);
        assert!(pool.get(&exchange, &provider("p"), ClientMode::Pull).await.is_ok());
        assert_eq!(factory.create_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn construction_in_flight_is_not_counted_as_cached() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        let key = ClientKey {
            exchange: ExchangeId::new("binance"),
            provider: ProviderId::new("p"),
            mode: ClientMode::Pull,
        };
        let slot = Arc::clone(pool.slots.entry(key).or_default().value());

        let building = slot.cached.lock().await;
        assert_eq!(pool.stats().cached, 0);
        drop(building);
        pool.invalidate_provider(&ProviderId::new("p"));
        assert_eq!(pool.stats().evictions, 0, "an empty slot is not an eviction");

        pool.get(&ExchangeId::new("binance"), &provider("p"), ClientMode::Pull)
            .await
            .unwrap();
        assert_eq!(pool.stats().cached, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_lookups_build_once() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = Arc::new(pool(&factory, Duration::from_secs(60)));
        let exchange = ExchangeId::new("binance");
        let p = provider("p");

        let lookups = (0..8).map(|_| pool.get(&exchange, &p, ClientMode::Push));
        let results = futures_util::future::join_all(lookups).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(factory.create_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_closes_clients() {
        let factory = Arc::new(ScriptedFactory::new());
        let pool = pool(&factory, Duration::from_secs(60));
        pool.get(&ExchangeId::new("binance"), &provider("p"), ClientMode::Pull)
            .await
            .unwrap();
        pool.clear().await;
        assert_eq!(pool.stats().cached, 0);
        assert_eq!(factory.last_client().unwrap().close_count(), 1);
    }
}
