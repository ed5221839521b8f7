//! Fetch orchestrator: brings registry entries to life and tears them down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::{FeedContext, Payload};
use super::task::FeedTask;
use super::{operation, pull, push};
use crate::application::provider::ProviderRegistry;
use crate::application::settings::FeedSettings;
use crate::application::store::MarketDataStore;
use crate::application::subscription::SubscriptionRegistry;
use crate::domain::{
    Candle, ClientMode, DataKind, FeedOperation, Provider, SubscriptionKey, TransportMethod,
};
use crate::error::{FeedError, Result};
use crate::port::{ClientCache, ExchangeClient};

/// Starts and stops the one live resource behind each registry entry.
pub struct FetchOrchestrator {
    registry: Arc<SubscriptionRegistry>,
    store: Arc<MarketDataStore>,
    clients: Arc<dyn ClientCache>,
    providers: Arc<ProviderRegistry>,
    settings: Arc<RwLock<FeedSettings>>,
    next_task_id: AtomicU64,
}

impl FetchOrchestrator {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        store: Arc<MarketDataStore>,
        clients: Arc<dyn ClientCache>,
        providers: Arc<ProviderRegistry>,
        settings: Arc<RwLock<FeedSettings>>,
    ) -> Self {
        Self {
            registry,
            store,
            clients,
            providers,
            settings,
            next_task_id: AtomicU64::new(1),
        }
    }

    /// Start the feed for an existing entry with the given transport.
    ///
    /// Push that the client cannot serve is downgraded to polling with the
    /// fallback flag set, and is not an error. Resolution and client
    /// construction failures leave the entry present but inactive.
    ///
    /// The caller must hold the key's lock and must have stopped any
    /// previous task for the key.
    ///
    /// # Errors
    ///
    /// [`FeedError::NoProvider`] when no enabled provider serves the
    /// exchange, or whatever the client pool reported.
    pub async fn start(
        &self,
        key: &SubscriptionKey,
        method: TransportMethod,
        fallback: bool,
    ) -> Result<()> {
        let encoded = key.encode();
        let Some(generation) = self.registry.begin(&encoded, method, fallback) else {
            debug!(key = %encoded, "Entry removed before start");
            return Ok(());
        };

        let started = match self.providers.resolve(key.exchange()) {
            Some(provider) => {
                let ctx = self.context(key, generation, provider);
                match method {
                    TransportMethod::Push => self.start_push(ctx).await,
                    TransportMethod::Pull => self.start_pull(ctx).await,
                }
            }
            None => Err(FeedError::NoProvider {
                exchange: key.exchange().to_string(),
            }
            .into()),
        };

        match started {
            Ok(task) => {
                let operation = task.operation();
                if let Err(task) = self.registry.attach(&encoded, generation, task) {
                    debug!(key = %encoded, "Entry changed during start, discarding task");
                    task.stop().await;
                } else {
                    info!(key = %encoded, method = %method, operation = %operation, "Feed started");
                }
                Ok(())
            }
            Err(e) => {
                warn!(key = %encoded, method = %method, error = %e, "Feed start failed");
                self.registry.fail(&encoded, generation, &e.to_string());
                Err(e)
            }
        }
    }

    /// Stop whatever is attached to the entry. Idempotent.
    ///
    /// Returns `true` when a running task was stopped.
    pub async fn stop(&self, encoded: &str) -> bool {
        match self.registry.detach(encoded) {
            Some(task) => {
                task.stop().await;
                debug!(key = %encoded, "Feed stopped");
                true
            }
            None => false,
        }
    }

    /// One-shot historical candle fetch, independent of any subscription.
    ///
    /// Nothing is written to the store.
    ///
    /// # Errors
    ///
    /// Fails when no provider serves the exchange, the client cannot be
    /// built, the key is not a candle key, or the fetch itself fails.
    pub async fn load_candles(&self, key: &SubscriptionKey, limit: usize) -> Result<Vec<Candle>> {
        let Some(timeframe) = key.timeframe() else {
            return Err(FeedError::InvalidKey {
                reason: format!("'{key}' is not a candle key"),
            }
            .into());
        };
        let provider = self
            .providers
            .resolve(key.exchange())
            .ok_or_else(|| FeedError::NoProvider {
                exchange: key.exchange().to_string(),
            })?;
        let client = self
            .clients
            .client(key.exchange(), &provider, ClientMode::Pull)
            .await?;
        client
            .fetch_ohlcv(key.market(), key.symbol(), timeframe, Some(limit))
            .await
    }

    async fn start_push(&self, ctx: FeedContext) -> Result<FeedTask> {
        let client = ctx.client(ClientMode::Push).await?;
        let kind = ctx.key.kind();
        let operation = operation::select(kind, client.capabilities());

        if !operation.is_push() {
            info!(
                key = %ctx.encoded,
                "Client has no push support for this feed, polling instead"
            );
            self.registry
                .fall_back(&ctx.encoded, ctx.generation, FeedOperation::pull_for(kind));
            return self.start_pull(ctx).await;
        }
        self.registry
            .set_operation(&ctx.encoded, ctx.generation, operation);

        if kind == DataKind::Candles {
            self.backfill(&ctx, &client).await;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(push::run(ctx, client, operation, cancel.clone()));
        Ok(FeedTask::new(self.next_id(), operation, cancel, handle))
    }

    async fn start_pull(&self, ctx: FeedContext) -> Result<FeedTask> {
        let client = ctx.client(ClientMode::Pull).await?;
        let operation = FeedOperation::pull_for(ctx.key.kind());
        if !client.capabilities().supports(operation) {
            return Err(FeedError::Unsupported {
                operation: operation.as_str(),
            }
            .into());
        }
        self.registry
            .set_operation(&ctx.encoded, ctx.generation, operation);

        // First data without waiting a full interval.
        pull::poll_once(&ctx, client.as_ref()).await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pull::run(ctx, client, cancel.clone()));
        Ok(FeedTask::new(self.next_id(), operation, cancel, handle))
    }

    /// Seed the candle series before pushes arrive. Failures are logged.
    async fn backfill(&self, ctx: &FeedContext, push_client: &Arc<dyn ExchangeClient>) {
        let client = if push_client.capabilities().fetch_ohlcv {
            Ok(Arc::clone(push_client))
        } else {
            ctx.client(ClientMode::Pull).await
        };
        let fetched = match client {
            Ok(client) => pull::fetch(ctx, client.as_ref()).await,
            Err(e) => Err(e),
        };
        match fetched {
            Ok(payload @ Payload::Candles(_)) => ctx.merge(payload),
            Ok(_) => {}
            Err(e) => warn!(key = %ctx.encoded, error = %e, "Candle backfill failed"),
        }
    }

    fn context(&self, key: &SubscriptionKey, generation: u64, provider: Provider) -> FeedContext {
        let settings = self.settings.read();
        FeedContext {
            key: key.clone(),
            encoded: key.encode(),
            generation,
            provider,
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            clients: Arc::clone(&self.clients),
            poll_interval: settings.poll_intervals.get(key.kind()),
            backfill_limit: settings.candle_backfill_limit,
            book_depth: settings.order_book_depth,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("entries", &self.registry.len())
            .finish_non_exhaustive()
    }
}
