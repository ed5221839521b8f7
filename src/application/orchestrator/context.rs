//! State shared by one feed's start path and its spawned loop.

use std::sync::Arc;
use std::time::Duration;

use crate::application::store::MarketDataStore;
use crate::application::subscription::SubscriptionRegistry;
use crate::domain::{Candle, ClientMode, OrderBook, Provider, SubscriptionKey, Trade};
use crate::error::Result;
use crate::port::{ClientCache, ExchangeClient};

/// One payload from a watch or fetch call.
#[derive(Debug)]
pub(crate) enum Payload {
    Candles(Vec<Candle>),
    Trades(Vec<Trade>),
    OrderBook(OrderBook),
}

#[derive(Clone)]
pub(crate) struct FeedContext {
    pub key: SubscriptionKey,
    pub encoded: String,
    /// Entry generation this feed was started under.
    pub generation: u64,
    pub provider: Provider,
    pub registry: Arc<SubscriptionRegistry>,
    pub store: Arc<MarketDataStore>,
    pub clients: Arc<dyn ClientCache>,
    pub poll_interval: Duration,
    pub backfill_limit: usize,
    pub book_depth: usize,
}

impl FeedContext {
    pub async fn client(&self, mode: ClientMode) -> Result<Arc<dyn ExchangeClient>> {
        self.clients
            .client(self.key.exchange(), &self.provider, mode)
            .await
    }

    /// Hand a payload to the store and stamp the entry.
    pub fn merge(&self, payload: Payload) {
        match payload {
            Payload::Candles(candles) => {
                self.store.merge_candles(&self.key, candles);
            }
            Payload::Trades(trades) => {
                self.store.merge_trades(&self.key, trades);
            }
            Payload::OrderBook(mut book) => {
                book.truncate(self.book_depth);
                self.store.replace_order_book(&self.key, book);
            }
        }
        self.registry.touch(&self.encoded);
    }
}
