//! Canonical market data store.
//!
//! One copy of the latest known data per subscription key:
//!
//! - **Candles** - ordered by timestamp, merged by timestamp, classified
//!   into [`UpdateKind`] and announced through the [`ChartEventHub`].
//! - **Trades** - append-only ring holding the most recent trades. Records
//!   are not de-duplicated; a retried delivery is stored twice.
//! - **Order books** - the latest snapshot replaces the previous one.
//!
//! Callers only receive copies.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::events::ChartEventHub;
use crate::domain::{Candle, ChartUpdate, DataKind, OrderBook, SubscriptionKey, Trade, UpdateKind};

/// Thread-safe per-key store for candles, trades and order books.
#[derive(Debug)]
pub struct MarketDataStore {
    candles: RwLock<HashMap<String, Vec<Candle>>>,
    trades: RwLock<HashMap<String, VecDeque<Trade>>>,
    books: RwLock<HashMap<String, OrderBook>>,
    trade_capacity: usize,
    events: Arc<ChartEventHub>,
}

impl MarketDataStore {
    /// Create a store keeping at most `trade_capacity` trades per key.
    #[must_use]
    pub fn new(trade_capacity: usize, events: Arc<ChartEventHub>) -> Self {
        Self {
            candles: RwLock::new(HashMap::new()),
            trades: RwLock::new(HashMap::new()),
            books: RwLock::new(HashMap::new()),
            trade_capacity: trade_capacity.max(1),
            events,
        }
    }

    /// Merge a candle batch and announce what changed.
    ///
    /// An empty series takes the batch as-is (sorted, one bar per
    /// timestamp) and reports [`UpdateKind::InitialLoad`]. Otherwise bars
    /// overwrite stored bars with the same timestamp, and the merge reports
    /// [`UpdateKind::NewCandles`] when any bar is newer than the previous
    /// last bar, else [`UpdateKind::UpdateLastCandle`].
    ///
    /// Returns `None` (and emits nothing) for an empty batch or a key that
    /// is not a candle key.
    pub fn merge_candles(&self, key: &SubscriptionKey, batch: Vec<Candle>) -> Option<UpdateKind> {
        if batch.is_empty() {
            return None;
        }
        let timeframe = match (key.kind(), key.timeframe()) {
            (DataKind::Candles, Some(tf)) => tf.clone(),
            _ => {
                debug!(key = %key, "Ignoring candles for non-candle key");
                return None;
            }
        };

        let (kind, candles) = {
            let mut all = self.candles.write();
            let series = all.entry(key.encode()).or_default();

            match series.last().map(|c| c.timestamp) {
                None => {
                    upsert(series, batch);
                    (UpdateKind::InitialLoad, series.clone())
                }
                Some(previous_last) => {
                    let has_newer = batch.iter().any(|c| c.timestamp > previous_last);
                    upsert(series, batch);
                    if has_newer {
                        let fresh = series
                            .iter()
                            .filter(|c| c.timestamp > previous_last)
                            .cloned()
                            .collect();
                        (UpdateKind::NewCandles, fresh)
                    } else {
                        let last = series
                            .iter()
                            .rev()
                            .take(1)
                            .cloned()
                            .collect();
                        (UpdateKind::UpdateLastCandle, last)
                    }
                }
            }
        };

        trace!(key = %key, kind = kind.as_str(), bars = candles.len(), "Candles merged");
        self.events.emit(
            key,
            ChartUpdate {
                kind,
                exchange: key.exchange().clone(),
                market: key.market(),
                symbol: key.symbol().to_string(),
                timeframe,
                candles,
                timestamp: Utc::now(),
            },
        );
        Some(kind)
    }

    /// Append trades, dropping the oldest beyond capacity. Returns the
    /// number of trades now stored for the key.
    pub fn merge_trades(&self, key: &SubscriptionKey, batch: Vec<Trade>) -> usize {
        let mut all = self.trades.write();
        let ring = all.entry(key.encode()).or_default();
        ring.extend(batch);
        while ring.len() > self.trade_capacity {
            ring.pop_front();
        }
        ring.len()
    }

    /// Replace the stored snapshot.
    pub fn replace_order_book(&self, key: &SubscriptionKey, book: OrderBook) {
        self.books.write().insert(key.encode(), book);
    }

    #[must_use]
    pub fn candles(&self, key: &SubscriptionKey) -> Vec<Candle> {
        self.candles
            .read()
            .get(&key.encode())
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn trades(&self, key: &SubscriptionKey) -> Vec<Trade> {
        self.trades
            .read()
            .get(&key.encode())
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn order_book(&self, key: &SubscriptionKey) -> Option<OrderBook> {
        self.books.read().get(&key.encode()).cloned()
    }

    /// Timestamp of the newest stored trade, used as the poll cursor.
    #[must_use]
    pub fn latest_trade_timestamp(&self, key: &SubscriptionKey) -> Option<i64> {
        self.trades
            .read()
            .get(&key.encode())
            .and_then(|ring| ring.iter().map(|t| t.timestamp).max())
    }

    /// Drop everything stored for a key.
    pub fn remove(&self, key: &SubscriptionKey) {
        let encoded = key.encode();
        match key.kind() {
            DataKind::Candles => {
                self.candles.write().remove(&encoded);
            }
            DataKind::Trades => {
                self.trades.write().remove(&encoded);
            }
            DataKind::OrderBook => {
                self.books.write().remove(&encoded);
            }
        }
    }

    pub fn clear(&self) {
        self.candles.write().clear();
        self.trades.write().clear();
        self.books.write().clear();
    }

    #[must_use]
    pub fn events(&self) -> &Arc<ChartEventHub> {
        &self.events
    }
}

/// Insert or overwrite bars by timestamp, keeping the series sorted.
fn upsert(series: &mut Vec<Candle>, mut batch: Vec<Candle>) {
    batch.sort_by_key(|c| c.timestamp);
    for candle in batch {
        match series.binary_search_by_key(&candle.timestamp, |c| c.timestamp) {
            Ok(index) => series[index] = candle,
            Err(index) => series.insert(index, candle),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{MarketType, PriceLevel, Timeframe};

    fn candle(ts: i64, close: Decimal) -> Candle {
        Candle::new(ts, dec!(1), dec!(2), dec!(0.5), close, dec!(10))
    }

    fn candle_key() -> SubscriptionKey {
        SubscriptionKey::candles("binance", MarketType::Spot, "BTC/USDT", Timeframe::new("1h").unwrap())
            .unwrap()
    }

    fn trade_key() -> SubscriptionKey {
        SubscriptionKey::trades("binance", MarketType::Spot, "BTC/USDT").unwrap()
    }

    fn store(capacity: usize) -> MarketDataStore {
        MarketDataStore::new(capacity, Arc::new(ChartEventHub::new()))
    }

    #[test]
    fn classifies_initial_new_and_last_updates() {
        let store = store(10);
        let key = candle_key();

        assert_eq!(
            store.merge_candles(&key, vec![candle(1, dec!(1))]),
            Some(UpdateKind::InitialLoad)
        );
        assert_eq!(
            store.merge_candles(&key, vec![candle(2, dec!(1))]),
            Some(UpdateKind::NewCandles)
        );
        assert_eq!(
            store.merge_candles(&key, vec![candle(2, dec!(3))]),
            Some(UpdateKind::UpdateLastCandle)
        );

        let series = store.candles(&key);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, dec!(3));
    }

    #[test]
    fn newer_bar_wins_classification_over_revision() {
        let store = store(10);
        let key = candle_key();
        store.merge_candles(&key, vec![candle(1, dec!(1)), candle(2, dec!(1))]);

        let kind = store.merge_candles(&key, vec![candle(2, dec!(5)), candle(3, dec!(1))]);
        assert_eq!(kind, Some(UpdateKind::NewCandles));
        let series = store.candles(&key);
        assert_eq!(series.iter().map(|c| c.timestamp).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(series[1].close, dec!(5));
    }

    #[test]
    fn merging_same_batch_twice_is_idempotent() {
        let store = store(10);
        let key = candle_key();
        let batch = vec![candle(3, dec!(1)), candle(1, dec!(1)), candle(2, dec!(1))];

        store.merge_candles(&key, batch.clone());
        let once = store.candles(&key);
        store.merge_candles(&key, batch);
        assert_eq!(store.candles(&key), once);
        assert_eq!(once.iter().map(|c| c.timestamp).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn initial_batch_with_duplicate_timestamps_keeps_last() {
        let store = store(10);
        let key = candle_key();
        store.merge_candles(&key, vec![candle(1, dec!(1)), candle(1, dec!(9))]);
        let series = store.candles(&key);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].close, dec!(9));
    }

    #[test]
    fn empty_batch_and_wrong_kind_are_ignored() {
        let store = store(10);
        assert_eq!(store.merge_candles(&candle_key(), Vec::new()), None);
        assert_eq!(store.merge_candles(&trade_key(), vec![candle(1, dec!(1))]), None);
        assert!(store.candles(&trade_key()).is_empty());
    }

    #[test]
    fn trades_are_capped_and_not_deduplicated() {
        let store = store(3);
        let key = trade_key();
        let trade = |ts| Trade::new(ts, dec!(100), dec!(1)).with_id(format!("t{ts}"));

        store.merge_trades(&key, vec![trade(1), trade(2)]);
        store.merge_trades(&key, vec![trade(2)]);
        let stored = store.trades(&key);
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1], stored[2]);

        assert_eq!(store.merge_trades(&key, vec![trade(3)]), 3);
        let stored = store.trades(&key);
        assert_eq!(stored.iter().map(|t| t.timestamp).collect::<Vec<_>>(), vec![2, 2, 3]);
        assert_eq!(store.latest_trade_timestamp(&key), Some(3));
    }

    #[test]
    fn order_book_is_replaced() {
        let store = store(10);
        let key = SubscriptionKey::order_book("binance", MarketType::Spot, "BTC/USDT").unwrap();
        let book = |ts, price| {
            OrderBook::new(
                "BTC/USDT",
                vec![PriceLevel::new(price, dec!(1))],
                vec![PriceLevel::new(price + dec!(1), dec!(1))],
                ts,
            )
        };

        assert!(store.order_book(&key).is_none());
        store.replace_order_book(&key, book(1, dec!(100)));
        store.replace_order_book(&key, book(2, dec!(200)));
        let stored = store.order_book(&key).unwrap();
        assert_eq!(stored.timestamp(), 2);
        assert_eq!(stored.bids().len(), 1);

        store.remove(&key);
        assert!(store.order_book(&key).is_none());
    }
}
