//! Runtime feed settings.
//!
//! The facade holds one [`FeedSettings`] behind a lock; `set_method` and
//! `set_poll_interval` mutate it and restart the affected feeds.

use std::time::Duration;

use crate::domain::{DataKind, MarketType, Timeframe, TransportMethod};

/// Poll interval per data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub candles: Duration,
    pub trades: Duration,
    pub order_book: Duration,
}

impl PollIntervals {
    #[must_use]
    pub const fn get(&self, kind: DataKind) -> Duration {
        match kind {
            DataKind::Candles => self.candles,
            DataKind::Trades => self.trades,
            DataKind::OrderBook => self.order_book,
        }
    }

    pub fn set(&mut self, kind: DataKind, interval: Duration) {
        match kind {
            DataKind::Candles => self.candles = interval,
            DataKind::Trades => self.trades = interval,
            DataKind::OrderBook => self.order_book = interval,
        }
    }
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            candles: Duration::from_millis(5_000),
            trades: Duration::from_millis(2_000),
            order_book: Duration::from_millis(1_000),
        }
    }
}

/// Settings consulted when feeds start.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Global transport preference captured by new subscriptions.
    pub method: TransportMethod,
    pub poll_intervals: PollIntervals,
    /// Pause between stopping and restarting feeds on a method change.
    pub settle_delay: Duration,
    /// Bars requested for candle backfills and chart seeding.
    pub candle_backfill_limit: usize,
    /// Levels kept per side of a stored order book.
    pub order_book_depth: usize,
    /// Most recent trades retained per symbol.
    pub trade_capacity: usize,
    /// Market assumed by accessors when the caller omits it.
    pub default_market: MarketType,
    /// Timeframe assumed by candle accessors when the caller omits it.
    pub default_timeframe: Timeframe,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            method: TransportMethod::Push,
            poll_intervals: PollIntervals::default(),
            settle_delay: Duration::from_millis(100),
            candle_backfill_limit: 500,
            order_book_depth: 50,
            trade_capacity: 1_000,
            default_market: MarketType::Spot,
            default_timeframe: Timeframe::one_minute(),
        }
    }
}
