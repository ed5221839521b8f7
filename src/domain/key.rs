//! Canonical identity of one logical data feed.

use std::fmt;

use serde::{Serialize, Serializer};

use super::id::ExchangeId;
use super::market::{DataKind, MarketType, Timeframe};
use crate::error::FeedError;

/// Identity of a live feed: `(exchange, market, symbol, kind, timeframe?)`.
///
/// The timeframe is carried only by candle keys. Construction through
/// [`SubscriptionKey::new`] enforces that, so two logically identical
/// requests always produce the same [`encode`](Self::encode) string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    exchange: ExchangeId,
    market: MarketType,
    symbol: String,
    kind: DataKind,
    timeframe: Option<Timeframe>,
}

impl SubscriptionKey {
    /// Build a key, validating the timeframe rule.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidKey`] when the symbol is empty or a
    /// candle key has no timeframe. A timeframe given for trades or order
    /// books is ignored.
    pub fn new(
        exchange: impl Into<ExchangeId>,
        market: MarketType,
        symbol: impl Into<String>,
        kind: DataKind,
        timeframe: Option<Timeframe>,
    ) -> Result<Self, FeedError> {
        let symbol = symbol.into().trim().to_string();
        if symbol.is_empty() {
            return Err(FeedError::InvalidKey {
                reason: "symbol must not be empty".to_string(),
            });
        }
        let exchange = exchange.into();
        if exchange.as_str().is_empty() {
            return Err(FeedError::InvalidKey {
                reason: "exchange must not be empty".to_string(),
            });
        }

        let timeframe = match kind {
            DataKind::Candles => Some(timeframe.ok_or_else(|| FeedError::InvalidKey {
                reason: "candle subscriptions require a timeframe".to_string(),
            })?),
            DataKind::Trades | DataKind::OrderBook => None,
        };

        Ok(Self {
            exchange,
            market,
            symbol,
            kind,
            timeframe,
        })
    }

    /// Candle key shorthand.
    pub fn candles(
        exchange: impl Into<ExchangeId>,
        market: MarketType,
        symbol: impl Into<String>,
        timeframe: Timeframe,
    ) -> Result<Self, FeedError> {
        Self::new(exchange, market, symbol, DataKind::Candles, Some(timeframe))
    }

    /// Trade key shorthand.
    pub fn trades(
        exchange: impl Into<ExchangeId>,
        market: MarketType,
        symbol: impl Into<String>,
    ) -> Result<Self, FeedError> {
        Self::new(exchange, market, symbol, DataKind::Trades, None)
    }

    /// Order-book key shorthand.
    pub fn order_book(
        exchange: impl Into<ExchangeId>,
        market: MarketType,
        symbol: impl Into<String>,
    ) -> Result<Self, FeedError> {
        Self::new(exchange, market, symbol, DataKind::OrderBook, None)
    }

    #[must_use]
    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    #[must_use]
    pub fn market(&self) -> MarketType {
        self.market
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    #[must_use]
    pub fn timeframe(&self) -> Option<&Timeframe> {
        self.timeframe.as_ref()
    }

    /// Canonical string encoding used as the mapping key everywhere.
    ///
    /// Format: `exchange:market:symbol:kind[:timeframe]`.
    #[must_use]
    pub fn encode(&self) -> String {
        match &self.timeframe {
            Some(tf) => format!(
                "{}:{}:{}:{}:{}",
                self.exchange, self.market, self.symbol, self.kind, tf
            ),
            None => format!(
                "{}:{}:{}:{}",
                self.exchange, self.market, self.symbol, self.kind
            ),
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for SubscriptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}
