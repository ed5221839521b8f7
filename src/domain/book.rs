//! Order book snapshot types.
//!
//! - [`PriceLevel`] - A single price level with size
//! - [`OrderBook`] - Latest known depth for one symbol
//!
//! Bids are sorted by price descending (best bid first), asks ascending
//! (best ask first). Diff streams are folded into full snapshots by the
//! connectivity client before they reach this type.
//!
//! ```
//! use feedhub::domain::book::{OrderBook, PriceLevel};
//! use rust_decimal_macros::dec;
//!
//! let book = OrderBook::new(
//!     "BTC/USDT",
//!     vec![PriceLevel::new(dec!(100.5), dec!(2))],
//!     vec![PriceLevel::new(dec!(100.7), dec!(1))],
//!     1_700_000_000_000,
//! );
//!
//! assert_eq!(book.spread(), Some(dec!(0.2)));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price level in an order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    price: Decimal,
    size: Decimal,
}

impl PriceLevel {
    #[must_use]
    pub const fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    #[must_use]
    pub const fn size(&self) -> Decimal {
        self.size
    }
}

/// Full order-book snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    symbol: String,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    /// Exchange timestamp of the snapshot, epoch milliseconds.
    timestamp: i64,
    /// Sequence number reported by the exchange, when it provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<u64>,
}

impl OrderBook {
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            bids,
            asks,
            timestamp,
            nonce: None,
        }
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    #[must_use]
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[must_use]
    pub const fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Best ask minus best bid, if both sides are populated.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.price() - self.best_bid()?.price())
    }

    /// Keep at most `depth` levels per side.
    pub fn truncate(&mut self, depth: usize) {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_book_has_no_spread() {
        let book = OrderBook::new("ETH/USDT", vec![], vec![], 0);
        assert!(book.best_bid().is_none());
        assert!(book.spread().is_none());
    }

    #[test]
    fn truncate_limits_both_sides() {
        let mut book = OrderBook::new(
            "ETH/USDT",
            vec![
                PriceLevel::new(dec!(10), dec!(1)),
                PriceLevel::new(dec!(9), dec!(1)),
            ],
            vec![
                PriceLevel::new(dec!(11), dec!(1)),
                PriceLevel::new(dec!(12), dec!(1)),
            ],
            5,
        );
        book.truncate(1);
        assert_eq!(book.bids().len(), 1);
        assert_eq!(book.asks().len(), 1);
        assert_eq!(book.spread(), Some(dec!(1)));
    }
}
