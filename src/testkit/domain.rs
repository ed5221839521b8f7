//! Builders for domain primitives used across tests.
//!
//! Concise factory functions for keys, candles, trades, books and
//! providers so tests focus on assertions rather than construction.

use rust_decimal::Decimal;

use crate::domain::{
    Candle, ExchangeScope, MarketType, OrderBook, PriceLevel, Provider, SubscriberId,
    SubscriptionKey, Timeframe, Trade,
};

/// One-minute spot candle key.
pub fn candle_key(exchange: &str, symbol: &str) -> SubscriptionKey {
    SubscriptionKey::candles(exchange, MarketType::Spot, symbol, Timeframe::one_minute())
        .expect("valid candle key")
}

/// Spot trade key.
pub fn trade_key(exchange: &str, symbol: &str) -> SubscriptionKey {
    SubscriptionKey::trades(exchange, MarketType::Spot, symbol).expect("valid trade key")
}

/// Spot order-book key.
pub fn book_key(exchange: &str, symbol: &str) -> SubscriptionKey {
    SubscriptionKey::order_book(exchange, MarketType::Spot, symbol).expect("valid book key")
}

pub fn subscriber(id: &str) -> SubscriberId {
    SubscriberId::new(id)
}

/// Flat candle: open, high, low and close all equal `close`.
pub fn candle(timestamp: i64, close: i64) -> Candle {
    let price = Decimal::from(close);
    Candle::new(timestamp, price, price, price, price, Decimal::ONE)
}

/// Consecutive one-minute candles starting at `start`.
pub fn candles(start: i64, count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let offset = i64::try_from(i).expect("small count");
            candle(start + offset * 60_000, 100 + offset)
        })
        .collect()
}

pub fn trade(timestamp: i64, price: i64) -> Trade {
    Trade::new(timestamp, Decimal::from(price), Decimal::ONE)
}

/// One level per side around `mid`.
pub fn book(symbol: &str, mid: i64, timestamp: i64) -> OrderBook {
    OrderBook::new(
        symbol,
        vec![PriceLevel::new(Decimal::from(mid - 1), Decimal::ONE)],
        vec![PriceLevel::new(Decimal::from(mid + 1), Decimal::ONE)],
        timestamp,
    )
}

/// Book with `depth` levels per side.
pub fn deep_book(symbol: &str, depth: usize) -> OrderBook {
    let levels = |sign: i64| {
        (1..=depth)
            .map(|i| {
                let i = i64::try_from(i).expect("small depth");
                PriceLevel::new(Decimal::from(100 + sign * i), Decimal::ONE)
            })
            .collect()
    };
    OrderBook::new(symbol, levels(-1), levels(1), 0)
}

/// Enabled local provider serving `exchanges` ("*" for all).
pub fn provider(id: &str, exchanges: &[&str], priority: u32) -> Provider {
    Provider::new(id, id, ExchangeScope::from_ids(exchanges), priority)
}
