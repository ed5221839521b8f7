//! Transport vocabulary: push vs pull and the concrete client operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::market::DataKind;
use crate::error::ConfigError;

/// How a feed receives data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMethod {
    /// Persistent streaming connection.
    #[default]
    Push,
    /// Periodic request/response polling.
    Pull,
}

impl TransportMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }

    /// Which cached client flavour this transport needs.
    #[must_use]
    pub const fn client_mode(&self) -> ClientMode {
        match self {
            Self::Push => ClientMode::Push,
            Self::Pull => ClientMode::Pull,
        }
    }
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" | "websocket" => Ok(Self::Push),
            "pull" | "rest" | "poll" => Ok(Self::Pull),
            other => Err(ConfigError::InvalidValue {
                field: "method",
                reason: format!("expected push or pull, got '{other}'"),
            }),
        }
    }
}

/// Flavour of a cached connectivity client.
///
/// Streaming clients and request/response clients are built and cached
/// separately per `(exchange, provider)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    Push,
    Pull,
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => f.write_str("push"),
            Self::Pull => f.write_str("pull"),
        }
    }
}

/// Concrete client operation a feed runs on.
///
/// Recorded on each subscription entry for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedOperation {
    WatchOhlcv,
    FetchOhlcv,
    WatchTrades,
    FetchTrades,
    /// Multi-symbol incremental-diff order book stream.
    WatchOrderBookForSymbols,
    /// Single-symbol full-snapshot order book stream.
    WatchOrderBook,
    FetchOrderBook,
}

impl FeedOperation {
    /// Order-book operations, most to least preferred.
    pub const ORDER_BOOK_RANKING: [FeedOperation; 3] = [
        FeedOperation::WatchOrderBookForSymbols,
        FeedOperation::WatchOrderBook,
        FeedOperation::FetchOrderBook,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WatchOhlcv => "watchOHLCV",
            Self::FetchOhlcv => "fetchOHLCV",
            Self::WatchTrades => "watchTrades",
            Self::FetchTrades => "fetchTrades",
            Self::WatchOrderBookForSymbols => "watchOrderBookForSymbols",
            Self::WatchOrderBook => "watchOrderBook",
            Self::FetchOrderBook => "fetchOrderBook",
        }
    }

    /// True for streaming operations.
    #[must_use]
    pub const fn is_push(&self) -> bool {
        matches!(
            self,
            Self::WatchOhlcv
                | Self::WatchTrades
                | Self::WatchOrderBookForSymbols
                | Self::WatchOrderBook
        )
    }

    /// The request/response operation serving a data kind.
    #[must_use]
    pub const fn pull_for(kind: DataKind) -> Self {
        match kind {
            DataKind::Candles => Self::FetchOhlcv,
            DataKind::Trades => Self::FetchTrades,
            DataKind::OrderBook => Self::FetchOrderBook,
        }
    }
}

impl fmt::Display for FeedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
