//! Market classification types: market type, timeframe and data kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Market segment on an exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    #[default]
    Spot,
    Margin,
    Swap,
    Future,
    Option,
}

impl MarketType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Margin => "margin",
            Self::Swap => "swap",
            Self::Future => "future",
            Self::Option => "option",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketType {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spot" => Ok(Self::Spot),
            "margin" => Ok(Self::Margin),
            "swap" => Ok(Self::Swap),
            "future" | "futures" => Ok(Self::Future),
            "option" | "options" => Ok(Self::Option),
            other => Err(FeedError::InvalidKey {
                reason: format!("unknown market type '{other}'"),
            }),
        }
    }
}

/// Kind of market data a feed carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Candles,
    Trades,
    OrderBook,
}

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::Candles, DataKind::Trades, DataKind::OrderBook];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Candles => "candles",
            Self::Trades => "trades",
            Self::OrderBook => "order_book",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candles" | "ohlcv" => Ok(Self::Candles),
            "trades" => Ok(Self::Trades),
            "order_book" | "orderbook" => Ok(Self::OrderBook),
            other => Err(FeedError::InvalidKey {
                reason: format!("unknown data kind '{other}'"),
            }),
        }
    }
}

/// Candle timeframe such as `1m`, `15m`, `4h` or `1M`.
///
/// Validated on construction: a positive integer followed by one of
/// `s m h d w M`. The unit is case sensitive (`1m` is a minute, `1M` a month).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe(String);

impl Timeframe {
    /// Parse and validate a timeframe.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidKey`] when the string is not `<n><unit>`.
    pub fn new(raw: impl Into<String>) -> Result<Self, FeedError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        let invalid = || FeedError::InvalidKey {
            reason: format!("invalid timeframe '{raw}'"),
        };

        let unit = trimmed.chars().last().ok_or_else(invalid)?;
        if !matches!(unit, 's' | 'm' | 'h' | 'd' | 'w' | 'M') {
            return Err(invalid());
        }
        let count = &trimmed[..trimmed.len() - unit.len_utf8()];
        match count.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self(trimmed.to_string())),
            _ => Err(invalid()),
        }
    }

    /// The one-minute timeframe.
    #[must_use]
    pub fn one_minute() -> Self {
        Self("1m".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = FeedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Timeframe {
    type Error = FeedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_accepts_common_values() {
        for tf in ["1s", "1m", "15m", "4h", "1d", "1w", "1M"] {
            assert!(Timeframe::new(tf).is_ok(), "{tf} should be valid");
        }
    }

    #[test]
    fn timeframe_rejects_garbage() {
        for tf in ["", "m", "0m", "1x", "h1", "-1h"] {
            assert!(Timeframe::new(tf).is_err(), "{tf} should be invalid");
        }
    }

    #[test]
    fn market_type_parses_aliases() {
        assert_eq!("FUTURES".parse::<MarketType>().unwrap(), MarketType::Future);
        assert_eq!("spot".parse::<MarketType>().unwrap(), MarketType::Spot);
        assert!("perp".parse::<MarketType>().is_err());
    }

    #[test]
    fn data_kind_round_trips_display() {
        for kind in DataKind::ALL {
            assert_eq!(kind.as_str().parse::<DataKind>().unwrap(), kind);
        }
    }
}
