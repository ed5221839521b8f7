//! `[feed]` section: transport preference, poll cadence and store limits.

use std::time::Duration;

use serde::Deserialize;

use crate::application::settings::{FeedSettings, PollIntervals};
use crate::domain::{MarketType, Timeframe, TransportMethod};
use crate::error::{ConfigError, Result};

/// Feed behaviour defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Global transport preference for new subscriptions.
    #[serde(default)]
    pub method: TransportMethod,
    #[serde(default = "default_candle_poll_ms")]
    pub candle_poll_ms: u64,
    #[serde(default = "default_trade_poll_ms")]
    pub trade_poll_ms: u64,
    #[serde(default = "default_order_book_poll_ms")]
    pub order_book_poll_ms: u64,
    /// Pause between stopping and restarting feeds on a method change.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_candle_backfill_limit")]
    pub candle_backfill_limit: usize,
    #[serde(default = "default_order_book_depth")]
    pub order_book_depth: usize,
    /// Most recent trades kept per symbol.
    #[serde(default = "default_trade_capacity")]
    pub trade_capacity: usize,
    #[serde(default)]
    pub default_market: MarketType,
    #[serde(default = "Timeframe::one_minute")]
    pub default_timeframe: Timeframe,
}

const fn default_candle_poll_ms() -> u64 {
    5_000
}

const fn default_trade_poll_ms() -> u64 {
    2_000
}

const fn default_order_book_poll_ms() -> u64 {
    1_000
}

const fn default_settle_delay_ms() -> u64 {
    100
}

const fn default_candle_backfill_limit() -> usize {
    500
}

const fn default_order_book_depth() -> usize {
    50
}

const fn default_trade_capacity() -> usize {
    1_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            method: TransportMethod::default(),
            candle_poll_ms: default_candle_poll_ms(),
            trade_poll_ms: default_trade_poll_ms(),
            order_book_poll_ms: default_order_book_poll_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            candle_backfill_limit: default_candle_backfill_limit(),
            order_book_depth: default_order_book_depth(),
            trade_capacity: default_trade_capacity(),
            default_market: MarketType::default(),
            default_timeframe: Timeframe::one_minute(),
        }
    }
}

impl FeedConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let positive = [
            ("feed.candle_poll_ms", self.candle_poll_ms),
            ("feed.trade_poll_ms", self.trade_poll_ms),
            ("feed.order_book_poll_ms", self.order_book_poll_ms),
            ("feed.candle_backfill_limit", self.candle_backfill_limit as u64),
            ("feed.order_book_depth", self.order_book_depth as u64),
            ("feed.trade_capacity", self.trade_capacity as u64),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Runtime settings derived from this section.
    #[must_use]
    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            method: self.method,
            poll_intervals: PollIntervals {
                candles: Duration::from_millis(self.candle_poll_ms),
                trades: Duration::from_millis(self.trade_poll_ms),
                order_book: Duration::from_millis(self.order_book_poll_ms),
            },
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            candle_backfill_limit: self.candle_backfill_limit,
            order_book_depth: self.order_book_depth,
            trade_capacity: self.trade_capacity,
            default_market: self.default_market,
            default_timeframe: self.default_timeframe.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_runtime_defaults() {
        let settings = FeedConfig::default().settings();
        let expected = FeedSettings::default();
        assert_eq!(settings.poll_intervals, expected.poll_intervals);
        assert_eq!(settings.settle_delay, expected.settle_delay);
        assert_eq!(settings.trade_capacity, expected.trade_capacity);
        assert_eq!(settings.default_timeframe, expected.default_timeframe);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = FeedConfig {
            trade_poll_ms: 0,
            ..FeedConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
