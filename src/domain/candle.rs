//! OHLCV candle record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. `timestamp` is the bar open time in epoch milliseconds
/// and is the bar's identity when merging series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    #[must_use]
    pub const fn new(
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}
