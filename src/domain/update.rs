//! Chart update events produced by candle merges.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::candle::Candle;
use super::id::ExchangeId;
use super::market::{MarketType, Timeframe};

/// What a candle merge did to the stored series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// The series was empty; the batch became the series.
    InitialLoad,
    /// At least one bar newer than the previous last bar arrived.
    NewCandles,
    /// Only the previous last bar was revised.
    UpdateLastCandle,
}

impl UpdateKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InitialLoad => "initial_load",
            Self::NewCandles => "new_candles",
            Self::UpdateLastCandle => "update_last_candle",
        }
    }
}

/// One change notification for a candle series.
///
/// `candles` carries the bars relevant to the change: the whole series for
/// an initial load, the bars past the previous last bar for new candles,
/// and the revised last bar otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct ChartUpdate {
    pub kind: UpdateKind,
    pub exchange: ExchangeId,
    pub market: MarketType,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
    pub timestamp: DateTime<Utc>,
}
