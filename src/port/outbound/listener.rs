//! Chart listener port.
//!
//! Consumers implement [`ChartListener`] (or pass a closure) to be told when
//! a candle series they care about changes.

use crate::domain::ChartUpdate;

/// Receives chart update events.
///
/// # Implementation Notes
///
/// - Called from a runtime task, never from inside a merge
/// - Should return quickly; spawn for slow work
/// - A panic is caught and logged, and other listeners still run
pub trait ChartListener: Send + Sync {
    fn on_update(&self, update: &ChartUpdate);
}

impl<F> ChartListener for F
where
    F: Fn(&ChartUpdate) + Send + Sync,
{
    fn on_update(&self, update: &ChartUpdate) {
        self(update);
    }
}

/// A logging listener that reports updates via tracing.
pub struct LogListener;

impl ChartListener for LogListener {
    fn on_update(&self, update: &ChartUpdate) {
        tracing::debug!(
            exchange = %update.exchange,
            market = %update.market,
            symbol = %update.symbol,
            timeframe = %update.timeframe,
            kind = update.kind.as_str(),
            candles = update.candles.len(),
            "Chart update"
        );
    }
}
