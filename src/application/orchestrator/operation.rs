//! Client operation selection.

use crate::domain::{DataKind, FeedOperation};
use crate::port::Capabilities;

const CANDLE_RANKING: [FeedOperation; 2] = [FeedOperation::WatchOhlcv, FeedOperation::FetchOhlcv];
const TRADE_RANKING: [FeedOperation; 2] = [FeedOperation::WatchTrades, FeedOperation::FetchTrades];

/// Highest-ranked operation the client declares for `kind`.
///
/// Falls through to the pull operation when nothing is declared; the pull
/// path reports that as unsupported if the client cannot fetch either.
pub(crate) fn select(kind: DataKind, capabilities: Capabilities) -> FeedOperation {
    let ranking: &[FeedOperation] = match kind {
        DataKind::Candles => &CANDLE_RANKING,
        DataKind::Trades => &TRADE_RANKING,
        DataKind::OrderBook => &FeedOperation::ORDER_BOOK_RANKING,
    };
    ranking
        .iter()
        .copied()
        .find(|op| capabilities.supports(*op))
        .unwrap_or(FeedOperation::pull_for(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_book_prefers_multi_symbol_stream() {
        assert_eq!(
            select(DataKind::OrderBook, Capabilities::all()),
            FeedOperation::WatchOrderBookForSymbols
        );

        let single = Capabilities {
            watch_order_book: true,
            fetch_order_book: true,
            ..Capabilities::default()
        };
        assert_eq!(select(DataKind::OrderBook, single), FeedOperation::WatchOrderBook);
    }

    #[test]
    fn missing_push_support_selects_pull_operation() {
        let caps = Capabilities::pull_only();
        for kind in DataKind::ALL {
            let op = select(kind, caps);
            assert!(!op.is_push());
            assert_eq!(op, FeedOperation::pull_for(kind));
        }
    }

    #[test]
    fn nothing_declared_still_names_pull_operation() {
        assert_eq!(
            select(DataKind::Trades, Capabilities::default()),
            FeedOperation::FetchTrades
        );
    }
}
