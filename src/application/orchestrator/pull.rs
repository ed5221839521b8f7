//! Poll loop.

use std::sync::Arc;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::context::{FeedContext, Payload};
use crate::domain::DataKind;
use crate::error::{FeedError, Result};
use crate::port::ExchangeClient;

/// One request/response fetch for the context's key.
///
/// Trades are requested from the newest stored timestamp, inclusive, so
/// a later trade sharing that millisecond is still picked up. Records
/// already held come back again and are appended like any other.
pub(super) async fn fetch(ctx: &FeedContext, client: &dyn ExchangeClient) -> Result<Payload> {
    let key = &ctx.key;
    match key.kind() {
        DataKind::Candles => {
            let Some(timeframe) = key.timeframe() else {
                return Err(FeedError::InvalidKey {
                    reason: format!("candle key '{key}' has no timeframe"),
                }
                .into());
            };
            let candles = client
                .fetch_ohlcv(key.market(), key.symbol(), timeframe, Some(ctx.backfill_limit))
                .await?;
            Ok(Payload::Candles(candles))
        }
        DataKind::Trades => {
            let since = ctx.store.latest_trade_timestamp(key);
            let trades = client
                .fetch_trades(key.market(), key.symbol(), since, None)
                .await?;
            Ok(Payload::Trades(trades))
        }
        DataKind::OrderBook => {
            let book = client
                .fetch_order_book(key.market(), key.symbol(), Some(ctx.book_depth))
                .await?;
            Ok(Payload::OrderBook(book))
        }
    }
}

/// Fetch and merge once. Errors are logged and recorded, never returned.
pub(super) async fn poll_once(ctx: &FeedContext, client: &dyn ExchangeClient) -> bool {
    match fetch(ctx, client).await {
        Ok(payload) => {
            ctx.merge(payload);
            true
        }
        Err(e) => {
            warn!(key = %ctx.encoded, error = %e, "Poll failed");
            ctx.registry.note_error(&ctx.encoded, ctx.generation, &e.to_string());
            false
        }
    }
}

/// Re-fetch every `poll_interval` until cancelled.
///
/// The first tick fires one interval after the call; callers fetch once
/// themselves before entering the loop.
pub(super) async fn run(
    ctx: FeedContext,
    client: Arc<dyn ExchangeClient>,
    cancel: CancellationToken,
) {
    let period = ctx.poll_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(key = %ctx.encoded, interval_ms = period.as_millis() as u64, "Poll loop started");
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        poll_once(&ctx, client.as_ref()).await;
    }
    debug!(key = %ctx.encoded, "Poll loop stopped");
}
