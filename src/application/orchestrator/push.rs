//! Push loop with fallback to polling.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::context::{FeedContext, Payload};
use super::pull;
use crate::domain::{ClientMode, FeedOperation};
use crate::error::{FeedError, Result};
use crate::port::ExchangeClient;

/// Await the next pushed payload.
///
/// `Ok(None)` means the payload was for another symbol on a multi-symbol
/// stream and should be skipped.
async fn watch(
    ctx: &FeedContext,
    client: &dyn ExchangeClient,
    operation: FeedOperation,
) -> Result<Option<Payload>> {
    let key = &ctx.key;
    match operation {
        FeedOperation::WatchOhlcv => {
            let Some(timeframe) = key.timeframe() else {
                return Err(FeedError::InvalidKey {
                    reason: format!("candle key '{key}' has no timeframe"),
                }
                .into());
            };
            let candles = client.watch_ohlcv(key.market(), key.symbol(), timeframe).await?;
            Ok(Some(Payload::Candles(candles)))
        }
        FeedOperation::WatchTrades => {
            let trades = client.watch_trades(key.market(), key.symbol()).await?;
            Ok(Some(Payload::Trades(trades)))
        }
        FeedOperation::WatchOrderBook => {
            let book = client.watch_order_book(key.market(), key.symbol()).await?;
            Ok(Some(Payload::OrderBook(book)))
        }
        FeedOperation::WatchOrderBookForSymbols => {
            let symbols = [key.symbol().to_string()];
            let book = client
                .watch_order_book_for_symbols(key.market(), &symbols)
                .await?;
            if book.symbol() == key.symbol() {
                Ok(Some(Payload::OrderBook(book)))
            } else {
                Ok(None)
            }
        }
        other => Err(FeedError::Unsupported {
            operation: other.as_str(),
        }
        .into()),
    }
}

/// Merge pushed payloads until cancelled.
///
/// A push error does not end the feed: the entry is flipped to polling with
/// the fallback flag set and this task carries on as a poll loop.
pub(super) async fn run(
    ctx: FeedContext,
    client: Arc<dyn ExchangeClient>,
    operation: FeedOperation,
    cancel: CancellationToken,
) {
    debug!(key = %ctx.encoded, operation = %operation, "Push loop started");
    let failure = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(key = %ctx.encoded, "Push loop stopped");
                return;
            }
            next = watch(&ctx, client.as_ref(), operation) => next,
        };
        match next {
            Ok(Some(payload)) => ctx.merge(payload),
            Ok(None) => {}
            Err(e) => break e,
        }
    };

    let pull_operation = FeedOperation::pull_for(ctx.key.kind());
    warn!(
        key = %ctx.encoded,
        operation = %operation,
        error = %failure,
        "Push feed failed, falling back to polling"
    );
    ctx.registry
        .fall_back(&ctx.encoded, ctx.generation, pull_operation);
    ctx.registry
        .note_error(&ctx.encoded, ctx.generation, &failure.to_string());

    let client = match ctx.client(ClientMode::Pull).await {
        Ok(client) => client,
        Err(e) => {
            error!(key = %ctx.encoded, error = %e, "No polling client after push failure");
            ctx.registry.fail(&ctx.encoded, ctx.generation, &e.to_string());
            return;
        }
    };
    if cancel.is_cancelled() {
        return;
    }
    pull::poll_once(&ctx, client.as_ref()).await;
    pull::run(ctx, client, cancel).await;
}
