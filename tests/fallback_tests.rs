//! Push-to-pull fallback is invisible to subscribers: data keeps flowing
//! and only the diagnostic flags change.

mod support;

use std::sync::Arc;
use std::time::Duration;

use feedhub::domain::{DataKind, FeedOperation, TransportMethod};
use feedhub::port::Capabilities;
use feedhub::testkit::client::{ScriptedClient, ScriptedFactory};
use feedhub::testkit::config::feed;
use feedhub::testkit::domain::{book, book_key, candle_key, candles, subscriber, trade, trade_key};

use support::settle;

fn serving(client: &Arc<ScriptedClient>) -> Arc<ScriptedFactory> {
    let factory = Arc::new(ScriptedFactory::new());
    factory.serve("binance", Arc::clone(client));
    factory
}

#[tokio::test(start_paused = true)]
async fn push_without_support_polls_instead() {
    let client = Arc::new(
        ScriptedClient::new("binance")
            .with_capabilities(Capabilities::pull_only())
            .with_candles(candles(0, 4)),
    );
    let harness = feed(serving(&client));
    let key = candle_key("binance", "BTC/USDT");

    harness.feed.subscribe(&subscriber("chart"), &key).await.unwrap();

    let entry = harness.feed.subscription(&key).unwrap();
    assert_eq!(entry.method, TransportMethod::Pull);
    assert_eq!(entry.preferred_method, TransportMethod::Push);
    assert!(entry.is_fallback);
    assert!(entry.is_active);
    assert_eq!(entry.operation, Some(FeedOperation::FetchOhlcv));
    assert_eq!(harness.feed.candles("binance", "BTC/USDT", None, None).len(), 4);
    assert_eq!(client.watch_count(), 0);

    let before = client.fetch_count();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(client.fetch_count() > before, "fallback feed keeps polling");
}

#[tokio::test(start_paused = true)]
async fn single_symbol_book_stream_is_used_when_multi_is_missing() {
    let client = Arc::new(ScriptedClient::new("binance").with_capabilities(Capabilities {
        watch_order_book: true,
        ..Capabilities::pull_only()
    }));
    let harness = feed(serving(&client));
    let key = book_key("binance", "BTC/USDT");

    harness.feed.subscribe(&subscriber("depth"), &key).await.unwrap();
    let entry = harness.feed.subscription(&key).unwrap();
    assert_eq!(entry.operation, Some(FeedOperation::WatchOrderBook));
    assert!(!entry.is_fallback);

    client.push_order_book(book("BTC/USDT", 100, 1));
    settle().await;
    assert!(harness.feed.order_book("binance", "BTC/USDT", None).is_some());
}

#[tokio::test(start_paused = true)]
async fn push_error_switches_the_running_feed_to_polling() {
    let client = Arc::new(ScriptedClient::new("binance"));
    let harness = feed(serving(&client));
    let key = trade_key("binance", "BTC/USDT");

    harness.feed.subscribe(&subscriber("tape"), &key).await.unwrap();
    client.push_trades(vec![trade(1_000, 1)]);
    settle().await;
    assert_eq!(harness.feed.trades("binance", "BTC/USDT", None).len(), 1);

    client.set_trades(vec![trade(1_000, 1), trade(2_000, 2)]);
    client.push_error(DataKind::Trades, "socket closed");
    settle().await;

    let entry = harness.feed.subscription(&key).unwrap();
    assert_eq!(entry.method, TransportMethod::Pull);
    assert!(entry.is_fallback);
    assert!(entry.is_active, "fallback is not a failure");
    assert_eq!(entry.operation, Some(FeedOperation::FetchTrades));
    assert!(entry.last_error.unwrap().contains("socket closed"));

    // The immediate poll resumed from the pushed trade.
    assert_eq!(client.last_trade_since(), Some(1_000));
    let trades = harness.feed.trades("binance", "BTC/USDT", None);
    assert_eq!(trades.last().unwrap().timestamp, 2_000);

    // Still one subscriber, still one entry.
    assert_eq!(harness.feed.active_subscriptions().len(), 1);
    assert_eq!(entry.subscriber_count, 1);
}

#[tokio::test(start_paused = true)]
async fn fallback_feeds_follow_poll_interval_changes() {
    let client = Arc::new(
        ScriptedClient::new("binance")
            .with_capabilities(Capabilities::pull_only())
            .with_candles(candles(0, 1)),
    );
    let harness = feed(serving(&client));
    let key = candle_key("binance", "BTC/USDT");
    harness.feed.subscribe(&subscriber("chart"), &key).await.unwrap();

    harness
        .feed
        .set_poll_interval(DataKind::Candles, Duration::from_secs(30))
        .await
        .unwrap();

    let entry = harness.feed.subscription(&key).unwrap();
    assert!(entry.is_fallback, "restart keeps the fallback flag");
    assert_eq!(entry.method, TransportMethod::Pull);
}

#[tokio::test(start_paused = true)]
async fn switching_back_to_push_retries_the_stream() {
    let client = Arc::new(ScriptedClient::new("binance"));
    let harness = feed(serving(&client));
    let key = trade_key("binance", "BTC/USDT");
    harness.feed.subscribe(&subscriber("tape"), &key).await.unwrap();

    client.push_error(DataKind::Trades, "socket closed");
    settle().await;
    assert!(harness.feed.subscription(&key).unwrap().is_fallback);

    harness.feed.set_method(TransportMethod::Push).await;
    let entry = harness.feed.subscription(&key).unwrap();
    assert_eq!(entry.method, TransportMethod::Push);
    assert!(!entry.is_fallback);
    assert_eq!(entry.operation, Some(FeedOperation::WatchTrades));
}
