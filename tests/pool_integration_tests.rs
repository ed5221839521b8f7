//! Integration tests for the client pool behind a running feed:
//! sliding TTL, sweeping, and invalidation on provider changes.

mod support;

use std::sync::Arc;
use std::time::Duration;

use feedhub::domain::{ExchangeId, ProviderId, ProviderStatus, TransportMethod};
use feedhub::error::{Error, FeedError};
use feedhub::testkit::client::ScriptedFactory;
use feedhub::testkit::config::{feed, feed_with, settings};
use feedhub::testkit::domain::{candle_key, provider, subscriber, trade_key};

const TTL: Duration = Duration::from_secs(30 * 60);

#[tokio::test(start_paused = true)]
async fn idle_clients_outlive_their_subscriptions_until_ttl() {
    let harness = feed(Arc::new(ScriptedFactory::new()));
    let key = trade_key("binance", "BTC/USDT");
    let who = subscriber("tape");

    harness.feed.subscribe(&who, &key).await.unwrap();
    harness.feed.unsubscribe(&who, &key).await;
    assert_eq!(harness.pool.stats().cached, 1);

    tokio::time::advance(TTL - Duration::from_secs(60)).await;
    harness.feed.subscribe(&who, &key).await.unwrap();
    harness.feed.unsubscribe(&who, &key).await;
    assert_eq!(harness.factory.create_count(), 1, "reused within the TTL");

    // The reuse slid the expiry forward.
    tokio::time::advance(TTL - Duration::from_secs(60)).await;
    assert_eq!(harness.pool.sweep(), 0);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(harness.pool.sweep(), 1);
    assert_eq!(harness.pool.stats().cached, 0);

    harness.feed.subscribe(&who, &key).await.unwrap();
    assert_eq!(harness.factory.create_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn running_feed_keeps_its_client_after_eviction() {
    let harness = feed(Arc::new(ScriptedFactory::new()));
    let key = trade_key("binance", "BTC/USDT");
    harness.feed.subscribe(&subscriber("tape"), &key).await.unwrap();

    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    assert_eq!(harness.pool.sweep(), 1);

    let entry = harness.feed.subscription(&key).unwrap();
    assert!(entry.is_active);
    assert_eq!(harness.factory.last_client().unwrap().close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn adding_a_listed_provider_reroutes_new_feeds() {
    let harness = feed(Arc::new(ScriptedFactory::new()));
    let binance = ExchangeId::new("binance");
    harness
        .feed
        .subscribe(&subscriber("a"), &candle_key("binance", "BTC/USDT"))
        .await
        .unwrap();
    harness
        .feed
        .subscribe(&subscriber("a"), &candle_key("okx", "BTC/USDT"))
        .await
        .unwrap();
    assert_eq!(harness.pool.stats().cached, 2);

    // Explicit listing beats the wildcard even at a worse priority.
    harness
        .feed
        .add_provider(provider("direct", &["binance"], 500))
        .unwrap();
    assert_eq!(
        harness.feed.resolve_provider(&binance).unwrap().id,
        ProviderId::new("direct")
    );
    assert_eq!(harness.pool.stats().cached, 1, "only binance clients dropped");

    harness
        .feed
        .subscribe(&subscriber("b"), &candle_key("binance", "ETH/USDT"))
        .await
        .unwrap();
    assert_eq!(harness.factory.create_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn removing_the_only_provider_fails_new_subscriptions() {
    let harness = feed(Arc::new(ScriptedFactory::new()));
    harness
        .feed
        .subscribe(&subscriber("a"), &trade_key("binance", "BTC/USDT"))
        .await
        .unwrap();

    let removed = harness.feed.remove_provider(&ProviderId::new("default")).unwrap();
    assert_eq!(removed.id, ProviderId::new("default"));
    assert_eq!(harness.pool.stats().cached, 0);

    let result = harness
        .feed
        .subscribe(&subscriber("a"), &trade_key("binance", "ETH/USDT"))
        .await;
    assert!(matches!(result, Err(Error::Feed(FeedError::NoProvider { .. }))));
    assert!(harness.feed.remove_provider(&ProviderId::new("default")).is_err());
}

#[tokio::test(start_paused = true)]
async fn status_and_enablement_changes() {
    let harness = feed_with(
        settings(TransportMethod::Push),
        vec![
            provider("primary", &["binance"], 10),
            provider("backup", &["binance"], 10),
        ],
        Arc::new(ScriptedFactory::new()),
    );
    let binance = ExchangeId::new("binance");
    harness
        .feed
        .subscribe(&subscriber("a"), &trade_key("binance", "BTC/USDT"))
        .await
        .unwrap();
    assert_eq!(harness.feed.resolve_provider(&binance).unwrap().id, ProviderId::new("primary"));

    // Status only breaks the tie; cached clients stay.
    harness
        .feed
        .set_provider_status(&ProviderId::new("backup"), ProviderStatus::Connected)
        .unwrap();
    assert_eq!(harness.feed.resolve_provider(&binance).unwrap().id, ProviderId::new("backup"));
    assert_eq!(harness.pool.stats().cached, 1);

    harness
        .feed
        .set_provider_enabled(&ProviderId::new("backup"), false)
        .unwrap();
    assert_eq!(harness.feed.resolve_provider(&binance).unwrap().id, ProviderId::new("primary"));
    assert_eq!(harness.pool.stats().cached, 0);
}
