//! Config loading from disk and runtime assembly.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use feedhub::domain::{ExchangeId, ProviderKind, TransportMethod};
use feedhub::error::{ConfigError, Error};
use feedhub::infrastructure::bootstrap;
use feedhub::infrastructure::config::settings::Config;
use feedhub::testkit::client::ScriptedFactory;
use feedhub::testkit::domain::{subscriber, trade_key};

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

const FULL: &str = r#"
[logging]
level = "warn"

[feed]
method = "pull"
trade_poll_ms = 250
order_book_depth = 20

[pool]
ttl_secs = 600
sweep_interval_secs = 60

[[providers]]
id = "relay"
name = "Relay server"
kind = "server"
exchanges = ["*"]
priority = 10
server_url = "https://relay.example.com"
credentials_ref = "desk-a"

[[providers]]
id = "direct"
exchanges = ["binance", "okx"]
priority = 50
status = "connected"
"#;

#[test]
fn loads_a_full_config_from_disk() {
    let file = write_temp_config(FULL);
    let config = Config::load(file.path()).unwrap();

    let settings = config.feed.settings();
    assert_eq!(settings.method, TransportMethod::Pull);
    assert_eq!(settings.poll_intervals.trades, Duration::from_millis(250));
    assert_eq!(settings.poll_intervals.candles, Duration::from_millis(5_000));
    assert_eq!(settings.order_book_depth, 20);
    assert_eq!(config.pool.ttl(), Duration::from_secs(600));

    let providers = config.providers().unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].kind, ProviderKind::Server);
    assert_eq!(
        providers[0].connection.server_url.as_ref().map(|u| u.host_str()),
        Some(Some("relay.example.com"))
    );
    assert!(providers[1].exchanges.lists(&ExchangeId::new("okx")));
}

#[test]
fn missing_file_is_a_read_error() {
    let result = Config::load("/nonexistent/feedhub.toml");
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn server_provider_requires_url() {
    let file = write_temp_config(
        r#"
[[providers]]
id = "relay"
kind = "server"
exchanges = ["*"]
"#,
    );
    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::MissingField {
            field: "providers.server_url",
        })) => {}
        other => panic!("expected missing server_url, got {other:?}"),
    }
}

#[test]
fn bad_values_are_rejected() {
    for toml in [
        "[feed]\ntrade_poll_ms = 0\n",
        "[logging]\nlevel = \"[[[\"\n",
        "[[providers]]\nid = \"x\"\nexchanges = []\n",
        "[[providers]]\nid = \"x\"\nexchanges = [\"*\"]\nserver_url = \"not a url\"\n",
        "not toml at all = = =",
    ] {
        let file = write_temp_config(toml);
        assert!(Config::load(file.path()).is_err(), "accepted: {toml}");
    }
}

#[tokio::test(start_paused = true)]
async fn runtime_assembles_and_shuts_down() {
    let file = write_temp_config(FULL);
    let config = Config::load(file.path()).unwrap();
    let factory = Arc::new(ScriptedFactory::new());

    let mut runtime = bootstrap::build(&config, factory.clone()).unwrap();
    assert!(!runtime.is_running());
    runtime.start();
    runtime.start();
    assert!(runtime.is_running());

    let key = trade_key("binance", "BTC/USDT");
    runtime.feed().subscribe(&subscriber("tape"), &key).await.unwrap();
    let entry = runtime.feed().subscription(&key).unwrap();
    assert_eq!(entry.method, TransportMethod::Pull);
    assert_eq!(
        runtime
            .feed()
            .resolve_provider(&ExchangeId::new("binance"))
            .unwrap()
            .id
            .as_str(),
        "direct"
    );
    assert_eq!(runtime.pool_stats().cached, 1);

    let client = factory.last_client().unwrap();
    runtime.shutdown().await;
    assert_eq!(client.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweeper_evicts_idle_clients() {
    let file = write_temp_config(FULL);
    let config = Config::load(file.path()).unwrap();
    let mut runtime = bootstrap::build(&config, Arc::new(ScriptedFactory::new())).unwrap();
    runtime.start();

    let key = trade_key("okx", "BTC/USDT");
    let who = subscriber("tape");
    runtime.feed().subscribe(&who, &key).await.unwrap();
    runtime.feed().unsubscribe(&who, &key).await;
    assert_eq!(runtime.pool_stats().cached, 1);

    tokio::time::sleep(Duration::from_secs(661)).await;
    assert_eq!(runtime.pool_stats().cached, 0);
    assert_eq!(runtime.pool_stats().evictions, 1);
    runtime.shutdown().await;
}
