//! Operator implementation backing the CLI.

use crate::application::provider::ProviderRegistry;
use crate::domain::ExchangeId;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::inbound::operator::{
    ConfigCheckReport, DiagnosticOperator, MappingEntry, ProviderSummary,
};
use crate::port::{CredentialStore, StaticCredentials};

/// Stateless operator: every call re-parses the config it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct Operator;

fn registry(config_toml: &str) -> Result<ProviderRegistry> {
    let config = Config::parse_toml(config_toml)?;
    ProviderRegistry::with_providers(config.providers()?)
}

impl DiagnosticOperator for Operator {
    fn check_config(&self, config_toml: &str) -> Result<ConfigCheckReport> {
        let config = Config::parse_toml(config_toml)?;
        let providers = config.providers()?;

        Ok(ConfigCheckReport {
            method: config.feed.method.to_string(),
            candle_poll_ms: config.feed.candle_poll_ms,
            trade_poll_ms: config.feed.trade_poll_ms,
            order_book_poll_ms: config.feed.order_book_poll_ms,
            client_ttl_secs: config.pool.ttl_secs,
            log_level: config.logging.level.clone(),
            providers: providers.iter().map(ProviderSummary::from).collect(),
        })
    }

    fn resolve_provider(
        &self,
        config_toml: &str,
        exchange: &str,
    ) -> Result<Option<ProviderSummary>> {
        let registry = registry(config_toml)?;
        Ok(registry
            .resolve(&ExchangeId::new(exchange))
            .as_ref()
            .map(ProviderSummary::from))
    }

    fn exchange_mapping(
        &self,
        config_toml: &str,
        exchanges: &[String],
    ) -> Result<Vec<MappingEntry>> {
        let registry = registry(config_toml)?;
        let ids: Vec<ExchangeId> = exchanges.iter().map(ExchangeId::new).collect();
        let credentials = StaticCredentials::from_env(&ids);

        let mapped = registry.create_mapping(&ids, &credentials);
        Ok(ids
            .iter()
            .map(|exchange| {
                let provider = mapped
                    .iter()
                    .find(|m| &m.exchange == exchange)
                    .map(|m| ProviderSummary::from(&m.provider));
                MappingEntry {
                    exchange: exchange.to_string(),
                    provider,
                    credentials: credentials.credentials_for(exchange).is_some(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[[providers]]
id = "relay"
exchanges = ["*"]
priority = 1

[[providers]]
id = "direct"
exchanges = ["binance"]
priority = 50
"#;

    #[test]
    fn explicit_listing_wins_resolution() {
        let chosen = Operator.resolve_provider(CONFIG, "Binance").unwrap().unwrap();
        assert_eq!(chosen.id, "direct");
        let chosen = Operator.resolve_provider(CONFIG, "kraken").unwrap().unwrap();
        assert_eq!(chosen.id, "relay");
        assert_eq!(chosen.exchanges, vec!["*"]);
    }

    #[test]
    fn mapping_keeps_unresolved_exchanges() {
        let config = r#"
[[providers]]
id = "direct"
exchanges = ["binance"]
"#;
        let rows = Operator
            .exchange_mapping(config, &["binance".to_string(), "okx".to_string()])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].provider.as_ref().unwrap().id, "direct");
        assert!(rows[1].provider.is_none());
    }

    #[test]
    fn check_reports_effective_values() {
        let report = Operator.check_config(CONFIG).unwrap();
        assert_eq!(report.method, "push");
        assert_eq!(report.candle_poll_ms, 5_000);
        assert_eq!(report.enabled_providers(), 2);
    }

    #[test]
    fn invalid_config_is_an_error() {
        assert!(Operator.check_config("[feed]\ncandle_poll_ms = 0\n").is_err());
    }
}
