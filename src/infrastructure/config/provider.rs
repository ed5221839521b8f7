//! `[[providers]]` tables: seed entries for the provider registry.

use serde::Deserialize;
use url::Url;

use crate::domain::{
    ExchangeScope, Provider, ProviderConnection, ProviderId, ProviderKind, ProviderStatus,
};
use crate::error::{ConfigError, Result};

/// One provider as written in the config file.
///
/// ```toml
/// [[providers]]
/// id = "relay"
/// kind = "server"
/// exchanges = ["*"]
/// priority = 10
/// server_url = "https://relay.example.com"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: ProviderKind,
    /// Exchange ids, or `"*"` for every exchange.
    #[serde(default)]
    pub exchanges: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub status: ProviderStatus,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub credentials_ref: Option<String>,
}

const fn default_priority() -> u32 {
    100
}

const fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    /// Convert into a domain provider, parsing the server URL.
    ///
    /// # Errors
    ///
    /// Fails on an empty id, an empty exchange list, an unparseable URL or
    /// a server provider without URL.
    pub fn to_provider(&self) -> Result<Provider> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "providers.id",
            }
            .into());
        }
        if self.exchanges.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "providers.exchanges",
                reason: format!("provider '{}' lists no exchanges", self.id),
            }
            .into());
        }
        let server_url = self
            .server_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                field: "providers.server_url",
                reason: format!("provider '{}': {e}", self.id),
            })?;
        if self.kind == ProviderKind::Server && server_url.is_none() {
            return Err(ConfigError::MissingField {
                field: "providers.server_url",
            }
            .into());
        }

        Ok(Provider {
            id: ProviderId::new(self.id.trim()),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            kind: self.kind,
            exchanges: ExchangeScope::from_ids(&self.exchanges),
            priority: self.priority,
            enabled: self.enabled,
            status: self.status,
            connection: ProviderConnection {
                sandbox: self.sandbox,
                server_url,
                credentials_ref: self.credentials_ref.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExchangeId;

    fn parse(toml: &str) -> ProviderConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn wildcard_and_defaults() {
        let provider = parse(r#"
            id = "all"
            exchanges = ["*"]
        "#)
        .to_provider()
        .unwrap();
        assert!(provider.exchanges.is_wildcard());
        assert_eq!(provider.priority, 100);
        assert!(provider.enabled);
        assert_eq!(provider.name, "all");
    }

    #[test]
    fn server_provider_parses_url() {
        let provider = parse(r#"
            id = "relay"
            kind = "server"
            exchanges = ["Binance", "okx"]
            server_url = "https://relay.example.com/api"
        "#)
        .to_provider()
        .unwrap();
        assert!(provider.exchanges.lists(&ExchangeId::new("binance")));
        assert_eq!(
            provider.connection.server_url.unwrap().host_str(),
            Some("relay.example.com")
        );
    }

    #[test]
    fn bad_url_is_invalid_value() {
        let err = parse(r#"
            id = "relay"
            exchanges = ["binance"]
            server_url = "not a url"
        "#)
        .to_provider()
        .unwrap_err();
        assert!(err.to_string().contains("server_url"));
    }

    #[test]
    fn server_without_url_is_missing_field() {
        let err = parse(r#"
            id = "relay"
            kind = "server"
            exchanges = ["binance"]
        "#)
        .to_provider()
        .unwrap_err();
        assert!(err.to_string().contains("server_url"));
    }
}
