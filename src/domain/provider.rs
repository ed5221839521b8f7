//! Connectivity providers: configured endpoints that can serve exchanges.

use serde::{Deserialize, Serialize};
use url::Url;

use super::id::{ExchangeId, ProviderId};

/// How a provider reaches the exchanges it serves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Client library running inside this process.
    #[default]
    Local,
    /// Remote server that proxies exchange access.
    Server,
    /// Anything else the surrounding application plugs in.
    Other,
}

/// Last reported connection state of a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Connected,
    #[default]
    Disconnected,
    Connecting,
    Error,
}

/// Which exchanges a provider declares support for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeScope {
    /// Wildcard: every exchange.
    All,
    /// Explicit, ordered list.
    Listed(Vec<ExchangeId>),
}

impl ExchangeScope {
    /// Build a scope from raw identifiers; a `"*"` entry makes it a wildcard.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut listed = Vec::new();
        for id in ids {
            let id = id.as_ref().trim();
            if id == "*" {
                return Self::All;
            }
            let id = ExchangeId::new(id);
            if !listed.contains(&id) {
                listed.push(id);
            }
        }
        Self::Listed(listed)
    }

    /// True when the exchange appears in the explicit list.
    #[must_use]
    pub fn lists(&self, exchange: &ExchangeId) -> bool {
        matches!(self, Self::Listed(ids) if ids.contains(exchange))
    }

    /// True when the scope covers the exchange, explicitly or by wildcard.
    #[must_use]
    pub fn covers(&self, exchange: &ExchangeId) -> bool {
        matches!(self, Self::All) || self.lists(exchange)
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::All)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Listed(ids) if ids.is_empty())
    }
}

/// Kind-specific connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConnection {
    /// Use the exchange's sandbox/testnet endpoints.
    pub sandbox: bool,
    /// Endpoint of a remote provider. Required for [`ProviderKind::Server`].
    pub server_url: Option<Url>,
    /// Name of the credential set the remote server should use.
    pub credentials_ref: Option<String>,
}

/// A configured connectivity endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub kind: ProviderKind,
    pub exchanges: ExchangeScope,
    /// Lower is preferred.
    pub priority: u32,
    pub enabled: bool,
    pub status: ProviderStatus,
    pub connection: ProviderConnection,
}

impl Provider {
    /// New enabled local provider with default connection settings.
    pub fn new(
        id: impl Into<ProviderId>,
        name: impl Into<String>,
        exchanges: ExchangeScope,
        priority: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ProviderKind::Local,
            exchanges,
            priority,
            enabled: true,
            status: ProviderStatus::Disconnected,
            connection: ProviderConnection::default(),
        }
    }

    /// True when enabled and covering the exchange.
    #[must_use]
    pub fn serves(&self, exchange: &ExchangeId) -> bool {
        self.enabled && self.exchanges.covers(exchange)
    }
}
