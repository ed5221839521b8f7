//! Operator-facing use cases consumed by the CLI adapter.
//!
//! Every call takes the raw config TOML so adapters never touch the
//! configuration layer directly.

use serde::Serialize;

use crate::domain::{ExchangeScope, Provider};
use crate::error::Result;

/// Provider projection for operator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub name: String,
    pub kind: String,
    /// Listed exchanges, or `["*"]` for a wildcard provider.
    pub exchanges: Vec<String>,
    pub priority: u32,
    pub enabled: bool,
    pub status: String,
}

impl From<&Provider> for ProviderSummary {
    fn from(provider: &Provider) -> Self {
        let exchanges = match &provider.exchanges {
            ExchangeScope::All => vec!["*".to_string()],
            ExchangeScope::Listed(ids) => ids.iter().map(ToString::to_string).collect(),
        };
        Self {
            id: provider.id.to_string(),
            name: provider.name.clone(),
            kind: format!("{:?}", provider.kind).to_lowercase(),
            exchanges,
            priority: provider.priority,
            enabled: provider.enabled,
            status: format!("{:?}", provider.status).to_lowercase(),
        }
    }
}

/// Summary output for `check`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigCheckReport {
    pub method: String,
    pub candle_poll_ms: u64,
    pub trade_poll_ms: u64,
    pub order_book_poll_ms: u64,
    pub client_ttl_secs: u64,
    pub log_level: String,
    pub providers: Vec<ProviderSummary>,
}

impl ConfigCheckReport {
    /// Enabled providers in the report.
    #[must_use]
    pub fn enabled_providers(&self) -> usize {
        self.providers.iter().filter(|p| p.enabled).count()
    }
}

/// One row of `mapping` output.
#[derive(Debug, Clone, Serialize)]
pub struct MappingEntry {
    pub exchange: String,
    /// `None` when no enabled provider serves the exchange.
    pub provider: Option<ProviderSummary>,
    pub credentials: bool,
}

/// Diagnostics use-cases for operator-facing adapters.
pub trait DiagnosticOperator: Send + Sync {
    /// Parse and validate the config, summarising its effective values.
    fn check_config(&self, config_toml: &str) -> Result<ConfigCheckReport>;

    /// Provider the registry would pick for `exchange`.
    fn resolve_provider(&self, config_toml: &str, exchange: &str)
        -> Result<Option<ProviderSummary>>;

    /// Resolve several exchanges at once, noting which have credentials.
    fn exchange_mapping(&self, config_toml: &str, exchanges: &[String])
        -> Result<Vec<MappingEntry>>;
}
