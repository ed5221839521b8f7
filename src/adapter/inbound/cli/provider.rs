//! `feedhub resolve` and `feedhub mapping`.

use std::path::Path;

use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::error::{ConfigError, FeedError, Result};
use crate::port::inbound::operator::{DiagnosticOperator, MappingEntry, ProviderSummary};

#[derive(Tabled)]
struct MappingRow {
    #[tabled(rename = "Exchange")]
    exchange: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Credentials")]
    credentials: &'static str,
}

impl From<&MappingEntry> for MappingRow {
    fn from(entry: &MappingEntry) -> Self {
        let credentials = if entry.credentials { "yes" } else { "no" };
        match &entry.provider {
            Some(provider) => Self {
                exchange: entry.exchange.clone(),
                provider: provider.id.clone(),
                priority: provider.priority.to_string(),
                status: provider.status.clone(),
                credentials,
            },
            None => Self {
                exchange: entry.exchange.clone(),
                provider: "-".to_string(),
                priority: "-".to_string(),
                status: "-".to_string(),
                credentials,
            },
        }
    }
}

fn read(config_path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(config_path).map_err(ConfigError::ReadFile)?)
}

fn describe(provider: &ProviderSummary) -> String {
    format!(
        "{} ({}, priority {}, {})",
        provider.id, provider.kind, provider.priority, provider.status
    )
}

/// Print the provider chosen for `exchange`.
///
/// # Errors
///
/// [`FeedError::NoProvider`] when nothing serves the exchange.
pub fn execute_resolve(
    operator: &dyn DiagnosticOperator,
    config_path: &Path,
    exchange: &str,
) -> Result<()> {
    let config_toml = read(config_path)?;
    let Some(provider) = operator.resolve_provider(&config_toml, exchange)? else {
        return Err(FeedError::NoProvider {
            exchange: exchange.trim().to_ascii_lowercase(),
        }
        .into());
    };

    output::data("provider", &provider);
    output::field("Exchange", exchange);
    output::field("Provider", describe(&provider));
    Ok(())
}

/// Print one mapping row per exchange.
///
/// Unresolved exchanges are reported, not treated as errors.
pub fn execute_mapping(
    operator: &dyn DiagnosticOperator,
    config_path: &Path,
    exchanges: &[String],
) -> Result<()> {
    let config_toml = read(config_path)?;
    let rows = operator.exchange_mapping(&config_toml, exchanges)?;

    output::data("mapping", &rows);
    output::section("Exchange Mapping");
    let table = rows.iter().map(MappingRow::from);
    output::lines(&Table::new(table).to_string());
    for row in rows.iter().filter(|row| row.provider.is_none()) {
        output::warning(&format!("{}: no provider", row.exchange));
    }
    Ok(())
}
