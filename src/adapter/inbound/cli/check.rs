//! `feedhub check`: configuration validation.

use std::path::Path;

use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::error::{ConfigError, Result};
use crate::port::inbound::operator::{DiagnosticOperator, ProviderSummary};

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Priority")]
    priority: u32,
    #[tabled(rename = "Exchanges")]
    exchanges: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

impl From<&ProviderSummary> for ProviderRow {
    fn from(provider: &ProviderSummary) -> Self {
        Self {
            id: provider.id.clone(),
            kind: provider.kind.clone(),
            priority: provider.priority,
            exchanges: provider.exchanges.join(", "),
            state: if provider.enabled { "enabled" } else { "disabled" },
        }
    }
}

/// Validate the config file and print its effective settings.
pub fn execute(operator: &dyn DiagnosticOperator, config_path: &Path) -> Result<()> {
    let config_toml = std::fs::read_to_string(config_path).map_err(ConfigError::ReadFile)?;
    let report = operator.check_config(&config_toml)?;

    output::section("Configuration Check");
    output::field("Config", config_path.display());
    output::success("Configuration file is valid");

    output::section("Feed");
    output::field("Method", &report.method);
    output::field("Candle poll", format!("{}ms", report.candle_poll_ms));
    output::field("Trade poll", format!("{}ms", report.trade_poll_ms));
    output::field("Book poll", format!("{}ms", report.order_book_poll_ms));
    output::field("Client TTL", format!("{}s", report.client_ttl_secs));
    output::field("Log level", &report.log_level);

    output::section("Providers");
    let rows = report.providers.iter().map(ProviderRow::from);
    output::lines(&Table::new(rows).to_string());
    output::data("report", &report);

    if report.enabled_providers() == 0 {
        output::warning("No enabled providers: every subscription will fail to start");
    } else {
        output::success("Configuration check complete");
    }
    Ok(())
}
