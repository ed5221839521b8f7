//! Command-line interface definitions.
//!
//! The binary is an operator tool: it validates configuration and shows
//! which provider would serve each exchange. The feed itself is a library
//! embedded by the dashboard process.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Market data feed operator CLI
#[derive(Parser, Debug)]
#[command(name = "feedhub")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter implied by `-v` flags.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration file and summarise effective settings
    Check,

    /// Show the provider that would serve an exchange
    Resolve(ResolveArgs),

    /// Resolve several exchanges and report credential availability
    Mapping(MappingArgs),
}

/// Arguments for `feedhub resolve`.
#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Exchange identifier, e.g. `binance`
    pub exchange: String,
}

/// Arguments for `feedhub mapping`.
#[derive(clap::Args, Debug)]
pub struct MappingArgs {
    /// Exchange identifiers
    #[arg(required = true)]
    pub exchanges: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["feedhub", "resolve", "binance", "--json", "-c", "x.toml"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Commands::Resolve(ResolveArgs { ref exchange }) if exchange == "binance"));
    }

    #[test]
    fn mapping_requires_an_exchange() {
        assert!(Cli::try_parse_from(["feedhub", "mapping"]).is_err());
    }

    #[test]
    fn verbosity_maps_to_log_level() {
        let cli = Cli::try_parse_from(["feedhub", "-vv", "check"]).unwrap();
        assert_eq!(cli.log_level(), "debug");
        let cli = Cli::try_parse_from(["feedhub", "check"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
    }
}
