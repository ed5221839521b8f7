//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//!
//! # Example
//!
//! ```no_run
//! use feedhub::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("feedhub.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::feed::FeedConfig;
use super::logging::LoggingConfig;
use super::pool::PoolConfig;
use super::provider::ProviderConfig;
use crate::domain::Provider;
use crate::error::{ConfigError, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Config {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.feed.validate()?;
        self.pool.validate()?;

        let mut seen = HashSet::new();
        for provider in &self.providers {
            provider.to_provider()?;
            if !seen.insert(provider.id.trim()) {
                return Err(ConfigError::DuplicateProvider {
                    id: provider.id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Domain providers in file order.
    ///
    /// # Errors
    ///
    /// Only fails for configs built without [`Config::parse_toml`].
    pub fn providers(&self) -> Result<Vec<Provider>> {
        self.providers.iter().map(ProviderConfig::to_provider).collect()
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
