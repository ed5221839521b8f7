//! `[pool]` section: client cache expiry.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Client pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Idle time after which a cached client expires (seconds).
    /// Measured from last use, not creation.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// How often the background sweep looks for expired clients (seconds).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

const fn default_ttl_secs() -> u64 {
    1_800 // 30 minutes
}

const fn default_sweep_interval_secs() -> u64 {
    300 // 5 minutes
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool.ttl_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool.sweep_interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
