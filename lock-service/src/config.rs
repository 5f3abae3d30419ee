//! Configuration for the lock service

use serde::{Deserialize, Serialize};
use std::time::Duration;

use ledger_core::BitcoinNetwork;

use crate::{Error, Result};

/// Lock service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockServiceConfig {
    /// Initial lease duration (milliseconds); extended automatically
    pub ttl_ms: u64,

    /// Max acquisition retries before giving up
    pub retry_count: u32,

    /// Base delay between acquisition attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Max random delay added to each retry (milliseconds)
    pub retry_jitter_ms: u64,

    /// Remaining lease time below which an extension is attempted
    /// (milliseconds)
    pub extension_threshold_ms: u64,
}

impl Default for LockServiceConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 180_000,
            retry_count: 3,
            retry_delay_ms: 400,
            retry_jitter_ms: 200,
            extension_threshold_ms: 2_500,
        }
    }
}

impl LockServiceConfig {
    /// Defaults for a network: short leases on regtest, long elsewhere
    pub fn for_network(network: BitcoinNetwork) -> Self {
        let ttl_ms = match network {
            BitcoinNetwork::Regtest => 10_000,
            _ => 180_000,
        };
        Self {
            ttl_ms,
            ..Self::default()
        }
    }

    /// Lease duration
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Base retry delay
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Extension threshold
    pub fn extension_threshold(&self) -> Duration {
        Duration::from_millis(self.extension_threshold_ms)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(ttl) = std::env::var("LOCK_TTL_MS") {
            config.ttl_ms = ttl
                .parse()
                .map_err(|e| Error::Config(format!("Invalid LOCK_TTL_MS: {}", e)))?;
        }
        if let Ok(count) = std::env::var("LOCK_RETRY_COUNT") {
            config.retry_count = count
                .parse()
                .map_err(|e| Error::Config(format!("Invalid LOCK_RETRY_COUNT: {}", e)))?;
        }

        Ok(config)
    }
}
