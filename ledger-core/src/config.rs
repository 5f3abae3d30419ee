//! Configuration for the ledger

use serde::{Deserialize, Serialize};

use crate::accounts::StaticAccountNames;
use crate::types::BitcoinNetwork;
use crate::{Error, Result};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Bitcoin network the platform runs against
    pub network: BitcoinNetwork,

    /// Names of the static system accounts
    pub static_accounts: StaticAccountNames,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network: BitcoinNetwork::Regtest,
            static_accounts: StaticAccountNames::default(),
        }
    }
}

impl LedgerConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        let config: LedgerConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = LedgerConfig::default();

        if let Ok(network) = std::env::var("LEDGER_NETWORK") {
            config.network = match network.as_str() {
                "mainnet" => BitcoinNetwork::Mainnet,
                "testnet" => BitcoinNetwork::Testnet,
                "signet" => BitcoinNetwork::Signet,
                "regtest" => BitcoinNetwork::Regtest,
                other => {
                    return Err(Error::Config(format!("Unknown network: {}", other)));
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.network, BitcoinNetwork::Regtest);
        assert_eq!(config.static_accounts.bank_owner, "bank_owner");
    }

    #[test]
    fn parses_toml() {
        let raw = r#"
            network = "Mainnet"

            [static_accounts]
            bank_owner = "bank_owner"
            dealer_btc = "dealer_btc"
            dealer_usd = "dealer_usd"
            lnd = "lnd"
            on_chain = "bria"
            cold_storage = "cold_storage"
        "#;
        let config: LedgerConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.network, BitcoinNetwork::Mainnet);
        assert_eq!(config.static_accounts.on_chain, "bria");
    }
}
