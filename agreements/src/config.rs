//! Configuration for the agreements crate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Marketplace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Wallet-ledger configuration (shared database)
    pub ledger: wallet_ledger::Config,

    /// Platform fee, percent of the agreed amount
    pub platform_fee_percent: Decimal,

    /// Domain-event channel capacity
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger: wallet_ledger::Config::default(),
            platform_fee_percent: Decimal::new(10, 0),
            event_capacity: 256,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }
}
