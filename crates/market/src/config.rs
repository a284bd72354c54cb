//! Marketplace configuration with configurable thresholds
//!
//! Loaded from a JSON file (missing fields fall back to defaults) and then
//! overridden by `PEERLEND_*` environment variables.

use peerlend_core::units::MIN_COLLATERAL_RATIO_BPS;
use peerlend_oracle::OracleConfig;
use peerlend_risk::LiquidationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Configuration for the Marketplace Ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub liquidation: LiquidationConfig,

    /// Offers and requests older than this cannot be matched
    #[serde(default = "default_max_record_age_blocks")]
    pub max_record_age_blocks: u64,

    /// Max drift between a record's price snapshot and the match-time price
    #[serde(default = "default_max_price_deviation_bps")]
    pub max_price_deviation_bps: u32,

    /// Blocks after the end block before a lender may declare default
    #[serde(default = "default_grace_blocks")]
    pub default_grace_blocks: u64,
}

fn default_max_record_age_blocks() -> u64 {
    1_008 // 7 days
}

fn default_max_price_deviation_bps() -> u32 {
    1_000 // 10%
}

fn default_grace_blocks() -> u64 {
    1_008
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            liquidation: LiquidationConfig::default(),
            max_record_age_blocks: default_max_record_age_blocks(),
            max_price_deviation_bps: default_max_price_deviation_bps(),
            default_grace_blocks: default_grace_blocks(),
        }
    }
}

impl MarketConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PEERLEND_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: String) -> Result<T, ConfigError> {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            })
        }

        macro_rules! override_field {
            ($key:literal, $field:expr) => {
                if let Some(raw) = lookup($key) {
                    $field = parse($key, raw)?;
                }
            };
        }

        override_field!("PEERLEND_STALENESS_BLOCKS", self.oracle.staleness_blocks);
        override_field!("PEERLEND_MAX_PRICE_CHANGE_BPS", self.oracle.max_price_change_bps);
        override_field!("PEERLEND_PRICE_HISTORY_CAPACITY", self.oracle.history_capacity);
        override_field!("PEERLEND_LIQUIDATION_THRESHOLD_PCT", self.liquidation.threshold_pct);
        override_field!("PEERLEND_LIQUIDATION_BONUS_BPS", self.liquidation.bonus_bps);
        override_field!("PEERLEND_MAX_RECORD_AGE_BLOCKS", self.max_record_age_blocks);
        override_field!("PEERLEND_MAX_PRICE_DEVIATION_BPS", self.max_price_deviation_bps);
        override_field!("PEERLEND_DEFAULT_GRACE_BLOCKS", self.default_grace_blocks);

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.staleness_blocks == 0 {
            return Err(ConfigError::Invalid("staleness_blocks must be positive"));
        }
        if self.oracle.max_price_change_bps == 0 || self.oracle.max_price_change_bps > 10_000 {
            return Err(ConfigError::Invalid("max_price_change_bps must be in 1..=10000"));
        }
        if self.oracle.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be positive"));
        }
        // Loans open above the threshold, and no offer may ask for less than 100%
        let threshold_bps = self.liquidation.threshold_pct as u128 * 100;
        if threshold_bps < MIN_COLLATERAL_RATIO_BPS as u128 || threshold_bps > u32::MAX as u128 {
            return Err(ConfigError::Invalid("threshold_pct must be at least 100"));
        }
        if self.liquidation.bonus_bps >= 10_000 {
            return Err(ConfigError::Invalid("bonus_bps must be below 10000"));
        }
        if self.max_price_deviation_bps > 10_000 {
            return Err(ConfigError::Invalid("max_price_deviation_bps must be at most 10000"));
        }
        Ok(())
    }
}
