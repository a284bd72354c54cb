//! Oracle configuration

use peerlend_core::units::BLOCKS_PER_DAY;
use serde::{Deserialize, Serialize};

/// Tunables for the price feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Maximum age (in blocks) of a price still considered fresh
    #[serde(default = "default_staleness_blocks")]
    pub staleness_blocks: u64,

    /// Maximum relative change accepted in a single update
    #[serde(default = "default_max_price_change_bps")]
    pub max_price_change_bps: u32,

    /// Number of per-block snapshots retained
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_staleness_blocks() -> u64 {
    BLOCKS_PER_DAY
}

fn default_max_price_change_bps() -> u32 {
    5_000 // 50%
}

fn default_history_capacity() -> usize {
    1_000
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            staleness_blocks: default_staleness_blocks(),
            max_price_change_bps: default_max_price_change_bps(),
            history_capacity: default_history_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OracleConfig::default();
        assert_eq!(config.staleness_blocks, 144);
        assert_eq!(config.max_price_change_bps, 5_000);
        assert_eq!(config.history_capacity, 1_000);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OracleConfig = serde_json::from_str(r#"{ "staleness_blocks": 1000 }"#).unwrap();
        assert_eq!(config.staleness_blocks, 1_000);
        assert_eq!(config.max_price_change_bps, 5_000);
    }
}
