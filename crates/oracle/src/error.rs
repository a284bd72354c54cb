//! Oracle error types

use peerlend_core::{Address, BlockNumber};
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Caller is not the oracle admin
    #[error("Unauthorized oracle update by {caller}")]
    Unauthorized { caller: Address },

    /// Price is zero or above the accepted maximum
    #[error("Invalid price: {0}")]
    InvalidPrice(u128),

    /// Relative change from the current price exceeds the bound
    #[error("Price change too large: {current} -> {proposed} ({change_bps} bps, max {max_bps} bps)")]
    PriceChangeTooLarge {
        current: u128,
        proposed: u128,
        change_bps: u128,
        max_bps: u32,
    },

    /// Update stamped with a block older than the last update
    #[error("Block {now} precedes last update at block {last_update}")]
    BlockRegression {
        last_update: BlockNumber,
        now: BlockNumber,
    },

    /// Oracle has never been written
    #[error("Oracle price unavailable: never updated")]
    Unavailable,

    /// Price data is older than the freshness window
    #[error("Stale price: last update at block {last_update}, now {now}, window {window} blocks")]
    StalePrice {
        last_update: BlockNumber,
        now: BlockNumber,
        window: u64,
    },

    /// Input exceeds the asset's realistic supply
    #[error("Amount exceeds supply bound: {0}")]
    AmountTooLarge(u128),

    #[error("Arithmetic overflow in valuation")]
    Overflow,
}
