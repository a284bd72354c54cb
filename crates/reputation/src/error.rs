//! Reputation errors

use peerlend_core::Address;
use thiserror::Error;

use crate::score::Tier;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReputationError {
    #[error("Unauthorized reputation write by {0}")]
    Unauthorized(Address),

    #[error("Reputation record already exists for {0}")]
    AlreadyMinted(Address),

    #[error("No reputation record for {0}")]
    NotFound(Address),

    #[error("Score out of range: {0}")]
    ScoreOutOfRange(u32),

    #[error("Score {score} does not belong to tier {tier}")]
    InconsistentTier { score: u32, tier: Tier },
}
