//! PeerLend Reputation Engine
//!
//! Scores borrowers from their loan-history counters and keeps one
//! non-transferable reputation record per address. The registry exposes
//! mint, update and burn to the ledger or the owner; there is no transfer.

pub mod error;
pub mod history;
pub mod registry;
pub mod score;

pub use error::ReputationError;
pub use history::LoanHistory;
pub use registry::{ReputationChange, ReputationRecord, ReputationRegistry};
pub use score::{age_bonus, calculate_score, Tier, BASE_SCORE, MAX_SCORE};
