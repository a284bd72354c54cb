//! PeerLend Events - Hash-chained JSONL journal
//!
//! Every event drained from the marketplace is appended as one JSON line,
//! linked to the previous line by SHA-256. The journal is an audit trail;
//! the state snapshot remains the source for reloading the ledger.

pub mod chain;
pub mod error;
pub mod reader;
pub mod store;

pub use chain::{calculate_record_hash, verify_chain, ChainError, JournalRecord, GENESIS_HASH};
pub use error::EventError;
pub use reader::EventReader;
pub use store::EventStore;
