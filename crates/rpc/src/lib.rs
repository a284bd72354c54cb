//! PeerLend RPC - CLI orchestrator
//!
//! Loads the marketplace snapshot, runs one command, then persists the
//! snapshot and journals the emitted events.

pub mod commands;
pub mod context;

pub use commands::CallContext;
pub use context::{AppContext, ContextError};
