//! PeerLend Price Oracle
//!
//! Holds the collateral asset price, a bounded per-block history and the
//! freshness window. Updates are privileged and bounded in magnitude so a
//! single write cannot move the price arbitrarily far.

mod config;
mod error;
mod feed;
pub mod valuation;

pub use config::OracleConfig;
pub use error::OracleError;
pub use feed::{PriceOracle, PriceUpdate};
