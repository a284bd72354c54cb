//! PeerLend Core - Domain types
//!
//! This crate contains the fundamental types shared by every PeerLend component:
//! - `Address`: Caller / account identity supplied by the execution environment
//! - `units`: Fixed-point unit constants, block constants and conversions

pub mod address;
pub mod units;

pub use address::{Address, AddressError};
pub use units::BlockNumber;
