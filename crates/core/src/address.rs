//! Address - Identity of a caller or record owner
//!
//! The execution environment authenticates callers; the engine only needs a
//! stable, comparable identifier. Addresses are normalized to uppercase so
//! `alice` and `ALICE` refer to the same account.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing an address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,

    #[error("Address too long (max 64 chars): {0}")]
    TooLong(String),

    #[error("Invalid address format: {0}")]
    InvalidFormat(String),
}

/// Account identity
///
/// # Examples
/// ```
/// use peerlend_core::Address;
///
/// let alice: Address = "alice".parse().unwrap();
/// assert_eq!(alice.as_str(), "ALICE");
///
/// assert!("".parse::<Address>().is_err());
/// assert!("bad address".parse::<Address>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const MAX_LEN: usize = 64;

    /// Create an address, normalizing to uppercase
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AddressError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(AddressError::Empty);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(AddressError::TooLong(raw.to_string()));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AddressError::InvalidFormat(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// Reserved identity the marketplace ledger uses for its own writes
    pub fn ledger() -> Self {
        Self(String::from("PEERLEND_LEDGER"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
