//! PeerLend Marketplace Ledger
//!
//! Lenders post offers, borrowers post collateral-backed requests, and a
//! party to both can match them into a loan. Loans end by repayment,
//! liquidation (permissionless, below the health threshold) or default
//! (lender only, after the grace period).
//!
//! The ledger is synchronous: every write takes the caller and the current
//! block, and either applies completely or returns a [`MarketError`] with
//! nothing changed.

pub mod config;
pub mod error;
pub mod event;
pub mod market;
pub mod types;

pub use config::{ConfigError, MarketConfig};
pub use error::{ErrorKind, MarketError};
pub use event::{EmittedEvent, MarketEvent};
pub use market::{Marketplace, OfferTerms, RequestTerms};
pub use types::{
    BorrowRequest, DefaultReceipt, LendingOffer, LiquidationReceipt, ListingStatus, Loan, LoanId,
    LoanStatus, OfferId, RepaymentReceipt, RequestId,
};
