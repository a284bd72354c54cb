//! Marketplace errors
//!
//! Every rejected write maps to exactly one variant. Variants are grouped
//! into kinds so callers can tell "try again differently" (validation,
//! matching) from "try again later" (oracle, slippage).

use peerlend_core::{Address, BlockNumber};
use peerlend_oracle::OracleError;
use peerlend_reputation::ReputationError;
use peerlend_risk::RiskError;
use rust_decimal::Decimal;
use serde::Serialize;
use strum_macros::Display;
use thiserror::Error;

use crate::types::{ListingStatus, LoanStatus};

/// Error groups surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authorization,
    Validation,
    NotFound,
    Status,
    Matching,
    LoanOperation,
    Oracle,
    Slippage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    // === Authorization ===
    #[error("Unauthorized: {caller} may not {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("Protocol is paused")]
    ProtocolPaused,

    // === Validation ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(u128),

    #[error("Invalid APR: {0} bps")]
    InvalidApr(u32),

    #[error("Invalid duration: {0} blocks")]
    InvalidDuration(u64),

    #[error("Invalid collateral ratio: {0} bps")]
    InvalidCollateralRatio(u32),

    #[error("Invalid collateral amount: {0}")]
    InvalidCollateralAmount(u128),

    #[error("Invalid minimum reputation: {0}")]
    InvalidMinReputation(u32),

    // === Not found ===
    #[error("Offer not found: {0}")]
    OfferNotFound(u64),

    #[error("Request not found: {0}")]
    RequestNotFound(u64),

    #[error("Loan not found: {0}")]
    LoanNotFound(u64),

    // === Status ===
    #[error("Offer {id} is {status}")]
    OfferNotOpen { id: u64, status: ListingStatus },

    #[error("Request {id} is {status}")]
    RequestNotOpen { id: u64, status: ListingStatus },

    #[error("Loan {id} is {status}")]
    LoanNotActive { id: u64, status: LoanStatus },

    // === Matching ===
    #[error("Insufficient reputation: required {required}, actual {actual}")]
    InsufficientReputation { required: u32, actual: u32 },

    #[error("Insufficient collateral: required {required_bps} bps, actual {actual_bps} bps")]
    InsufficientCollateral { required_bps: u32, actual_bps: u128 },

    #[error("APR {apr_bps} bps exceeds borrower maximum {max_apr_bps} bps")]
    AprExceedsMaximum { apr_bps: u32, max_apr_bps: u32 },

    #[error("Incompatible terms: {0}")]
    IncompatibleTerms(&'static str),

    // === Loan operations ===
    #[error("{caller} is not the lender of loan {loan_id}")]
    NotLender { caller: Address, loan_id: u64 },

    #[error("{caller} is not the borrower of loan {loan_id}")]
    NotBorrower { caller: Address, loan_id: u64 },

    #[error("Loan {loan_id} not yet due for default: eligible after block {eligible_after}")]
    LoanNotYetDue {
        loan_id: u64,
        eligible_after: BlockNumber,
    },

    #[error("Loan {loan_id} is not liquidatable (health factor {health_factor:?})")]
    NotLiquidatable {
        loan_id: u64,
        health_factor: Option<Decimal>,
    },

    // === Slippage protection ===
    #[error("Offer {id} expired: age {age} blocks exceeds {max_age}")]
    OfferExpired { id: u64, age: u64, max_age: u64 },

    #[error("Request {id} expired: age {age} blocks exceeds {max_age}")]
    RequestExpired { id: u64, age: u64, max_age: u64 },

    #[error("Price deviated {deviation_bps} bps since snapshot {snapshot} (max {max_bps} bps)")]
    PriceDeviation {
        snapshot: u128,
        current: u128,
        deviation_bps: u128,
        max_bps: u32,
    },

    // === Wrapped component errors ===
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Reputation error: {0}")]
    Reputation(#[from] ReputationError),

    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        use MarketError::*;
        match self {
            Unauthorized { .. } | ProtocolPaused => ErrorKind::Authorization,
            InvalidAmount(_)
            | InvalidApr(_)
            | InvalidDuration(_)
            | InvalidCollateralRatio(_)
            | InvalidCollateralAmount(_)
            | InvalidMinReputation(_) => ErrorKind::Validation,
            OfferNotFound(_) | RequestNotFound(_) | LoanNotFound(_) => ErrorKind::NotFound,
            OfferNotOpen { .. } | RequestNotOpen { .. } | LoanNotActive { .. } => ErrorKind::Status,
            InsufficientReputation { .. }
            | InsufficientCollateral { .. }
            | AprExceedsMaximum { .. }
            | IncompatibleTerms(_) => ErrorKind::Matching,
            NotLender { .. } | NotBorrower { .. } | LoanNotYetDue { .. } | NotLiquidatable { .. } => {
                ErrorKind::LoanOperation
            }
            OfferExpired { .. } | RequestExpired { .. } | PriceDeviation { .. } => ErrorKind::Slippage,
            Oracle(e) => match e {
                OracleError::Unauthorized { .. } => ErrorKind::Authorization,
                OracleError::Unavailable | OracleError::StalePrice { .. } => ErrorKind::Oracle,
                _ => ErrorKind::Validation,
            },
            Reputation(e) => match e {
                ReputationError::Unauthorized(_) => ErrorKind::Authorization,
                ReputationError::NotFound(_) => ErrorKind::NotFound,
                ReputationError::AlreadyMinted(_) => ErrorKind::Status,
                ReputationError::ScoreOutOfRange(_) | ReputationError::InconsistentTier { .. } => {
                    ErrorKind::Validation
                }
            },
            Risk(_) => ErrorKind::Validation,
        }
    }

    /// Stable numeric code, hundreds digit = kind
    pub fn code(&self) -> u16 {
        use MarketError::*;
        match self {
            Unauthorized { .. } => 101,
            ProtocolPaused => 102,
            InvalidAmount(_) => 201,
            InvalidApr(_) => 202,
            InvalidDuration(_) => 203,
            InvalidCollateralRatio(_) => 204,
            InvalidCollateralAmount(_) => 205,
            InvalidMinReputation(_) => 206,
            OfferNotFound(_) => 301,
            RequestNotFound(_) => 302,
            LoanNotFound(_) => 303,
            OfferNotOpen { .. } => 401,
            RequestNotOpen { .. } => 402,
            LoanNotActive { .. } => 403,
            InsufficientReputation { .. } => 501,
            InsufficientCollateral { .. } => 502,
            AprExceedsMaximum { .. } => 503,
            IncompatibleTerms(_) => 504,
            NotLender { .. } => 601,
            NotBorrower { .. } => 602,
            LoanNotYetDue { .. } => 603,
            NotLiquidatable { .. } => 604,
            OfferExpired { .. } => 801,
            RequestExpired { .. } => 802,
            PriceDeviation { .. } => 803,
            Oracle(e) => match e {
                OracleError::Unauthorized { .. } => 101,
                OracleError::InvalidPrice(_) => 207,
                OracleError::PriceChangeTooLarge { .. } => 208,
                OracleError::BlockRegression { .. } => 209,
                OracleError::AmountTooLarge(_) | OracleError::Overflow => 210,
                OracleError::Unavailable => 701,
                OracleError::StalePrice { .. } => 702,
            },
            Reputation(e) => match e {
                ReputationError::Unauthorized(_) => 101,
                ReputationError::ScoreOutOfRange(_) => 211,
                ReputationError::InconsistentTier { .. } => 212,
                ReputationError::NotFound(_) => 304,
                ReputationError::AlreadyMinted(_) => 404,
            },
            Risk(_) => 210,
        }
    }

    /// True for rejections that may succeed unchanged at a later block
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Oracle | ErrorKind::Slippage)
            || matches!(self, MarketError::ProtocolPaused | MarketError::LoanNotYetDue { .. })
    }
}
