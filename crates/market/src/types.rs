//! Marketplace records and settlement receipts

use peerlend_core::{Address, BlockNumber};
use peerlend_risk::LoanPosition;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub type OfferId = u64;
pub type RequestId = u64;
pub type LoanId = u64;

/// Lifecycle of offers and requests: open -> matched | cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Open,
    Matched,
    Cancelled,
}

/// Lifecycle of loans: active -> repaid | liquidated | defaulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Repaid,
    Liquidated,
    Defaulted,
}

impl LoanStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoanStatus::Active)
    }
}

/// A lender's standing offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingOffer {
    pub id: OfferId,
    pub lender: Address,
    /// Principal available, borrowed-asset units
    pub amount: u128,
    pub apr_bps: u32,
    pub max_duration_blocks: u64,
    pub min_reputation: u32,
    pub min_collateral_ratio_bps: u32,
    pub status: ListingStatus,
    pub created_block: BlockNumber,
    /// Oracle price when the offer was posted
    pub price_snapshot: u128,
}

/// A borrower's collateral-backed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub id: RequestId,
    pub borrower: Address,
    pub amount: u128,
    pub max_apr_bps: u32,
    pub duration_blocks: u64,
    /// Escrowed collateral, collateral units
    pub collateral: u128,
    pub status: ListingStatus,
    pub created_block: BlockNumber,
    pub price_snapshot: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub offer_id: OfferId,
    pub request_id: RequestId,
    pub lender: Address,
    pub borrower: Address,
    pub principal: u128,
    pub apr_bps: u32,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub collateral: u128,
    /// Collateral value / principal at origination
    pub collateral_ratio_bps: u32,
    pub status: LoanStatus,
    pub repaid_amount: u128,
    pub closed_block: Option<BlockNumber>,
}

impl Loan {
    pub fn position(&self) -> LoanPosition {
        LoanPosition {
            principal: self.principal,
            apr_bps: self.apr_bps,
            start_block: self.start_block,
            collateral: self.collateral,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    pub fn is_overdue(&self, now: BlockNumber) -> bool {
        self.is_active() && now > self.end_block
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentReceipt {
    pub loan_id: LoanId,
    pub principal: u128,
    pub interest: u128,
    pub total_owed: u128,
    pub on_time: bool,
    pub collateral_released: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationReceipt {
    pub loan_id: LoanId,
    pub liquidator: Address,
    pub current_debt: u128,
    pub liquidator_bonus: u128,
    pub lender_share: u128,
    pub borrower_refund: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultReceipt {
    pub loan_id: LoanId,
    pub lender: Address,
    pub collateral_seized: u128,
    pub outstanding_debt: u128,
}
