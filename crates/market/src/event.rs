//! Events emitted by successful writes

use peerlend_core::{Address, BlockNumber};
use peerlend_reputation::Tier;
use serde::{Deserialize, Serialize};

use crate::types::{LoanId, OfferId, RequestId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketEvent {
    OfferCreated {
        offer_id: OfferId,
        lender: Address,
        amount: u128,
        apr_bps: u32,
        max_duration_blocks: u64,
    },
    OfferCancelled {
        offer_id: OfferId,
    },
    RequestCreated {
        request_id: RequestId,
        borrower: Address,
        amount: u128,
        max_apr_bps: u32,
        duration_blocks: u64,
        collateral: u128,
    },
    RequestCancelled {
        request_id: RequestId,
        collateral_released: u128,
    },
    LoanCreated {
        loan_id: LoanId,
        offer_id: OfferId,
        request_id: RequestId,
        lender: Address,
        borrower: Address,
        principal: u128,
        apr_bps: u32,
        end_block: BlockNumber,
    },
    LoanRepaid {
        loan_id: LoanId,
        interest: u128,
        total_repaid: u128,
        on_time: bool,
    },
    LoanLiquidated {
        loan_id: LoanId,
        liquidator: Address,
        liquidator_bonus: u128,
        lender_share: u128,
        borrower_refund: u128,
    },
    LoanDefaulted {
        loan_id: LoanId,
        collateral_seized: u128,
    },
    PriceUpdated {
        price: u128,
        previous: Option<u128>,
    },
    ReputationMinted {
        holder: Address,
        token_id: u64,
    },
    ReputationUpdated {
        holder: Address,
        old_score: u32,
        new_score: u32,
        tier: Tier,
    },
    ReputationBurned {
        holder: Address,
        token_id: u64,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
}

impl MarketEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MarketEvent::OfferCreated { .. } => "offer_created",
            MarketEvent::OfferCancelled { .. } => "offer_cancelled",
            MarketEvent::RequestCreated { .. } => "request_created",
            MarketEvent::RequestCancelled { .. } => "request_cancelled",
            MarketEvent::LoanCreated { .. } => "loan_created",
            MarketEvent::LoanRepaid { .. } => "loan_repaid",
            MarketEvent::LoanLiquidated { .. } => "loan_liquidated",
            MarketEvent::LoanDefaulted { .. } => "loan_defaulted",
            MarketEvent::PriceUpdated { .. } => "price_updated",
            MarketEvent::ReputationMinted { .. } => "reputation_minted",
            MarketEvent::ReputationUpdated { .. } => "reputation_updated",
            MarketEvent::ReputationBurned { .. } => "reputation_burned",
            MarketEvent::Paused { .. } => "paused",
            MarketEvent::Unpaused { .. } => "unpaused",
        }
    }
}

/// An event stamped with the block of the write that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub block: BlockNumber,
    pub event: MarketEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = MarketEvent::OfferCancelled { offer_id: 7 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"offer_cancelled":{"offer_id":7}}"#);
        assert_eq!(event.name(), "offer_cancelled");

        let parsed: MarketEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
