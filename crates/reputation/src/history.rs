//! Per-address loan history counters

use peerlend_core::BlockNumber;
use serde::{Deserialize, Serialize};

/// Append-only counters maintained by the marketplace ledger
///
/// Volumes are in borrowed-asset units (6 decimals).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanHistory {
    pub loans_taken: u64,
    pub loans_repaid: u64,
    pub loans_liquidated: u64,
    pub loans_defaulted: u64,
    pub volume_borrowed: u128,
    pub volume_repaid: u128,
    pub on_time_repayments: u64,
    pub late_repayments: u64,
    pub first_loan_block: Option<BlockNumber>,
    pub last_activity_block: Option<BlockNumber>,
}

impl LoanHistory {
    pub fn record_loan_taken(&mut self, principal: u128, now: BlockNumber) {
        self.loans_taken += 1;
        self.volume_borrowed = self.volume_borrowed.saturating_add(principal);
        self.first_loan_block.get_or_insert(now);
        self.last_activity_block = Some(now);
    }

    pub fn record_repayment(&mut self, amount: u128, on_time: bool, now: BlockNumber) {
        self.loans_repaid += 1;
        self.volume_repaid = self.volume_repaid.saturating_add(amount);
        if on_time {
            self.on_time_repayments += 1;
        } else {
            self.late_repayments += 1;
        }
        self.last_activity_block = Some(now);
    }

    pub fn record_liquidation(&mut self, now: BlockNumber) {
        self.loans_liquidated += 1;
        self.last_activity_block = Some(now);
    }

    pub fn record_default(&mut self, now: BlockNumber) {
        self.loans_defaulted += 1;
        self.last_activity_block = Some(now);
    }

    /// Blocks elapsed since the first loan (0 if none)
    pub fn account_age(&self, now: BlockNumber) -> u64 {
        self.first_loan_block
            .map(|first| now.saturating_sub(first))
            .unwrap_or(0)
    }
}
