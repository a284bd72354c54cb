//! Interest accrual
//!
//! Linear, block-denominated, no compounding:
//! `interest = principal * apr_bps / 10_000 * elapsed / blocks_per_year`

use peerlend_core::units::{BLOCKS_PER_YEAR, BPS_DENOMINATOR};
use peerlend_core::BlockNumber;

use crate::error::RiskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestModel {
    blocks_per_year: u64,
}

impl InterestModel {
    pub fn new() -> Self {
        Self {
            blocks_per_year: BLOCKS_PER_YEAR,
        }
    }

    pub fn with_blocks_per_year(blocks_per_year: u64) -> Self {
        Self {
            blocks_per_year: blocks_per_year.max(1),
        }
    }

    pub fn blocks_per_year(&self) -> u64 {
        self.blocks_per_year
    }

    /// Interest accrued over `elapsed` blocks, rounded down
    pub fn accrued(&self, principal: u128, apr_bps: u32, elapsed: u64) -> Result<u128, RiskError> {
        let numerator = principal
            .checked_mul(apr_bps as u128)
            .and_then(|v| v.checked_mul(elapsed as u128))
            .ok_or(RiskError::Overflow("accrued interest"))?;
        Ok(numerator / (BPS_DENOMINATOR * self.blocks_per_year as u128))
    }

    /// Interest accrued between `start` and `now` (zero if `now < start`)
    pub fn accrued_between(
        &self,
        principal: u128,
        apr_bps: u32,
        start: BlockNumber,
        now: BlockNumber,
    ) -> Result<u128, RiskError> {
        self.accrued(principal, apr_bps, now.saturating_sub(start))
    }
}

impl Default for InterestModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlend_core::units::{BLOCKS_PER_DAY, USD_UNIT};

    #[test]
    fn test_full_year_accrues_apr() {
        let model = InterestModel::new();
        // 1,000 USD at 8% for a year = 80 USD
        let interest = model.accrued(1_000 * USD_UNIT, 800, BLOCKS_PER_YEAR).unwrap();
        assert_eq!(interest, 80 * USD_UNIT);
    }

    #[test]
    fn test_ninety_days_linear() {
        let model = InterestModel::new();
        let interest = model
            .accrued(1_000 * USD_UNIT, 800, 90 * BLOCKS_PER_DAY)
            .unwrap();
        // 80 * 90 / 365 = 19.726027...
        assert_eq!(interest, 19_726_027);
    }

    #[test]
    fn test_zero_elapsed_or_rate() {
        let model = InterestModel::new();
        assert_eq!(model.accrued(1_000 * USD_UNIT, 800, 0).unwrap(), 0);
        assert_eq!(model.accrued(1_000 * USD_UNIT, 0, 1_000).unwrap(), 0);
        assert_eq!(model.accrued_between(1_000, 800, 10, 5).unwrap(), 0);
    }

    #[test]
    fn test_short_period_rounds_down() {
        let model = InterestModel::new();
        // 5 blocks of 1,000 USD at 8% = 0.007610 USD
        assert_eq!(model.accrued(1_000 * USD_UNIT, 800, 5).unwrap(), 7_610);
    }

    #[test]
    fn test_overflow_reported() {
        let model = InterestModel::new();
        assert!(matches!(
            model.accrued(u128::MAX, 10_000, 2),
            Err(RiskError::Overflow(_))
        ));
    }
}
