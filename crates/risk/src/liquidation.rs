//! Liquidation evaluator
//!
//! `health_factor = collateral_value / current_debt * 100`; a loan is
//! liquidatable when the health factor falls below the configured threshold.
//! Everything here is a pure function of (position, price, block).

use peerlend_core::units::{apply_bps, BPS_DENOMINATOR};
use peerlend_core::BlockNumber;
use peerlend_oracle::valuation::{amount_at, value_at};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RiskError;
use crate::interest::InterestModel;

/// The loan terms the evaluator needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPosition {
    pub principal: u128,
    pub apr_bps: u32,
    pub start_block: BlockNumber,
    pub collateral: u128,
}

/// Configuration for liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationConfig {
    /// Health factor (percent) below which a loan is liquidatable
    #[serde(default = "default_threshold_pct")]
    pub threshold_pct: u32,

    /// Share of collateral paid to the liquidator
    #[serde(default = "default_bonus_bps")]
    pub bonus_bps: u32,
}

fn default_threshold_pct() -> u32 {
    120
}

fn default_bonus_bps() -> u32 {
    500 // 5%
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            threshold_pct: default_threshold_pct(),
            bonus_bps: default_bonus_bps(),
        }
    }
}

/// Snapshot of a loan's solvency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanHealth {
    pub accrued_interest: u128,
    pub current_debt: u128,
    pub collateral_value: u128,
    /// Percentage with two decimals; `None` when there is no debt
    pub health_factor: Option<Decimal>,
    pub liquidatable: bool,
}

/// How seized collateral is split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPlan {
    pub health: LoanHealth,
    pub liquidator_bonus: u128,
    pub lender_share: u128,
    pub borrower_refund: u128,
}

#[derive(Debug, Clone, Default)]
pub struct LiquidationEvaluator {
    config: LiquidationConfig,
    interest: InterestModel,
}

impl LiquidationEvaluator {
    pub fn new(config: LiquidationConfig) -> Self {
        Self {
            config,
            interest: InterestModel::new(),
        }
    }

    pub fn with_interest_model(mut self, interest: InterestModel) -> Self {
        self.interest = interest;
        self
    }

    pub fn config(&self) -> &LiquidationConfig {
        &self.config
    }

    pub fn interest(&self) -> &InterestModel {
        &self.interest
    }

    /// Principal plus interest accrued up to `now`
    pub fn current_debt(&self, position: &LoanPosition, now: BlockNumber) -> Result<u128, RiskError> {
        let interest = self.interest.accrued_between(
            position.principal,
            position.apr_bps,
            position.start_block,
            now,
        )?;
        position
            .principal
            .checked_add(interest)
            .ok_or(RiskError::Overflow("current debt"))
    }

    /// Health factor in basis points of percent (11_250 = 112.50%)
    fn health_factor_bps(collateral_value: u128, debt: u128) -> Option<u128> {
        if debt == 0 {
            return None;
        }
        collateral_value.checked_mul(BPS_DENOMINATOR).map(|v| v / debt)
    }

    pub fn evaluate(
        &self,
        position: &LoanPosition,
        price: u128,
        now: BlockNumber,
    ) -> Result<LoanHealth, RiskError> {
        let accrued_interest = self.interest.accrued_between(
            position.principal,
            position.apr_bps,
            position.start_block,
            now,
        )?;
        let current_debt = position
            .principal
            .checked_add(accrued_interest)
            .ok_or(RiskError::Overflow("current debt"))?;
        let collateral_value = value_at(position.collateral, price)?;

        let hf_bps = Self::health_factor_bps(collateral_value, current_debt);
        let health_factor = hf_bps
            .and_then(|bps| i128::try_from(bps).ok())
            .map(|bps| Decimal::from_i128_with_scale(bps, 2));
        let threshold_bps = self.config.threshold_pct as u128 * 100;
        let liquidatable = matches!(hf_bps, Some(bps) if bps < threshold_bps);

        debug!(
            debt = %current_debt,
            collateral_value = %collateral_value,
            health_factor = ?health_factor,
            liquidatable,
            "Evaluated loan health"
        );

        Ok(LoanHealth {
            accrued_interest,
            current_debt,
            collateral_value,
            health_factor,
            liquidatable,
        })
    }

    /// Split the collateral of a liquidatable loan
    ///
    /// The liquidator receives `bonus_bps` of the collateral, the lender the
    /// collateral covering the current debt out of the remainder, and any
    /// surplus goes back to the borrower. Returns `None` when the loan is
    /// healthy.
    pub fn plan_liquidation(
        &self,
        position: &LoanPosition,
        price: u128,
        now: BlockNumber,
    ) -> Result<Option<LiquidationPlan>, RiskError> {
        let health = self.evaluate(position, price, now)?;
        if !health.liquidatable {
            return Ok(None);
        }

        let liquidator_bonus = apply_bps(position.collateral, self.config.bonus_bps)
            .ok_or(RiskError::Overflow("liquidation bonus"))?
            .min(position.collateral);
        let remaining = position.collateral - liquidator_bonus;
        let debt_in_collateral = amount_at(health.current_debt, price)?;
        let lender_share = remaining.min(debt_in_collateral);
        let borrower_refund = remaining - lender_share;

        Ok(Some(LiquidationPlan {
            health,
            liquidator_bonus,
            lender_share,
            borrower_refund,
        }))
    }
}
