//! Credit score and tier model
//!
//! `score = 300 + 50 * repaid - 300 * (liquidated + defaulted)`, clamped to
//! `[0, 1000]`, plus an age bonus that stays inside the tier the score
//! already reached.

use peerlend_core::BlockNumber;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::history::LoanHistory;

pub const BASE_SCORE: u32 = 300;
pub const MAX_SCORE: u32 = 1_000;
pub const REPAYMENT_BONUS: i64 = 50;
pub const LIQUIDATION_PENALTY: i64 = 300;

/// One age point per 30 days of blocks
pub const AGE_BONUS_STEP_BLOCKS: u64 = 4_320;
pub const AGE_BONUS_CAP: u32 = 50;

/// Reputation tier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// Tier containing `score`
    pub fn of(score: u32) -> Self {
        match score {
            0..=300 => Tier::Bronze,
            301..=700 => Tier::Silver,
            _ => Tier::Gold,
        }
    }

    /// Inclusive score band
    pub fn bounds(&self) -> (u32, u32) {
        match self {
            Tier::Bronze => (0, 300),
            Tier::Silver => (301, 700),
            Tier::Gold => (701, MAX_SCORE),
        }
    }

    pub fn contains(&self, score: u32) -> bool {
        let (low, high) = self.bounds();
        (low..=high).contains(&score)
    }

    /// APR discount in basis points
    pub fn discount_bps(&self) -> u32 {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 500,
            Tier::Gold => 1_000,
        }
    }
}

pub fn age_bonus(age_blocks: u64) -> u32 {
    let points = age_blocks / AGE_BONUS_STEP_BLOCKS;
    points.min(AGE_BONUS_CAP as u64) as u32
}

pub fn calculate_score(history: &LoanHistory, now: BlockNumber) -> u32 {
    let repaid = history.loans_repaid.min(i64::MAX as u64) as i64;
    let penalized = history
        .loans_liquidated
        .saturating_add(history.loans_defaulted)
        .min(i64::MAX as u64) as i64;

    let raw = (BASE_SCORE as i64)
        .saturating_add(REPAYMENT_BONUS.saturating_mul(repaid))
        .saturating_sub(LIQUIDATION_PENALTY.saturating_mul(penalized));
    let earned = raw.clamp(0, MAX_SCORE as i64) as u32;

    // Age tops up within the current band only
    let (_, ceiling) = Tier::of(earned).bounds();
    earned
        .saturating_add(age_bonus(history.account_age(now)))
        .min(ceiling)
}
