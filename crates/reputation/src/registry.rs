//! Soulbound reputation registry
//!
//! One record per address. Writes are restricted to the registry owner and
//! the authorized ledger address; records can be updated in place or burned
//! but never move to another address.

use peerlend_core::{Address, BlockNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::ReputationError;
use crate::history::LoanHistory;
use crate::score::{calculate_score, Tier, BASE_SCORE, MAX_SCORE};

/// Non-transferable reputation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub token_id: u64,
    pub owner: Address,
    pub score: u32,
    pub tier: Tier,
    pub created_block: BlockNumber,
    pub updated_block: BlockNumber,
}

/// Outcome of a score refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationChange {
    pub owner: Address,
    pub minted: bool,
    pub old_score: u32,
    pub new_score: u32,
    pub old_tier: Tier,
    pub new_tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationRegistry {
    owner: Address,
    ledger: Address,
    records: BTreeMap<Address, ReputationRecord>,
    next_token_id: u64,
}

impl ReputationRegistry {
    pub fn new(owner: Address, ledger: Address) -> Self {
        Self {
            owner,
            ledger,
            records: BTreeMap::new(),
            next_token_id: 1,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn ledger(&self) -> &Address {
        &self.ledger
    }

    fn authorize(&self, caller: &Address) -> Result<(), ReputationError> {
        if caller == &self.owner || caller == &self.ledger {
            Ok(())
        } else {
            Err(ReputationError::Unauthorized(caller.clone()))
        }
    }

    /// Mint a base-score record for `holder`
    pub fn mint(
        &mut self,
        caller: &Address,
        holder: &Address,
        now: BlockNumber,
    ) -> Result<&ReputationRecord, ReputationError> {
        self.authorize(caller)?;
        if self.records.contains_key(holder) {
            return Err(ReputationError::AlreadyMinted(holder.clone()));
        }
        Ok(self.insert_base_record(holder, now))
    }

    fn insert_base_record(&mut self, holder: &Address, now: BlockNumber) -> &ReputationRecord {
        let token_id = self.next_token_id;
        self.next_token_id += 1;

        info!(holder = %holder, token_id, "Minted reputation record");
        self.records
            .entry(holder.clone())
            .or_insert(ReputationRecord {
                token_id,
                owner: holder.clone(),
                score: BASE_SCORE,
                tier: Tier::of(BASE_SCORE),
                created_block: now,
                updated_block: now,
            })
    }

    /// Overwrite score and tier; the pair must be consistent
    pub fn update(
        &mut self,
        caller: &Address,
        holder: &Address,
        score: u32,
        tier: Tier,
        now: BlockNumber,
    ) -> Result<&ReputationRecord, ReputationError> {
        self.authorize(caller)?;
        if score > MAX_SCORE {
            return Err(ReputationError::ScoreOutOfRange(score));
        }
        if !tier.contains(score) {
            return Err(ReputationError::InconsistentTier { score, tier });
        }
        let record = self
            .records
            .get_mut(holder)
            .ok_or_else(|| ReputationError::NotFound(holder.clone()))?;

        record.score = score;
        record.tier = tier;
        record.updated_block = now;
        debug!(holder = %holder, score, tier = %tier, "Updated reputation record");
        Ok(record)
    }

    /// Remove a record entirely
    pub fn burn(
        &mut self,
        caller: &Address,
        holder: &Address,
    ) -> Result<ReputationRecord, ReputationError> {
        self.authorize(caller)?;
        let record = self
            .records
            .remove(holder)
            .ok_or_else(|| ReputationError::NotFound(holder.clone()))?;
        info!(holder = %holder, token_id = record.token_id, "Burned reputation record");
        Ok(record)
    }

    /// Mint if absent; returns true when a record was created
    pub fn provision(
        &mut self,
        caller: &Address,
        holder: &Address,
        now: BlockNumber,
    ) -> Result<bool, ReputationError> {
        self.authorize(caller)?;
        if self.records.contains_key(holder) {
            return Ok(false);
        }
        self.insert_base_record(holder, now);
        Ok(true)
    }

    /// Recompute the score from `history`, minting first if needed
    pub fn refresh(
        &mut self,
        caller: &Address,
        holder: &Address,
        history: &LoanHistory,
        now: BlockNumber,
    ) -> Result<ReputationChange, ReputationError> {
        let minted = self.provision(caller, holder, now)?;
        let (old_score, old_tier) = self
            .records
            .get(holder)
            .map(|r| (r.score, r.tier))
            .ok_or_else(|| ReputationError::NotFound(holder.clone()))?;

        let new_score = calculate_score(history, now);
        let new_tier = Tier::of(new_score);
        self.update(caller, holder, new_score, new_tier, now)?;

        Ok(ReputationChange {
            owner: holder.clone(),
            minted,
            old_score,
            new_score,
            old_tier,
            new_tier,
        })
    }

    pub fn get(&self, holder: &Address) -> Option<&ReputationRecord> {
        self.records.get(holder)
    }

    pub fn has_reputation(&self, holder: &Address) -> bool {
        self.records.contains_key(holder)
    }

    /// Current score, or the base score for addresses without a record
    pub fn score_of(&self, holder: &Address) -> u32 {
        self.records.get(holder).map_or(BASE_SCORE, |r| r.score)
    }

    pub fn tier_of(&self, holder: &Address) -> Tier {
        self.records
            .get(holder)
            .map_or_else(|| Tier::of(BASE_SCORE), |r| r.tier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn registry() -> ReputationRegistry {
        ReputationRegistry::new(addr("OWNER"), addr("LEDGER"))
    }

    #[test]
    fn test_mint_assigns_base_score_and_token_ids() {
        let mut reg = registry();
        let alice = reg.mint(&addr("LEDGER"), &addr("ALICE"), 5).unwrap().clone();
        assert_eq!(alice.score, BASE_SCORE);
        assert_eq!(alice.tier, Tier::Bronze);
        assert_eq!(alice.token_id, 1);
        assert_eq!(alice.created_block, 5);

        let bob = reg.mint(&addr("OWNER"), &addr("BOB"), 6).unwrap();
        assert_eq!(bob.token_id, 2);
    }

    #[test]
    fn test_mint_twice_rejected() {
        let mut reg = registry();
        reg.mint(&addr("LEDGER"), &addr("ALICE"), 1).unwrap();
        assert_eq!(
            reg.mint(&addr("LEDGER"), &addr("ALICE"), 2).unwrap_err(),
            ReputationError::AlreadyMinted(addr("ALICE"))
        );
    }

    #[test]
    fn test_unauthorized_writes_rejected() {
        let mut reg = registry();
        let mallory = addr("MALLORY");
        assert!(matches!(
            reg.mint(&mallory, &addr("ALICE"), 1),
            Err(ReputationError::Unauthorized(_))
        ));
        reg.mint(&addr("LEDGER"), &addr("ALICE"), 1).unwrap();
        assert!(matches!(
            reg.update(&mallory, &addr("ALICE"), 500, Tier::Silver, 2),
            Err(ReputationError::Unauthorized(_))
        ));
        assert!(matches!(
            reg.burn(&mallory, &addr("ALICE")),
            Err(ReputationError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_update_rejects_inconsistent_pair() {
        let mut reg = registry();
        reg.mint(&addr("LEDGER"), &addr("ALICE"), 1).unwrap();

        assert_eq!(
            reg.update(&addr("LEDGER"), &addr("ALICE"), 800, Tier::Bronze, 2)
                .unwrap_err(),
            ReputationError::InconsistentTier {
                score: 800,
                tier: Tier::Bronze
            }
        );
        assert_eq!(
            reg.update(&addr("LEDGER"), &addr("ALICE"), 1_001, Tier::Gold, 2)
                .unwrap_err(),
            ReputationError::ScoreOutOfRange(1_001)
        );

        let record = reg
            .update(&addr("LEDGER"), &addr("ALICE"), 800, Tier::Gold, 3)
            .unwrap();
        assert_eq!(record.score, 800);
        assert_eq!(record.updated_block, 3);
    }

    #[test]
    fn test_update_missing_record() {
        let mut reg = registry();
        assert_eq!(
            reg.update(&addr("OWNER"), &addr("NOBODY"), 300, Tier::Bronze, 1)
                .unwrap_err(),
            ReputationError::NotFound(addr("NOBODY"))
        );
    }

    #[test]
    fn test_burn_removes_record() {
        let mut reg = registry();
        reg.mint(&addr("LEDGER"), &addr("ALICE"), 1).unwrap();
        let burned = reg.burn(&addr("OWNER"), &addr("ALICE")).unwrap();
        assert_eq!(burned.owner, addr("ALICE"));
        assert!(!reg.has_reputation(&addr("ALICE")));
        assert_eq!(reg.score_of(&addr("ALICE")), BASE_SCORE);

        // Re-minting after burn issues a fresh token id
        let again = reg.mint(&addr("LEDGER"), &addr("ALICE"), 2).unwrap();
        assert_eq!(again.token_id, 2);
    }

    #[test]
    fn test_provision_is_idempotent() {
        let mut reg = registry();
        assert!(reg.provision(&addr("LEDGER"), &addr("ALICE"), 1).unwrap());
        assert!(!reg.provision(&addr("LEDGER"), &addr("ALICE"), 2).unwrap());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_refresh_recomputes_from_history() {
        let mut reg = registry();
        let mut history = LoanHistory::default();
        history.record_loan_taken(1_000, 10);
        history.record_repayment(1_000, true, 15);

        let change = reg
            .refresh(&addr("LEDGER"), &addr("ALICE"), &history, 15)
            .unwrap();
        assert!(change.minted);
        assert_eq!(change.old_score, BASE_SCORE);
        assert_eq!(change.new_score, BASE_SCORE + 50);
        assert_eq!(change.new_tier, Tier::Silver);
        assert_eq!(reg.tier_of(&addr("ALICE")), Tier::Silver);
    }
}
