//! Marketplace Ledger
//!
//! Owns offers, requests, loans and per-address loan history. Every write
//! validates all preconditions before touching state, so a rejected call
//! leaves the ledger exactly as it was.
//!
//! Flow of a write: validate -> read oracle -> compute new records ->
//! refresh reputation -> commit records -> emit events.

use peerlend_core::units::{
    change_bps, exceeds_bps, BPS_DENOMINATOR, MAX_APR_BPS, MAX_COLLATERAL_SUPPLY, MAX_DURATION_BLOCKS,
    MAX_LOAN_AMOUNT, MIN_COLLATERAL_RATIO_BPS,
};
use peerlend_core::{Address, BlockNumber};
use peerlend_oracle::valuation::value_at;
use peerlend_oracle::{OracleError, PriceOracle};
use peerlend_reputation::{
    calculate_score, LoanHistory, ReputationChange, ReputationRecord, ReputationRegistry, Tier,
    MAX_SCORE,
};
use peerlend_risk::{LiquidationEvaluator, LoanHealth};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::event::{EmittedEvent, MarketEvent};
use crate::types::{
    BorrowRequest, DefaultReceipt, LendingOffer, LiquidationReceipt, ListingStatus, Loan, LoanId,
    LoanStatus, OfferId, RepaymentReceipt, RequestId,
};

/// Parameters of `create_lending_offer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub amount: u128,
    pub apr_bps: u32,
    pub max_duration_blocks: u64,
    pub min_reputation: u32,
    pub min_collateral_ratio_bps: u32,
}

/// Parameters of `create_borrow_request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTerms {
    pub amount: u128,
    pub max_apr_bps: u32,
    pub duration_blocks: u64,
    pub collateral: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marketplace {
    config: MarketConfig,
    owner: Address,
    ledger: Address,
    paused: bool,
    oracle: PriceOracle,
    reputation: ReputationRegistry,
    offers: BTreeMap<OfferId, LendingOffer>,
    requests: BTreeMap<RequestId, BorrowRequest>,
    loans: BTreeMap<LoanId, Loan>,
    histories: BTreeMap<Address, LoanHistory>,
    next_offer_id: OfferId,
    next_request_id: RequestId,
    next_loan_id: LoanId,
    /// Collateral currently held for open requests and active loans
    collateral_escrow: u128,
    #[serde(skip)]
    events: Vec<EmittedEvent>,
}

impl Marketplace {
    /// Create an empty marketplace; `owner` administers the oracle,
    /// reputation registry and pause switch.
    pub fn new(owner: Address, config: MarketConfig) -> Self {
        let ledger = Address::ledger();
        Self {
            oracle: PriceOracle::new(owner.clone(), config.oracle.clone()),
            reputation: ReputationRegistry::new(owner.clone(), ledger.clone()),
            config,
            owner,
            ledger,
            paused: false,
            offers: BTreeMap::new(),
            requests: BTreeMap::new(),
            loans: BTreeMap::new(),
            histories: BTreeMap::new(),
            next_offer_id: 1,
            next_request_id: 1,
            next_loan_id: 1,
            collateral_escrow: 0,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn oracle(&self) -> &PriceOracle {
        &self.oracle
    }

    pub fn reputation(&self) -> &ReputationRegistry {
        &self.reputation
    }

    pub fn collateral_escrow(&self) -> u128 {
        self.collateral_escrow
    }

    fn evaluator(&self) -> LiquidationEvaluator {
        LiquidationEvaluator::new(self.config.liquidation.clone())
    }

    fn emit(&mut self, block: BlockNumber, event: MarketEvent) {
        debug!(event = event.name(), block, "Emitting market event");
        self.events.push(EmittedEvent { block, event });
    }

    /// Events emitted since the last drain, oldest first
    pub fn pending_events(&self) -> &[EmittedEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<EmittedEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_not_paused(&self) -> Result<(), MarketError> {
        if self.paused {
            return Err(MarketError::ProtocolPaused);
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Address, action: &'static str) -> Result<(), MarketError> {
        if caller != &self.owner {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                action,
            });
        }
        Ok(())
    }

    // === Administration ===

    pub fn pause(&mut self, caller: &Address, now: BlockNumber) -> Result<(), MarketError> {
        self.ensure_owner(caller, "pause the protocol")?;
        if !self.paused {
            self.paused = true;
            warn!(by = %caller, "Protocol paused");
            self.emit(now, MarketEvent::Paused { by: caller.clone() });
        }
        Ok(())
    }

    pub fn unpause(&mut self, caller: &Address, now: BlockNumber) -> Result<(), MarketError> {
        self.ensure_owner(caller, "unpause the protocol")?;
        if self.paused {
            self.paused = false;
            info!(by = %caller, "Protocol unpaused");
            self.emit(now, MarketEvent::Unpaused { by: caller.clone() });
        }
        Ok(())
    }

    pub fn set_oracle_price(
        &mut self,
        caller: &Address,
        price: u128,
        now: BlockNumber,
    ) -> Result<(), MarketError> {
        let update = self.oracle.set_price(caller, price, now)?;
        self.emit(
            now,
            MarketEvent::PriceUpdated {
                price: update.price,
                previous: update.previous,
            },
        );
        Ok(())
    }

    // === Offers and requests ===

    pub fn create_lending_offer(
        &mut self,
        caller: &Address,
        terms: OfferTerms,
        now: BlockNumber,
    ) -> Result<OfferId, MarketError> {
        self.ensure_not_paused()?;
        validate_amount(terms.amount)?;
        validate_apr(terms.apr_bps)?;
        validate_duration(terms.max_duration_blocks)?;
        if terms.min_reputation > MAX_SCORE {
            return Err(MarketError::InvalidMinReputation(terms.min_reputation));
        }
        if terms.min_collateral_ratio_bps < MIN_COLLATERAL_RATIO_BPS {
            return Err(MarketError::InvalidCollateralRatio(terms.min_collateral_ratio_bps));
        }
        let price_snapshot = self.oracle.get_price()?;

        let id = self.next_offer_id;
        self.next_offer_id += 1;
        let offer = LendingOffer {
            id,
            lender: caller.clone(),
            amount: terms.amount,
            apr_bps: terms.apr_bps,
            max_duration_blocks: terms.max_duration_blocks,
            min_reputation: terms.min_reputation,
            min_collateral_ratio_bps: terms.min_collateral_ratio_bps,
            status: ListingStatus::Open,
            created_block: now,
            price_snapshot,
        };
        info!(offer_id = id, lender = %caller, amount = %terms.amount, apr_bps = terms.apr_bps, "Offer created");
        self.offers.insert(id, offer);
        self.emit(
            now,
            MarketEvent::OfferCreated {
                offer_id: id,
                lender: caller.clone(),
                amount: terms.amount,
                apr_bps: terms.apr_bps,
                max_duration_blocks: terms.max_duration_blocks,
            },
        );
        Ok(id)
    }

    pub fn create_borrow_request(
        &mut self,
        caller: &Address,
        terms: RequestTerms,
        now: BlockNumber,
    ) -> Result<RequestId, MarketError> {
        self.ensure_not_paused()?;
        validate_amount(terms.amount)?;
        validate_apr(terms.max_apr_bps)?;
        validate_duration(terms.duration_blocks)?;
        if terms.collateral == 0 || terms.collateral > MAX_COLLATERAL_SUPPLY {
            return Err(MarketError::InvalidCollateralAmount(terms.collateral));
        }
        let escrow = self
            .collateral_escrow
            .checked_add(terms.collateral)
            .filter(|total| *total <= MAX_COLLATERAL_SUPPLY)
            .ok_or(MarketError::InvalidCollateralAmount(terms.collateral))?;
        let price_snapshot = self.oracle.get_price()?;

        let minted = self.reputation.provision(&self.ledger, caller, now)?;
        if minted {
            self.emit_minted(caller, now);
        }

        let id = self.next_request_id;
        self.next_request_id += 1;
        let request = BorrowRequest {
            id,
            borrower: caller.clone(),
            amount: terms.amount,
            max_apr_bps: terms.max_apr_bps,
            duration_blocks: terms.duration_blocks,
            collateral: terms.collateral,
            status: ListingStatus::Open,
            created_block: now,
            price_snapshot,
        };
        self.collateral_escrow = escrow;
        info!(request_id = id, borrower = %caller, amount = %terms.amount, collateral = %terms.collateral, "Request created");
        self.requests.insert(id, request);
        self.emit(
            now,
            MarketEvent::RequestCreated {
                request_id: id,
                borrower: caller.clone(),
                amount: terms.amount,
                max_apr_bps: terms.max_apr_bps,
                duration_blocks: terms.duration_blocks,
                collateral: terms.collateral,
            },
        );
        Ok(id)
    }

    pub fn cancel_lending_offer(
        &mut self,
        caller: &Address,
        offer_id: OfferId,
        now: BlockNumber,
    ) -> Result<(), MarketError> {
        let offer = self
            .offers
            .get_mut(&offer_id)
            .ok_or(MarketError::OfferNotFound(offer_id))?;
        if &offer.lender != caller {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                action: "cancel another lender's offer",
            });
        }
        if offer.status != ListingStatus::Open {
            return Err(MarketError::OfferNotOpen {
                id: offer_id,
                status: offer.status,
            });
        }
        offer.status = ListingStatus::Cancelled;
        info!(offer_id, "Offer cancelled");
        self.emit(now, MarketEvent::OfferCancelled { offer_id });
        Ok(())
    }

    /// Cancel an open request and release its collateral to the borrower
    pub fn cancel_borrow_request(
        &mut self,
        caller: &Address,
        request_id: RequestId,
        now: BlockNumber,
    ) -> Result<u128, MarketError> {
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(MarketError::RequestNotFound(request_id))?;
        if &request.borrower != caller {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                action: "cancel another borrower's request",
            });
        }
        if request.status != ListingStatus::Open {
            return Err(MarketError::RequestNotOpen {
                id: request_id,
                status: request.status,
            });
        }
        request.status = ListingStatus::Cancelled;
        let released = request.collateral;
        self.collateral_escrow = self.collateral_escrow.saturating_sub(released);
        info!(request_id, collateral = %released, "Request cancelled");
        self.emit(
            now,
            MarketEvent::RequestCancelled {
                request_id,
                collateral_released: released,
            },
        );
        Ok(released)
    }

    // === Matching ===

    pub fn match_offer_to_request(
        &mut self,
        caller: &Address,
        offer_id: OfferId,
        request_id: RequestId,
        now: BlockNumber,
    ) -> Result<LoanId, MarketError> {
        self.ensure_not_paused()?;
        let offer = self
            .offers
            .get(&offer_id)
            .ok_or(MarketError::OfferNotFound(offer_id))?;
        let request = self
            .requests
            .get(&request_id)
            .ok_or(MarketError::RequestNotFound(request_id))?;

        if caller != &offer.lender && caller != &request.borrower {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                action: "match a listing they are not party to",
            });
        }
        if offer.status != ListingStatus::Open {
            return Err(MarketError::OfferNotOpen {
                id: offer_id,
                status: offer.status,
            });
        }
        if request.status != ListingStatus::Open {
            return Err(MarketError::RequestNotOpen {
                id: request_id,
                status: request.status,
            });
        }

        // Slippage protection: record age
        let max_age = self.config.max_record_age_blocks;
        let offer_age = now.saturating_sub(offer.created_block);
        if offer_age > max_age {
            return Err(MarketError::OfferExpired {
                id: offer_id,
                age: offer_age,
                max_age,
            });
        }
        let request_age = now.saturating_sub(request.created_block);
        if request_age > max_age {
            return Err(MarketError::RequestExpired {
                id: request_id,
                age: request_age,
                max_age,
            });
        }

        // Slippage protection: price drift since each snapshot
        let price = self.oracle.fresh_price(now)?;
        let max_deviation = self.config.max_price_deviation_bps;
        for snapshot in [offer.price_snapshot, request.price_snapshot] {
            let deviated = exceeds_bps(snapshot, price, max_deviation)
                .ok_or(OracleError::InvalidPrice(snapshot))?;
            if deviated {
                let deviation = change_bps(snapshot, price).ok_or(OracleError::InvalidPrice(snapshot))?;
                warn!(snapshot = %snapshot, current = %price, deviation_bps = %deviation, "Price deviated since snapshot");
                return Err(MarketError::PriceDeviation {
                    snapshot,
                    current: price,
                    deviation_bps: deviation,
                    max_bps: max_deviation,
                });
            }
        }

        // Term compatibility
        if offer.lender == request.borrower {
            return Err(MarketError::IncompatibleTerms("lender and borrower are the same"));
        }
        if request.amount > offer.amount {
            return Err(MarketError::IncompatibleTerms("requested amount exceeds offer"));
        }
        if request.duration_blocks > offer.max_duration_blocks {
            return Err(MarketError::IncompatibleTerms("requested duration exceeds offer"));
        }

        let borrower_tier = self.reputation.tier_of(&request.borrower);
        let apr_bps = discount_apr(offer.apr_bps, borrower_tier);
        if apr_bps > request.max_apr_bps {
            return Err(MarketError::AprExceedsMaximum {
                apr_bps,
                max_apr_bps: request.max_apr_bps,
            });
        }

        let score = self.reputation.score_of(&request.borrower);
        if score < offer.min_reputation {
            return Err(MarketError::InsufficientReputation {
                required: offer.min_reputation,
                actual: score,
            });
        }

        let principal = request.amount;
        let collateral_value = value_at(request.collateral, price)?;
        let ratio_bps = collateral_value
            .checked_mul(BPS_DENOMINATOR)
            .map(|v| v / principal)
            .ok_or(MarketError::InvalidCollateralAmount(request.collateral))?;
        if ratio_bps < offer.min_collateral_ratio_bps as u128 {
            return Err(MarketError::InsufficientCollateral {
                required_bps: offer.min_collateral_ratio_bps,
                actual_bps: ratio_bps,
            });
        }
        // A new loan must start strictly above the liquidation threshold
        let liquidation_bps = self.config.liquidation.threshold_pct as u128 * 100;
        if ratio_bps <= liquidation_bps {
            warn!(ratio_bps = %ratio_bps, threshold_bps = %liquidation_bps, "Loan would open liquidatable");
            return Err(MarketError::InsufficientCollateral {
                required_bps: (liquidation_bps + 1).min(u32::MAX as u128) as u32,
                actual_bps: ratio_bps,
            });
        }

        let end_block = now
            .checked_add(request.duration_blocks)
            .ok_or(MarketError::InvalidDuration(request.duration_blocks))?;
        let loan_id = self.next_loan_id;
        let loan = Loan {
            id: loan_id,
            offer_id,
            request_id,
            lender: offer.lender.clone(),
            borrower: request.borrower.clone(),
            principal,
            apr_bps,
            start_block: now,
            end_block,
            collateral: request.collateral,
            collateral_ratio_bps: ratio_bps.min(u32::MAX as u128) as u32,
            status: LoanStatus::Active,
            repaid_amount: 0,
            closed_block: None,
        };

        let mut history = self.user_loan_history(&loan.borrower);
        history.record_loan_taken(principal, now);
        let change = self.reputation.refresh(&self.ledger, &loan.borrower, &history, now)?;

        // Commit
        self.next_loan_id += 1;
        if let Some(offer) = self.offers.get_mut(&offer_id) {
            offer.status = ListingStatus::Matched;
        }
        if let Some(request) = self.requests.get_mut(&request_id) {
            request.status = ListingStatus::Matched;
        }
        self.histories.insert(loan.borrower.clone(), history);

        info!(
            loan_id,
            offer_id,
            request_id,
            lender = %loan.lender,
            borrower = %loan.borrower,
            principal = %principal,
            apr_bps,
            "Loan created"
        );
        self.emit(
            now,
            MarketEvent::LoanCreated {
                loan_id,
                offer_id,
                request_id,
                lender: loan.lender.clone(),
                borrower: loan.borrower.clone(),
                principal,
                apr_bps,
                end_block,
            },
        );
        self.emit_reputation_change(&change, now);
        self.loans.insert(loan_id, loan);
        Ok(loan_id)
    }

    // === Loan lifecycle ===

    /// Settle a loan in full: principal plus linearly accrued interest
    pub fn repay_loan(
        &mut self,
        caller: &Address,
        loan_id: LoanId,
        now: BlockNumber,
    ) -> Result<RepaymentReceipt, MarketError> {
        let loan = self.active_loan(loan_id)?;
        if caller != &loan.borrower {
            return Err(MarketError::NotBorrower {
                caller: caller.clone(),
                loan_id,
            });
        }

        let interest = self.evaluator().interest().accrued_between(
            loan.principal,
            loan.apr_bps,
            loan.start_block,
            now,
        )?;
        let total_owed = loan
            .principal
            .checked_add(interest)
            .ok_or(MarketError::InvalidAmount(loan.principal))?;
        let on_time = now <= loan.end_block;
        let borrower = loan.borrower.clone();
        let receipt = RepaymentReceipt {
            loan_id,
            principal: loan.principal,
            interest,
            total_owed,
            on_time,
            collateral_released: loan.collateral,
        };

        let mut history = self.user_loan_history(&borrower);
        history.record_repayment(total_owed, on_time, now);
        let change = self.reputation.refresh(&self.ledger, &borrower, &history, now)?;

        // Commit
        self.histories.insert(borrower, history);
        self.close_loan(loan_id, LoanStatus::Repaid, total_owed, now);
        info!(loan_id, total_owed = %total_owed, on_time, "Loan repaid");
        self.emit(
            now,
            MarketEvent::LoanRepaid {
                loan_id,
                interest,
                total_repaid: total_owed,
                on_time,
            },
        );
        self.emit_reputation_change(&change, now);
        Ok(receipt)
    }

    /// Permissionless liquidation of an under-collateralized loan
    pub fn liquidate_loan(
        &mut self,
        caller: &Address,
        loan_id: LoanId,
        now: BlockNumber,
    ) -> Result<LiquidationReceipt, MarketError> {
        self.ensure_not_paused()?;
        let loan = self.active_loan(loan_id)?;
        let price = self.oracle.fresh_price(now)?;
        let plan = match self.evaluator().plan_liquidation(&loan.position(), price, now)? {
            Some(plan) => plan,
            None => {
                let health = self.evaluator().evaluate(&loan.position(), price, now)?;
                return Err(MarketError::NotLiquidatable {
                    loan_id,
                    health_factor: health.health_factor,
                });
            }
        };
        let borrower = loan.borrower.clone();
        let receipt = LiquidationReceipt {
            loan_id,
            liquidator: caller.clone(),
            current_debt: plan.health.current_debt,
            liquidator_bonus: plan.liquidator_bonus,
            lender_share: plan.lender_share,
            borrower_refund: plan.borrower_refund,
        };

        let mut history = self.user_loan_history(&borrower);
        history.record_liquidation(now);
        let change = self.reputation.refresh(&self.ledger, &borrower, &history, now)?;

        // Commit
        self.histories.insert(borrower, history);
        self.close_loan(loan_id, LoanStatus::Liquidated, 0, now);
        warn!(
            loan_id,
            liquidator = %caller,
            health_factor = ?plan.health.health_factor,
            bonus = %plan.liquidator_bonus,
            "Loan liquidated"
        );
        self.emit(
            now,
            MarketEvent::LoanLiquidated {
                loan_id,
                liquidator: caller.clone(),
                liquidator_bonus: plan.liquidator_bonus,
                lender_share: plan.lender_share,
                borrower_refund: plan.borrower_refund,
            },
        );
        self.emit_reputation_change(&change, now);
        Ok(receipt)
    }

    /// Lender claims the collateral of a loan overdue past the grace period
    pub fn declare_default(
        &mut self,
        caller: &Address,
        loan_id: LoanId,
        now: BlockNumber,
    ) -> Result<DefaultReceipt, MarketError> {
        self.ensure_not_paused()?;
        let loan = self.active_loan(loan_id)?;
        if caller != &loan.lender {
            return Err(MarketError::NotLender {
                caller: caller.clone(),
                loan_id,
            });
        }
        let eligible_after = loan.end_block.saturating_add(self.config.default_grace_blocks);
        if now <= eligible_after {
            return Err(MarketError::LoanNotYetDue {
                loan_id,
                eligible_after,
            });
        }
        let outstanding_debt = self.evaluator().current_debt(&loan.position(), now)?;
        let borrower = loan.borrower.clone();
        let receipt = DefaultReceipt {
            loan_id,
            lender: loan.lender.clone(),
            collateral_seized: loan.collateral,
            outstanding_debt,
        };

        let mut history = self.user_loan_history(&borrower);
        history.record_default(now);
        let change = self.reputation.refresh(&self.ledger, &borrower, &history, now)?;

        // Commit
        self.histories.insert(borrower, history);
        self.close_loan(loan_id, LoanStatus::Defaulted, 0, now);
        warn!(loan_id, lender = %caller, "Loan defaulted");
        self.emit(
            now,
            MarketEvent::LoanDefaulted {
                loan_id,
                collateral_seized: receipt.collateral_seized,
            },
        );
        self.emit_reputation_change(&change, now);
        Ok(receipt)
    }

    fn active_loan(&self, loan_id: LoanId) -> Result<&Loan, MarketError> {
        let loan = self
            .loans
            .get(&loan_id)
            .ok_or(MarketError::LoanNotFound(loan_id))?;
        if !loan.is_active() {
            return Err(MarketError::LoanNotActive {
                id: loan_id,
                status: loan.status,
            });
        }
        Ok(loan)
    }

    fn close_loan(&mut self, loan_id: LoanId, status: LoanStatus, repaid: u128, now: BlockNumber) {
        if let Some(loan) = self.loans.get_mut(&loan_id) {
            loan.status = status;
            loan.repaid_amount = repaid;
            loan.closed_block = Some(now);
            self.collateral_escrow = self.collateral_escrow.saturating_sub(loan.collateral);
        }
    }

    // === Reputation administration ===

    pub fn mint_reputation(
        &mut self,
        caller: &Address,
        holder: &Address,
        now: BlockNumber,
    ) -> Result<ReputationRecord, MarketError> {
        self.ensure_owner(caller, "mint reputation")?;
        let record = self.reputation.mint(caller, holder, now)?.clone();
        self.emit_minted(holder, now);
        Ok(record)
    }

    pub fn update_reputation(
        &mut self,
        caller: &Address,
        holder: &Address,
        score: u32,
        tier: Tier,
        now: BlockNumber,
    ) -> Result<ReputationRecord, MarketError> {
        self.ensure_owner(caller, "update reputation")?;
        let old_score = self.reputation.score_of(holder);
        let record = self
            .reputation
            .update(caller, holder, score, tier, now)?
            .clone();
        self.emit(
            now,
            MarketEvent::ReputationUpdated {
                holder: holder.clone(),
                old_score,
                new_score: score,
                tier,
            },
        );
        Ok(record)
    }

    pub fn burn_reputation(
        &mut self,
        caller: &Address,
        holder: &Address,
        now: BlockNumber,
    ) -> Result<ReputationRecord, MarketError> {
        self.ensure_owner(caller, "burn reputation")?;
        let record = self.reputation.burn(caller, holder)?;
        self.emit(
            now,
            MarketEvent::ReputationBurned {
                holder: holder.clone(),
                token_id: record.token_id,
            },
        );
        Ok(record)
    }

    fn emit_minted(&mut self, holder: &Address, now: BlockNumber) {
        if let Some(token_id) = self.reputation.get(holder).map(|r| r.token_id) {
            self.emit(
                now,
                MarketEvent::ReputationMinted {
                    holder: holder.clone(),
                    token_id,
                },
            );
        }
    }

    fn emit_reputation_change(&mut self, change: &ReputationChange, now: BlockNumber) {
        if change.minted {
            self.emit_minted(&change.owner, now);
        }
        if change.old_score != change.new_score || change.minted {
            self.emit(
                now,
                MarketEvent::ReputationUpdated {
                    holder: change.owner.clone(),
                    old_score: change.old_score,
                    new_score: change.new_score,
                    tier: change.new_tier,
                },
            );
        }
    }

    // === Read-only queries ===

    pub fn get_offer(&self, offer_id: OfferId) -> Option<&LendingOffer> {
        self.offers.get(&offer_id)
    }

    pub fn get_request(&self, request_id: RequestId) -> Option<&BorrowRequest> {
        self.requests.get(&request_id)
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.get(&loan_id)
    }

    pub fn open_offers(&self) -> impl Iterator<Item = &LendingOffer> + '_ {
        self.offers
            .values()
            .filter(|o| o.status == ListingStatus::Open)
    }

    pub fn open_requests(&self) -> impl Iterator<Item = &BorrowRequest> + '_ {
        self.requests
            .values()
            .filter(|r| r.status == ListingStatus::Open)
    }

    pub fn active_loans(&self) -> impl Iterator<Item = &Loan> + '_ {
        self.loans.values().filter(|l| l.is_active())
    }

    /// Loans where `address` is lender or borrower
    pub fn loans_of<'a>(&'a self, address: &'a Address) -> impl Iterator<Item = &'a Loan> + 'a {
        self.loans
            .values()
            .filter(move |l| &l.lender == address || &l.borrower == address)
    }

    pub fn user_loan_history(&self, address: &Address) -> LoanHistory {
        self.histories.get(address).cloned().unwrap_or_default()
    }

    /// Score implied by the address's history right now
    pub fn calculate_reputation_score(&self, address: &Address, now: BlockNumber) -> u32 {
        calculate_score(&self.user_loan_history(address), now)
    }

    pub fn get_reputation(&self, address: &Address) -> Option<&ReputationRecord> {
        self.reputation.get(address)
    }

    pub fn has_reputation(&self, address: &Address) -> bool {
        self.reputation.has_reputation(address)
    }

    pub fn discount_for(&self, address: &Address) -> u32 {
        self.reputation.tier_of(address).discount_bps()
    }

    /// `apr_bps` after the address's tier discount
    pub fn discounted_apr(&self, address: &Address, apr_bps: u32) -> u32 {
        discount_apr(apr_bps, self.reputation.tier_of(address))
    }

    /// Health of a loan at the current (not necessarily fresh) oracle price
    pub fn loan_health(&self, loan_id: LoanId, now: BlockNumber) -> Result<LoanHealth, MarketError> {
        let loan = self
            .loans
            .get(&loan_id)
            .ok_or(MarketError::LoanNotFound(loan_id))?;
        let price = self.oracle.get_price()?;
        Ok(self.evaluator().evaluate(&loan.position(), price, now)?)
    }

    pub fn get_loan_health_factor(
        &self,
        loan_id: LoanId,
        now: BlockNumber,
    ) -> Result<Option<Decimal>, MarketError> {
        Ok(self.loan_health(loan_id, now)?.health_factor)
    }

    pub fn is_loan_liquidatable(&self, loan_id: LoanId, now: BlockNumber) -> Result<bool, MarketError> {
        let loan = self
            .loans
            .get(&loan_id)
            .ok_or(MarketError::LoanNotFound(loan_id))?;
        if !loan.is_active() {
            return Ok(false);
        }
        Ok(self.loan_health(loan_id, now)?.liquidatable)
    }

    /// Principal plus interest accrued up to `now`
    pub fn get_loan_current_debt(&self, loan_id: LoanId, now: BlockNumber) -> Result<u128, MarketError> {
        let loan = self
            .loans
            .get(&loan_id)
            .ok_or(MarketError::LoanNotFound(loan_id))?;
        Ok(self.evaluator().current_debt(&loan.position(), now)?)
    }
}

fn validate_amount(amount: u128) -> Result<(), MarketError> {
    if amount == 0 || amount > MAX_LOAN_AMOUNT {
        return Err(MarketError::InvalidAmount(amount));
    }
    Ok(())
}

fn validate_apr(apr_bps: u32) -> Result<(), MarketError> {
    if apr_bps > MAX_APR_BPS {
        return Err(MarketError::InvalidApr(apr_bps));
    }
    Ok(())
}

fn validate_duration(blocks: u64) -> Result<(), MarketError> {
    if blocks == 0 || blocks > MAX_DURATION_BLOCKS {
        return Err(MarketError::InvalidDuration(blocks));
    }
    Ok(())
}

fn discount_apr(apr_bps: u32, tier: Tier) -> u32 {
    let discount = tier.discount_bps().min(BPS_DENOMINATOR as u32);
    ((apr_bps as u128 * (BPS_DENOMINATOR - discount as u128)) / BPS_DENOMINATOR) as u32
}
