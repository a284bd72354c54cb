//! End-to-end loan lifecycles through the Marketplace Ledger
//!
//! Standard setup: collateral priced at 60,000 USD, a 1,000 USD offer at
//! 8% APR requiring 150% collateral, and a request posting 0.025 units.

use peerlend_core::units::{PRICE_UNIT, USD_UNIT};
use peerlend_core::Address;
use peerlend_market::{
    ErrorKind, ListingStatus, LoanStatus, MarketConfig, MarketError, MarketEvent, Marketplace,
    OfferTerms, RequestTerms,
};
use peerlend_reputation::{age_bonus, Tier};
use rust_decimal_macros::dec;

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

struct Fixture {
    market: Marketplace,
    admin: Address,
    lender: Address,
    borrower: Address,
}

impl Fixture {
    fn new() -> Self {
        let admin = addr("ADMIN");
        let mut market = Marketplace::new(admin.clone(), MarketConfig::default());
        market
            .set_oracle_price(&admin, 60_000 * PRICE_UNIT, 1)
            .unwrap();
        Self {
            market,
            admin,
            lender: addr("LENDER"),
            borrower: addr("BORROWER"),
        }
    }

    fn post(&mut self, collateral: u128) -> (u64, u64) {
        let offer = self
            .market
            .create_lending_offer(
                &self.lender,
                OfferTerms {
                    amount: 1_000 * USD_UNIT,
                    apr_bps: 800,
                    max_duration_blocks: 90 * 144,
                    min_reputation: 0,
                    min_collateral_ratio_bps: 15_000,
                },
                1,
            )
            .unwrap();
        let request = self
            .market
            .create_borrow_request(
                &self.borrower,
                RequestTerms {
                    amount: 1_000 * USD_UNIT,
                    max_apr_bps: 1_000,
                    duration_blocks: 90 * 144,
                    collateral,
                },
                1,
            )
            .unwrap();
        (offer, request)
    }

    /// Post the standard pair and match it at block 2
    fn open_loan(&mut self) -> u64 {
        let (offer, request) = self.post(2_500_000);
        let borrower = self.borrower.clone();
        self.market
            .match_offer_to_request(&borrower, offer, request, 2)
            .unwrap()
    }
}

/// Scenario: matching produces a loan with the offer's terms
#[test]
fn test_match_creates_loan() {
    let mut f = Fixture::new();
    let (offer_id, request_id) = f.post(2_500_000);
    let lender = f.lender.clone();

    let loan_id = f
        .market
        .match_offer_to_request(&lender, offer_id, request_id, 2)
        .unwrap();

    let loan = f.market.get_loan(loan_id).unwrap();
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.principal, 1_000 * USD_UNIT);
    assert_eq!(loan.apr_bps, 800);
    assert_eq!(loan.collateral_ratio_bps, 15_000);
    assert_eq!(loan.start_block, 2);
    assert_eq!(loan.end_block, 2 + 90 * 144);
    assert_eq!(loan.lender, f.lender);
    assert_eq!(loan.borrower, f.borrower);

    assert_eq!(f.market.get_offer(offer_id).unwrap().status, ListingStatus::Matched);
    assert_eq!(f.market.get_request(request_id).unwrap().status, ListingStatus::Matched);
    assert_eq!(f.market.user_loan_history(&f.borrower).loans_taken, 1);
    assert_eq!(f.market.collateral_escrow(), 2_500_000);
    assert_eq!(f.market.active_loans().count(), 1);
    assert_eq!(f.market.loans_of(&f.lender).count(), 1);

    assert_eq!(
        f.market.get_loan_health_factor(loan_id, 2).unwrap(),
        Some(dec!(150.00))
    );
    assert!(!f.market.is_loan_liquidatable(loan_id, 2).unwrap());
}

/// Scenario: on-time repayment adds the repayment bonus
#[test]
fn test_repay_on_time() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let borrower = f.borrower.clone();

    // 1e9 * 800 * 5 / (10_000 * 52_560)
    assert_eq!(f.market.get_loan_current_debt(loan_id, 7).unwrap(), 1_000_007_610);

    let receipt = f.market.repay_loan(&borrower, loan_id, 7).unwrap();
    assert_eq!(receipt.interest, 7_610);
    assert_eq!(receipt.total_owed, 1_000_007_610);
    assert!(receipt.on_time);
    assert_eq!(receipt.collateral_released, 2_500_000);

    let loan = f.market.get_loan(loan_id).unwrap();
    assert_eq!(loan.status, LoanStatus::Repaid);
    assert_eq!(loan.repaid_amount, 1_000_007_610);
    assert_eq!(loan.closed_block, Some(7));

    let history = f.market.user_loan_history(&borrower);
    assert_eq!(history.loans_repaid, 1);
    assert_eq!(history.on_time_repayments, 1);
    assert_eq!(history.volume_repaid, 1_000_007_610);

    let record = f.market.get_reputation(&borrower).unwrap();
    assert_eq!(record.score, 350);
    assert_eq!(record.tier, Tier::Silver);
    assert_eq!(f.market.calculate_reputation_score(&borrower, 7), 350);
    assert_eq!(f.market.collateral_escrow(), 0);
}

#[test]
fn test_repay_only_by_borrower() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let lender = f.lender.clone();

    let err = f.market.repay_loan(&lender, loan_id, 5).unwrap_err();
    assert!(matches!(err, MarketError::NotBorrower { .. }));
    assert_eq!(f.market.get_loan(loan_id).unwrap().status, LoanStatus::Active);
}

#[test]
fn test_late_repayment_recorded() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let borrower = f.borrower.clone();
    let end = f.market.get_loan(loan_id).unwrap().end_block;

    let receipt = f.market.repay_loan(&borrower, loan_id, end + 1).unwrap();
    assert!(!receipt.on_time);
    assert_eq!(f.market.user_loan_history(&borrower).late_repayments, 1);
}

/// Scenario: price crash makes the loan liquidatable
#[test]
fn test_liquidation_after_price_drop() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let admin = f.admin.clone();
    let keeper = addr("KEEPER");

    f.market
        .set_oracle_price(&admin, 45_000 * PRICE_UNIT, 2)
        .unwrap();
    assert_eq!(
        f.market.get_loan_health_factor(loan_id, 2).unwrap(),
        Some(dec!(112.50))
    );
    assert!(f.market.is_loan_liquidatable(loan_id, 2).unwrap());

    let receipt = f.market.liquidate_loan(&keeper, loan_id, 2).unwrap();
    assert_eq!(receipt.liquidator, keeper);
    assert_eq!(receipt.current_debt, 1_000 * USD_UNIT);
    assert_eq!(receipt.liquidator_bonus, 125_000);
    // 1,000 USD at 45,000 USD per unit
    assert_eq!(receipt.lender_share, 2_222_222);
    assert_eq!(receipt.borrower_refund, 152_778);
    assert_eq!(
        receipt.liquidator_bonus + receipt.lender_share + receipt.borrower_refund,
        2_500_000
    );

    assert_eq!(f.market.get_loan(loan_id).unwrap().status, LoanStatus::Liquidated);
    assert_eq!(f.market.user_loan_history(&f.borrower).loans_liquidated, 1);
    assert_eq!(f.market.get_reputation(&f.borrower).unwrap().score, 0);
    assert!(!f.market.is_loan_liquidatable(loan_id, 2).unwrap());
}

#[test]
fn test_healthy_loan_cannot_be_liquidated() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();

    let err = f.market.liquidate_loan(&addr("KEEPER"), loan_id, 3).unwrap_err();
    match err {
        MarketError::NotLiquidatable {
            loan_id: id,
            health_factor,
        } => {
            assert_eq!(id, loan_id);
            assert!(health_factor.unwrap() > dec!(149));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(f.market.get_loan(loan_id).unwrap().status, LoanStatus::Active);
}

/// Scenario: collateral below the offer's minimum ratio
#[test]
fn test_insufficient_collateral_leaves_records_open() {
    let mut f = Fixture::new();
    let (offer_id, request_id) = f.post(2_000_000);
    let borrower = f.borrower.clone();

    let err = f
        .market
        .match_offer_to_request(&borrower, offer_id, request_id, 2)
        .unwrap_err();
    assert_eq!(
        err,
        MarketError::InsufficientCollateral {
            required_bps: 15_000,
            actual_bps: 12_000
        }
    );
    assert_eq!(err.kind(), ErrorKind::Matching);

    assert_eq!(f.market.get_offer(offer_id).unwrap().status, ListingStatus::Open);
    assert_eq!(f.market.get_request(request_id).unwrap().status, ListingStatus::Open);
    assert!(f.market.get_loan(1).is_none());
    assert_eq!(f.market.user_loan_history(&borrower).loans_taken, 0);
    assert_eq!(f.market.get_reputation(&borrower).unwrap().score, 300);
}

#[test]
fn test_double_match_rejected() {
    let mut f = Fixture::new();
    let (offer_id, request_id) = f.post(2_500_000);
    let lender = f.lender.clone();
    f.market
        .match_offer_to_request(&lender, offer_id, request_id, 2)
        .unwrap();

    let err = f
        .market
        .match_offer_to_request(&lender, offer_id, request_id, 3)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(f.market.active_loans().count(), 1);
}

#[test]
fn test_repay_twice_rejected() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let borrower = f.borrower.clone();
    f.market.repay_loan(&borrower, loan_id, 3).unwrap();

    let err = f.market.repay_loan(&borrower, loan_id, 4).unwrap_err();
    assert_eq!(
        err,
        MarketError::LoanNotActive {
            id: loan_id,
            status: LoanStatus::Repaid
        }
    );
    assert_eq!(f.market.user_loan_history(&borrower).loans_repaid, 1);
}

#[test]
fn test_created_offer_reads_back_identically() {
    let mut f = Fixture::new();
    let lender = f.lender.clone();
    let terms = OfferTerms {
        amount: 12_345 * USD_UNIT,
        apr_bps: 1_234,
        max_duration_blocks: 777,
        min_reputation: 450,
        min_collateral_ratio_bps: 13_500,
    };
    let id = f.market.create_lending_offer(&lender, terms.clone(), 9).unwrap();

    let offer = f.market.get_offer(id).unwrap();
    assert_eq!(offer.lender, lender);
    assert_eq!(offer.amount, terms.amount);
    assert_eq!(offer.apr_bps, terms.apr_bps);
    assert_eq!(offer.max_duration_blocks, terms.max_duration_blocks);
    assert_eq!(offer.min_reputation, terms.min_reputation);
    assert_eq!(offer.min_collateral_ratio_bps, terms.min_collateral_ratio_bps);
    assert_eq!(offer.created_block, 9);
    assert_eq!(offer.price_snapshot, 60_000 * PRICE_UNIT);
    assert_eq!(offer.status, ListingStatus::Open);
}

#[test]
fn test_declare_default_after_grace() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let lender = f.lender.clone();
    let end = f.market.get_loan(loan_id).unwrap().end_block;
    let eligible_after = end + 1_008;

    let borrower = f.borrower.clone();
    assert!(matches!(
        f.market.declare_default(&borrower, loan_id, eligible_after + 1),
        Err(MarketError::NotLender { .. })
    ));
    assert_eq!(
        f.market.declare_default(&lender, loan_id, eligible_after).unwrap_err(),
        MarketError::LoanNotYetDue {
            loan_id,
            eligible_after
        }
    );

    let now = eligible_after + 1;
    let receipt = f.market.declare_default(&lender, loan_id, now).unwrap();
    assert_eq!(receipt.collateral_seized, 2_500_000);
    assert!(receipt.outstanding_debt > 1_000 * USD_UNIT);

    assert_eq!(f.market.get_loan(loan_id).unwrap().status, LoanStatus::Defaulted);
    assert_eq!(f.market.user_loan_history(&borrower).loans_defaulted, 1);
    // Base score, minus one penalty, plus the age bonus
    assert_eq!(
        f.market.get_reputation(&borrower).unwrap().score,
        age_bonus(now - 2)
    );
}

#[test]
fn test_pause_allows_repayment_only() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let admin = f.admin.clone();
    let borrower = f.borrower.clone();
    f.market.pause(&admin, 3).unwrap();

    let err = f.market.liquidate_loan(&addr("KEEPER"), loan_id, 3).unwrap_err();
    assert_eq!(err, MarketError::ProtocolPaused);
    assert!(err.is_transient());

    f.market.repay_loan(&borrower, loan_id, 3).unwrap();
    assert_eq!(f.market.get_loan(loan_id).unwrap().status, LoanStatus::Repaid);
}

#[test]
fn test_lifecycle_events() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let borrower = f.borrower.clone();
    f.market.repay_loan(&borrower, loan_id, 4).unwrap();

    let names: Vec<_> = f
        .market
        .drain_events()
        .into_iter()
        .map(|e| e.event.name())
        .collect();
    assert_eq!(
        names,
        vec![
            "price_updated",
            "offer_created",
            "reputation_minted",
            "request_created",
            "loan_created",
            "loan_repaid",
            "reputation_updated",
        ]
    );
}

#[test]
fn test_repayment_event_carries_totals() {
    let mut f = Fixture::new();
    let loan_id = f.open_loan();
    let borrower = f.borrower.clone();
    f.market.drain_events();

    let receipt = f.market.repay_loan(&borrower, loan_id, 7).unwrap();
    let events = f.market.drain_events();
    assert_eq!(events[0].block, 7);
    assert_eq!(
        events[0].event,
        MarketEvent::LoanRepaid {
            loan_id,
            interest: receipt.interest,
            total_repaid: receipt.total_owed,
            on_time: true,
        }
    );
}
