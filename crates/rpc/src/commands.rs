//! CLI commands
//!
//! Amounts arrive as decimals in whole units and are converted to the
//! integer units the ledger works in.

use anyhow::Context;
use peerlend_core::units::{
    collateral_from_decimal, collateral_to_decimal, price_from_decimal, usd_from_decimal,
    usd_to_decimal,
};
use peerlend_core::{Address, BlockNumber};
use peerlend_events::EventReader;
use peerlend_market::{OfferTerms, RequestTerms};
use peerlend_reputation::Tier;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::context::AppContext;

/// Who is calling and at which block; supplied by the environment
#[derive(Debug, Clone)]
pub struct CallContext {
    pub caller: Address,
    pub block: BlockNumber,
}

fn usd(value: Decimal) -> anyhow::Result<u128> {
    usd_from_decimal(value).with_context(|| format!("Invalid USD amount: {}", value))
}

fn collateral(value: Decimal) -> anyhow::Result<u128> {
    collateral_from_decimal(value).with_context(|| format!("Invalid collateral amount: {}", value))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn init(ctx: &mut AppContext, owner: &str) -> anyhow::Result<()> {
    let owner = Address::new(owner)?;
    ctx.init(owner.clone())?;
    println!("✅ Marketplace initialized (owner: {})", owner);
    Ok(())
}

pub fn set_price(ctx: &mut AppContext, call: &CallContext, price: Decimal) -> anyhow::Result<()> {
    let units = price_from_decimal(price).with_context(|| format!("Invalid price: {}", price))?;
    ctx.commit(|m| m.set_oracle_price(&call.caller, units, call.block))?;
    println!("✅ Price set to {} USD at block {}", price, call.block);
    Ok(())
}

pub fn create_offer(
    ctx: &mut AppContext,
    call: &CallContext,
    amount: Decimal,
    apr_bps: u32,
    max_duration_blocks: u64,
    min_reputation: u32,
    min_collateral_ratio_bps: u32,
) -> anyhow::Result<()> {
    let terms = OfferTerms {
        amount: usd(amount)?,
        apr_bps,
        max_duration_blocks,
        min_reputation,
        min_collateral_ratio_bps,
    };
    let (id, _) = ctx.commit(|m| m.create_lending_offer(&call.caller, terms, call.block))?;
    println!("✅ Offer #{} created: {} USD at {} bps", id, amount, apr_bps);
    Ok(())
}

pub fn create_request(
    ctx: &mut AppContext,
    call: &CallContext,
    amount: Decimal,
    max_apr_bps: u32,
    duration_blocks: u64,
    collateral_amount: Decimal,
) -> anyhow::Result<()> {
    let terms = RequestTerms {
        amount: usd(amount)?,
        max_apr_bps,
        duration_blocks,
        collateral: collateral(collateral_amount)?,
    };
    let (id, _) = ctx.commit(|m| m.create_borrow_request(&call.caller, terms, call.block))?;
    println!(
        "✅ Request #{} created: {} USD against {} collateral",
        id, amount, collateral_amount
    );
    Ok(())
}

pub fn cancel_offer(ctx: &mut AppContext, call: &CallContext, id: u64) -> anyhow::Result<()> {
    ctx.commit(|m| m.cancel_lending_offer(&call.caller, id, call.block))?;
    println!("✅ Offer #{} cancelled", id);
    Ok(())
}

pub fn cancel_request(ctx: &mut AppContext, call: &CallContext, id: u64) -> anyhow::Result<()> {
    let (released, _) = ctx.commit(|m| m.cancel_borrow_request(&call.caller, id, call.block))?;
    println!(
        "✅ Request #{} cancelled, {} collateral released",
        id,
        collateral_to_decimal(released)
    );
    Ok(())
}

pub fn match_loan(
    ctx: &mut AppContext,
    call: &CallContext,
    offer_id: u64,
    request_id: u64,
) -> anyhow::Result<()> {
    let (loan_id, records) =
        ctx.commit(|m| m.match_offer_to_request(&call.caller, offer_id, request_id, call.block))?;
    println!(
        "✅ Loan #{} created from offer #{} and request #{} (journal seq: {})",
        loan_id,
        offer_id,
        request_id,
        records.first().map_or(0, |r| r.sequence)
    );
    Ok(())
}

pub fn repay(ctx: &mut AppContext, call: &CallContext, loan_id: u64) -> anyhow::Result<()> {
    let (receipt, _) = ctx.commit(|m| m.repay_loan(&call.caller, loan_id, call.block))?;
    println!(
        "✅ Loan #{} repaid: {} USD ({} interest){}",
        loan_id,
        usd_to_decimal(receipt.total_owed),
        usd_to_decimal(receipt.interest),
        if receipt.on_time { "" } else { " [late]" }
    );
    Ok(())
}

pub fn liquidate(ctx: &mut AppContext, call: &CallContext, loan_id: u64) -> anyhow::Result<()> {
    let (receipt, _) = ctx.commit(|m| m.liquidate_loan(&call.caller, loan_id, call.block))?;
    println!("✅ Loan #{} liquidated", loan_id);
    println!("   Liquidator bonus: {}", collateral_to_decimal(receipt.liquidator_bonus));
    println!("   Lender share:     {}", collateral_to_decimal(receipt.lender_share));
    println!("   Borrower refund:  {}", collateral_to_decimal(receipt.borrower_refund));
    Ok(())
}

pub fn declare_default(ctx: &mut AppContext, call: &CallContext, loan_id: u64) -> anyhow::Result<()> {
    let (receipt, _) = ctx.commit(|m| m.declare_default(&call.caller, loan_id, call.block))?;
    println!(
        "✅ Loan #{} defaulted, {} collateral to {}",
        loan_id,
        collateral_to_decimal(receipt.collateral_seized),
        receipt.lender
    );
    Ok(())
}

pub fn pause(ctx: &mut AppContext, call: &CallContext) -> anyhow::Result<()> {
    ctx.commit(|m| m.pause(&call.caller, call.block))?;
    println!("⏸️  Protocol paused");
    Ok(())
}

pub fn unpause(ctx: &mut AppContext, call: &CallContext) -> anyhow::Result<()> {
    ctx.commit(|m| m.unpause(&call.caller, call.block))?;
    println!("▶️  Protocol unpaused");
    Ok(())
}

pub fn mint_reputation(ctx: &mut AppContext, call: &CallContext, holder: &str) -> anyhow::Result<()> {
    let holder = Address::new(holder)?;
    let (record, _) = ctx.commit(|m| m.mint_reputation(&call.caller, &holder, call.block))?;
    println!("✅ Reputation #{} minted for {}", record.token_id, holder);
    Ok(())
}

pub fn update_reputation(
    ctx: &mut AppContext,
    call: &CallContext,
    holder: &str,
    score: u32,
    tier: &str,
) -> anyhow::Result<()> {
    let holder = Address::new(holder)?;
    let tier: Tier = tier.parse().with_context(|| format!("Unknown tier: {}", tier))?;
    ctx.commit(|m| m.update_reputation(&call.caller, &holder, score, tier, call.block))?;
    println!("✅ Reputation of {} set to {} ({})", holder, score, tier);
    Ok(())
}

pub fn burn_reputation(ctx: &mut AppContext, call: &CallContext, holder: &str) -> anyhow::Result<()> {
    let holder = Address::new(holder)?;
    ctx.commit(|m| m.burn_reputation(&call.caller, &holder, call.block))?;
    println!("🔥 Reputation of {} burned", holder);
    Ok(())
}

// === Queries ===

pub fn show_offer(ctx: &AppContext, id: u64) -> anyhow::Result<()> {
    let offer = ctx.market()?.get_offer(id).with_context(|| format!("Offer not found: {}", id))?;
    print_json(offer)
}

pub fn show_request(ctx: &AppContext, id: u64) -> anyhow::Result<()> {
    let request = ctx
        .market()?
        .get_request(id)
        .with_context(|| format!("Request not found: {}", id))?;
    print_json(request)
}

pub fn show_loan(ctx: &AppContext, id: u64) -> anyhow::Result<()> {
    let loan = ctx.market()?.get_loan(id).with_context(|| format!("Loan not found: {}", id))?;
    print_json(loan)
}

pub fn list_offers(ctx: &AppContext) -> anyhow::Result<()> {
    let market = ctx.market()?;
    println!("{:<6} {:<16} {:>16} {:>8} {:>10}", "ID", "LENDER", "AMOUNT", "APR", "MIN RATIO");
    for o in market.open_offers() {
        println!(
            "{:<6} {:<16} {:>16} {:>8} {:>10}",
            o.id,
            o.lender,
            usd_to_decimal(o.amount),
            o.apr_bps,
            o.min_collateral_ratio_bps
        );
    }
    Ok(())
}

pub fn list_requests(ctx: &AppContext) -> anyhow::Result<()> {
    let market = ctx.market()?;
    println!("{:<6} {:<16} {:>16} {:>8} {:>14}", "ID", "BORROWER", "AMOUNT", "MAX APR", "COLLATERAL");
    for r in market.open_requests() {
        println!(
            "{:<6} {:<16} {:>16} {:>8} {:>14}",
            r.id,
            r.borrower,
            usd_to_decimal(r.amount),
            r.max_apr_bps,
            collateral_to_decimal(r.collateral)
        );
    }
    Ok(())
}

pub fn list_loans(ctx: &AppContext, address: Option<&str>) -> anyhow::Result<()> {
    let market = ctx.market()?;
    let loans: Vec<_> = match address {
        Some(a) => {
            let address = Address::new(a)?;
            market.loans_of(&address).cloned().collect()
        }
        None => market.active_loans().cloned().collect(),
    };
    print_json(&loans)
}

pub fn health(ctx: &AppContext, loan_id: u64, block: BlockNumber) -> anyhow::Result<()> {
    let health = ctx.market()?.loan_health(loan_id, block)?;
    println!("Loan #{} at block {}", loan_id, block);
    println!("   Debt:             {} USD", usd_to_decimal(health.current_debt));
    println!("   Collateral value: {} USD", usd_to_decimal(health.collateral_value));
    match health.health_factor {
        Some(hf) => println!("   Health factor:    {}%", hf),
        None => println!("   Health factor:    n/a"),
    }
    println!("   Liquidatable:     {}", health.liquidatable);
    Ok(())
}

pub fn debt(ctx: &AppContext, loan_id: u64, block: BlockNumber) -> anyhow::Result<()> {
    let debt = ctx.market()?.get_loan_current_debt(loan_id, block)?;
    println!("{} USD", usd_to_decimal(debt));
    Ok(())
}

pub fn history(ctx: &AppContext, address: &str) -> anyhow::Result<()> {
    let address = Address::new(address)?;
    print_json(&ctx.market()?.user_loan_history(&address))
}

pub fn reputation(ctx: &AppContext, address: &str, block: BlockNumber) -> anyhow::Result<()> {
    let address = Address::new(address)?;
    let market = ctx.market()?;
    match market.get_reputation(&address) {
        Some(record) => print_json(record)?,
        None => println!("No reputation record for {}", address),
    }
    println!(
        "Computed score at block {}: {} (discount {} bps)",
        block,
        market.calculate_reputation_score(&address, block),
        market.discount_for(&address)
    );
    Ok(())
}

pub fn show_config(ctx: &AppContext) -> anyhow::Result<()> {
    match ctx.market() {
        Ok(market) => print_json(market.config()),
        Err(_) => print_json(&ctx.load_config()?),
    }
}

/// Verify the journal hash chain
pub fn audit(ctx: &AppContext) -> anyhow::Result<usize> {
    let reader = EventReader::from_directory(ctx.journal_path())?;
    Ok(reader.verify()?)
}
