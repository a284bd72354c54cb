//! PeerLend CLI - Main entry point

use clap::{Args, Parser, Subcommand};
use peerlend_core::{Address, BlockNumber};
use peerlend_rpc::{commands, AppContext, CallContext};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "peerlend")]
#[command(about = "PeerLend - P2P collateralized lending marketplace", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data", env = "PEERLEND_DATA")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Caller identity and current block, supplied by the environment
#[derive(Args, Clone)]
struct Call {
    /// Address of the caller
    #[arg(long, env = "PEERLEND_CALLER")]
    caller: String,

    /// Current block number
    #[arg(long, env = "PEERLEND_BLOCK")]
    block: BlockNumber,
}

impl Call {
    fn resolve(&self) -> anyhow::Result<CallContext> {
        Ok(CallContext {
            caller: Address::new(&self.caller)?,
            block: self.block,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the marketplace
    Init {
        /// Administrator of oracle, reputation and pause switch
        #[arg(long)]
        owner: String,
    },

    /// Publish a collateral price in USD (admin)
    SetPrice {
        price: Decimal,
        #[command(flatten)]
        call: Call,
    },

    /// Post a lending offer
    CreateOffer {
        /// Amount in USD
        amount: Decimal,
        #[arg(long)]
        apr_bps: u32,
        #[arg(long)]
        max_duration: u64,
        #[arg(long, default_value = "0")]
        min_reputation: u32,
        #[arg(long, default_value = "15000")]
        min_collateral_ratio: u32,
        #[command(flatten)]
        call: Call,
    },

    /// Post a borrow request, escrowing collateral
    CreateRequest {
        /// Amount in USD
        amount: Decimal,
        #[arg(long)]
        max_apr_bps: u32,
        #[arg(long)]
        duration: u64,
        /// Collateral in whole units
        #[arg(long)]
        collateral: Decimal,
        #[command(flatten)]
        call: Call,
    },

    CancelOffer {
        id: u64,
        #[command(flatten)]
        call: Call,
    },

    CancelRequest {
        id: u64,
        #[command(flatten)]
        call: Call,
    },

    /// Match an offer with a request into a loan
    Match {
        offer: u64,
        request: u64,
        #[command(flatten)]
        call: Call,
    },

    Repay {
        loan: u64,
        #[command(flatten)]
        call: Call,
    },

    Liquidate {
        loan: u64,
        #[command(flatten)]
        call: Call,
    },

    /// Claim collateral of a loan overdue past the grace period
    Default {
        loan: u64,
        #[command(flatten)]
        call: Call,
    },

    Pause {
        #[command(flatten)]
        call: Call,
    },

    Unpause {
        #[command(flatten)]
        call: Call,
    },

    MintReputation {
        holder: String,
        #[command(flatten)]
        call: Call,
    },

    UpdateReputation {
        holder: String,
        score: u32,
        /// bronze, silver or gold
        tier: String,
        #[command(flatten)]
        call: Call,
    },

    BurnReputation {
        holder: String,
        #[command(flatten)]
        call: Call,
    },

    // === Queries ===

    Offer { id: u64 },
    Request { id: u64 },
    Loan { id: u64 },

    /// List open offers
    Offers,

    /// List open requests
    Requests,

    /// List active loans, or every loan of an address
    Loans {
        #[arg(long)]
        address: Option<String>,
    },

    /// Show health factor of a loan
    Health {
        loan: u64,
        #[arg(long)]
        block: BlockNumber,
    },

    /// Show current debt of a loan
    Debt {
        loan: u64,
        #[arg(long)]
        block: BlockNumber,
    },

    /// Show loan history counters of an address
    History { address: String },

    /// Show reputation record and computed score
    Reputation {
        address: String,
        #[arg(long)]
        block: BlockNumber,
    },

    /// Print the effective configuration
    ShowConfig,

    /// Audit the journal (verify hash chain)
    Audit,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let mut ctx = AppContext::open(&cli.data)?;

    match cli.command {
        Commands::Init { owner } => commands::init(&mut ctx, &owner)?,

        Commands::SetPrice { price, call } => commands::set_price(&mut ctx, &call.resolve()?, price)?,

        Commands::CreateOffer {
            amount,
            apr_bps,
            max_duration,
            min_reputation,
            min_collateral_ratio,
            call,
        } => commands::create_offer(
            &mut ctx,
            &call.resolve()?,
            amount,
            apr_bps,
            max_duration,
            min_reputation,
            min_collateral_ratio,
        )?,

        Commands::CreateRequest {
            amount,
            max_apr_bps,
            duration,
            collateral,
            call,
        } => commands::create_request(
            &mut ctx,
            &call.resolve()?,
            amount,
            max_apr_bps,
            duration,
            collateral,
        )?,

        Commands::CancelOffer { id, call } => commands::cancel_offer(&mut ctx, &call.resolve()?, id)?,
        Commands::CancelRequest { id, call } => {
            commands::cancel_request(&mut ctx, &call.resolve()?, id)?
        }
        Commands::Match {
            offer,
            request,
            call,
        } => commands::match_loan(&mut ctx, &call.resolve()?, offer, request)?,
        Commands::Repay { loan, call } => commands::repay(&mut ctx, &call.resolve()?, loan)?,
        Commands::Liquidate { loan, call } => commands::liquidate(&mut ctx, &call.resolve()?, loan)?,
        Commands::Default { loan, call } => {
            commands::declare_default(&mut ctx, &call.resolve()?, loan)?
        }
        Commands::Pause { call } => commands::pause(&mut ctx, &call.resolve()?)?,
        Commands::Unpause { call } => commands::unpause(&mut ctx, &call.resolve()?)?,
        Commands::MintReputation { holder, call } => {
            commands::mint_reputation(&mut ctx, &call.resolve()?, &holder)?
        }
        Commands::UpdateReputation {
            holder,
            score,
            tier,
            call,
        } => commands::update_reputation(&mut ctx, &call.resolve()?, &holder, score, &tier)?,
        Commands::BurnReputation { holder, call } => {
            commands::burn_reputation(&mut ctx, &call.resolve()?, &holder)?
        }

        Commands::Offer { id } => commands::show_offer(&ctx, id)?,
        Commands::Request { id } => commands::show_request(&ctx, id)?,
        Commands::Loan { id } => commands::show_loan(&ctx, id)?,
        Commands::Offers => commands::list_offers(&ctx)?,
        Commands::Requests => commands::list_requests(&ctx)?,
        Commands::Loans { address } => commands::list_loans(&ctx, address.as_deref())?,
        Commands::Health { loan, block } => commands::health(&ctx, loan, block)?,
        Commands::Debt { loan, block } => commands::debt(&ctx, loan, block)?,
        Commands::History { address } => commands::history(&ctx, &address)?,
        Commands::Reputation { address, block } => commands::reputation(&ctx, &address, block)?,
        Commands::ShowConfig => commands::show_config(&ctx)?,

        Commands::Audit => match commands::audit(&ctx) {
            Ok(count) => println!("✅ Hash chain verified ({} records)", count),
            Err(e) => {
                println!("❌ Journal audit failed: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
