//! PeerLend Risk Engine
//!
//! Side-effect free loan math shared by the marketplace ledger and read-only
//! monitoring: linear block-denominated interest, health factor and the
//! collateral split of a liquidation.

pub mod error;
pub mod interest;
pub mod liquidation;

pub use error::RiskError;
pub use interest::InterestModel;
pub use liquidation::{LiquidationConfig, LiquidationEvaluator, LiquidationPlan, LoanHealth, LoanPosition};
