//! Risk engine errors

use peerlend_oracle::OracleError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),

    #[error("Valuation failed: {0}")]
    Oracle(#[from] OracleError),
}
