//! Journal errors

use thiserror::Error;

use crate::chain::ChainError;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt journal line {line} in {file}: {source}")]
    CorruptLine {
        file: String,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Chain verification failed: {0}")]
    Chain(#[from] ChainError),
}
