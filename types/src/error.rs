//! Error type for malformed primitive values.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("poll {id} violates an invariant: {reason}")]
    InvalidPoll { id: u64, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
