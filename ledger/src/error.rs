use chainvote_rpc::{codes, RpcError};
use chainvote_types::{Address, ChainId};
use thiserror::Error;

use crate::abi::AbiError;

/// Failures of ledger calls, split into the kinds callers branch on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("user rejected the transaction")]
    UserRejected,

    #[error("insufficient funds for gas: {0}")]
    InsufficientFunds(String),

    /// No contract configured for the chain, or no code at the address.
    #[error("poll contract not deployed on chain {chain_id}{}", contract.map(|a| format!(" at {a}")).unwrap_or_default())]
    NotDeployed {
        chain_id: ChainId,
        contract: Option<Address>,
    },

    #[error("transaction reverted{}", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Reverted {
        tx_hash: Option<String>,
        reason: Option<String>,
    },

    #[error("node error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl LedgerError {
    /// Failures caused by the user's own decision or balance, as opposed to
    /// node or network trouble.
    pub fn is_user_side(&self) -> bool {
        matches!(self, Self::UserRejected | Self::InsufficientFunds(_))
    }
}

impl From<RpcError> for LedgerError {
    fn from(e: RpcError) -> Self {
        if e.is_user_rejected() {
            return Self::UserRejected;
        }
        if e.is_insufficient_funds() {
            return Self::InsufficientFunds(e.message());
        }
        match e {
            RpcError::Remote { code, message, .. } => {
                if code == codes::EXECUTION_REVERTED || message.contains("execution reverted") {
                    Self::Reverted {
                        tx_hash: None,
                        reason: Some(message),
                    }
                } else {
                    Self::Rpc { code, message }
                }
            }
            RpcError::InvalidResponse(msg) => Self::Decode(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<AbiError> for LedgerError {
    fn from(e: AbiError) -> Self {
        Self::Decode(e.to_string())
    }
}
