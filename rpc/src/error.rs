//! JSON-RPC error types.

use thiserror::Error;

use crate::codes;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RpcError {
    /// The remote side answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("node returned HTTP {0}")]
    Http(u16),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code() == Some(codes::USER_REJECTED)
            || self.message().to_ascii_lowercase().contains("user rejected")
            || self.message().to_ascii_lowercase().contains("user denied")
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.message().to_ascii_lowercase().contains("insufficient funds")
    }
}
