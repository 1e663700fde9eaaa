use chainvote_rpc::{codes, RpcError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("no wallet provider available")]
    NoProvider,

    #[error("request rejected by user")]
    UserRejected,

    #[error("chain is not known to the wallet")]
    UnrecognizedChain,

    #[error("a request is already pending in the wallet")]
    RequestPending,

    #[error("wallet returned no accounts")]
    NoAccounts,

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("provider rpc error: {0}")]
    Rpc(RpcError),
}

impl From<RpcError> for ProviderError {
    fn from(e: RpcError) -> Self {
        match e.code() {
            Some(codes::USER_REJECTED) => ProviderError::UserRejected,
            Some(codes::UNRECOGNIZED_CHAIN) => ProviderError::UnrecognizedChain,
            Some(codes::REQUEST_PENDING) => ProviderError::RequestPending,
            _ if e.is_user_rejected() => ProviderError::UserRejected,
            _ => ProviderError::Rpc(e),
        }
    }
}
