use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("config error: {0}")]
    Config(String),

    #[error("network registry error: {0}")]
    Registry(#[from] chainvote_networks::RegistryError),

    #[error("rpc error: {0}")]
    Rpc(#[from] chainvote_rpc::RpcError),

    #[error("wallet error: {0}")]
    Provider(#[from] chainvote_wallet_core::ProviderError),

    #[error("ledger error: {0}")]
    Ledger(#[from] chainvote_ledger::LedgerError),

    #[error("logging already initialised: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
