use chainvote_types::ChainId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry has no networks")]
    Empty,

    #[error("chain {0} listed more than once")]
    Duplicate(ChainId),

    #[error("default chain {0} is not in the registry")]
    UnknownDefault(ChainId),
}
