//! Chain identifiers and static network descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, TypesError};

/// Numeric EVM chain identifier (EIP-155).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse the `0x`-prefixed hex form wallets use in `chainChanged`.
    /// A bare decimal string is accepted too.
    pub fn from_hex(raw: &str) -> Result<Self, TypesError> {
        let raw = raw.trim();
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(digits) => u64::from_str_radix(digits, 16),
            None => raw.parse::<u64>(),
        };
        parsed
            .map(Self)
            .map_err(|e| TypesError::InvalidChainId(format!("{raw}: {e}")))
    }

    /// `0x`-prefixed lowercase hex, no padding.
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Native gas currency metadata, as wallets expect it in `wallet_addEthereumChain`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Static configuration for one supported chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    pub block_explorer: String,
    pub native_currency: NativeCurrency,
    /// Address of the poll contract on this chain, if deployed.
    #[serde(default)]
    pub poll_contract: Option<Address>,
}

impl NetworkDescriptor {
    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.block_explorer.trim_end_matches('/'), tx_hash)
    }
}
