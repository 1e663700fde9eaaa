//! Built-in network table.

use chainvote_types::{ChainId, NativeCurrency, NetworkDescriptor};

/// Lisk mainnet.
pub const LISK_MAINNET: ChainId = ChainId::new(1135);

/// Lisk Sepolia testnet. The default network.
pub const LISK_SEPOLIA: ChainId = ChainId::new(4202);

pub(crate) fn lisk_mainnet() -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: LISK_MAINNET,
        name: "Lisk".into(),
        rpc_url: "https://rpc.api.lisk.com".into(),
        block_explorer: "https://blockscout.lisk.com".into(),
        native_currency: NativeCurrency {
            name: "Lisk".into(),
            symbol: "LSK".into(),
            decimals: 18,
        },
        poll_contract: None,
    }
}

pub(crate) fn lisk_sepolia() -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: LISK_SEPOLIA,
        name: "Lisk Sepolia Testnet".into(),
        rpc_url: "https://rpc.sepolia-api.lisk.com".into(),
        block_explorer: "https://sepolia-blockscout.lisk.com".into(),
        native_currency: NativeCurrency {
            name: "Sepolia Ether".into(),
            symbol: "ETH".into(),
            decimals: 18,
        },
        poll_contract: None,
    }
}
