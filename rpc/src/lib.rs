//! JSON-RPC client for chainvote.
//!
//! Both the wallet provider (account and chain management) and the ledger
//! client (contract calls, transaction receipts) speak Ethereum JSON-RPC.
//! They share the [`Transport`] seam defined here so tests can script
//! responses without a node.

pub mod client;
pub mod codes;
pub mod error;
pub mod transport;

pub use client::RpcClient;
pub use error::RpcError;
pub use transport::Transport;
