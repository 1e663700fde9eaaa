//! Ledger client for chainvote.
//!
//! The poll contract is the authoritative store. This crate wraps its fixed
//! interface behind [`PollLedger`], binds one instance per signer and chain
//! through [`LedgerBinder`], and speaks the contract ABI over JSON-RPC in
//! [`ContractClient`].

pub mod abi;
pub mod client;
pub mod contract;
pub mod error;
pub mod events;
pub mod ledger;
pub mod paging;
pub mod tx;

pub use client::{ContractClient, RpcLedgerBinder, DEFAULT_RECEIPT_POLL_INTERVAL};
pub use contract::PollAbi;
pub use error::LedgerError;
pub use events::{EventBus, LedgerEvent, Log};
pub use ledger::{LedgerBinder, PollLedger};
pub use tx::{PendingTx, Receipt, TxHash};
