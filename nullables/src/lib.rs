//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator (clock, wallet provider, poll contract,
//! JSON-RPC endpoint) sits behind a trait. This crate provides
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Record what they were asked to do
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod ledger;
pub mod transport;
pub mod wallet;

pub use clock::NullClock;
pub use ledger::{LedgerCall, NullLedger, NullLedgerBinder};
pub use transport::NullTransport;
pub use wallet::{NullWalletProvider, WalletCall};
