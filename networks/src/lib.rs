//! Network registry for chainvote.
//!
//! A static table of the chains the poll contract is deployed on. The sync
//! engine consults it every time the wallet reports a chain id; anything not
//! listed here gates all ledger traffic until the user switches.

pub mod builtin;
pub mod error;
pub mod registry;

pub use builtin::{LISK_MAINNET, LISK_SEPOLIA};
pub use error::RegistryError;
pub use registry::{NetworkRegistry, NetworkStatus};
