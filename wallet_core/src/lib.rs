//! Wallet core library for chainvote.
//!
//! Provides everything the sync engine needs from a wallet:
//! - The provider boundary ([`WalletProvider`]) and its push events
//! - An HTTP provider for nodes with unlocked accounts
//! - Session state with change notification ([`SessionManager`])
//! - Network switching with the add-chain fallback

pub mod error;
pub mod http;
pub mod provider;
pub mod session;
pub mod switch;

pub use error::ProviderError;
pub use http::{add_chain_params, HttpWalletProvider};
pub use provider::{ProviderEvent, Subscribers, Subscription, SubscriptionId, WalletProvider};
pub use session::{SessionManager, Signer, WalletSession};
pub use switch::{switch_network, SwitchOutcome};
