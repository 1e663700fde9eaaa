//! The wallet provider boundary.
//!
//! Mirrors the browser wallet API (EIP-1193): account access, chain
//! identification, chain switching, and two push notifications.

use async_trait::async_trait;
use chainvote_types::{Address, ChainId, NetworkDescriptor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::ProviderError;

/// Push notifications a wallet emits on its own schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The set of exposed accounts changed. Empty means the user locked or
    /// disconnected the wallet.
    AccountsChanged(Vec<Address>),
    /// The active chain changed. Carries the `0x`-prefixed hex id as sent.
    ChainChanged(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A registered event handler: events arrive on `events` until the
/// subscription is removed with [`WalletProvider::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<ProviderEvent>,
}

/// An external wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to expose accounts (`eth_requestAccounts`). May prompt.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Accounts already exposed to us (`eth_accounts`). Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// The wallet's active chain (`eth_chainId`).
    async fn chain_id(&self) -> Result<ChainId, ProviderError>;

    /// `wallet_switchEthereumChain`.
    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ProviderError>;

    /// `wallet_addEthereumChain` with the full descriptor.
    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError>;

    /// Register an event handler.
    fn subscribe(&self) -> Subscription;

    /// Remove a handler registered with [`subscribe`](Self::subscribe).
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Fan-out list of event handlers for provider implementations.
///
/// Delivery is non-blocking; handlers whose receiver was dropped are pruned
/// on the next emit.
pub struct Subscribers {
    next_id: AtomicU64,
    senders: Mutex<Vec<(SubscriptionId, mpsc::UnboundedSender<ProviderEvent>)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, tx));
        Subscription { id, events: rx }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(sid, _)| *sid != id);
    }

    /// Deliver `event` to every live handler. Returns how many received it.
    pub fn emit(&self, event: &ProviderEvent) -> usize {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        senders.len()
    }

    pub fn len(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Subscribers {
    fn default() -> Self {
        Self::new()
    }
}
