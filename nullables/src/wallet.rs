//! Nullable wallet provider: a scriptable browser wallet.

use async_trait::async_trait;
use chainvote_types::{Address, ChainId, NetworkDescriptor};
use chainvote_wallet_core::{ProviderError, ProviderEvent, Subscribers, Subscription, SubscriptionId, WalletProvider};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A request the wallet received.
#[derive(Clone, Debug, PartialEq)]
pub enum WalletCall {
    RequestAccounts,
    Accounts,
    ChainId,
    SwitchChain(ChainId),
    AddChain(NetworkDescriptor),
}

struct WalletState {
    accounts: Vec<Address>,
    authorized: bool,
    chain_id: ChainId,
    known_chains: HashSet<ChainId>,
    connect_error: Option<ProviderError>,
    switch_error: Option<ProviderError>,
    add_error: Option<ProviderError>,
    calls: Vec<WalletCall>,
}

/// A wallet that behaves like a browser extension without any UI.
///
/// It knows the chain it starts on plus any chains added later. Switching
/// to an unknown chain fails with [`ProviderError::UnrecognizedChain`];
/// adding a chain also selects it. Errors injected with the `fail_*`
/// methods persist until cleared.
pub struct NullWalletProvider {
    state: Mutex<WalletState>,
    subscribers: Subscribers,
}

impl NullWalletProvider {
    pub fn new(account: Address, chain_id: ChainId) -> Self {
        Self {
            state: Mutex::new(WalletState {
                accounts: vec![account],
                authorized: false,
                chain_id,
                known_chains: HashSet::from([chain_id]),
                connect_error: None,
                switch_error: None,
                add_error: None,
                calls: Vec::new(),
            }),
            subscribers: Subscribers::new(),
        }
    }

    /// The user already granted access in an earlier visit.
    pub fn authorized(self) -> Self {
        self.lock().authorized = true;
        self
    }

    /// Make `chain_id` known so switching to it succeeds directly.
    pub fn know_chain(&self, chain_id: ChainId) {
        self.lock().known_chains.insert(chain_id);
    }

    pub fn fail_connect(&self, error: Option<ProviderError>) {
        self.lock().connect_error = error;
    }

    pub fn fail_switch(&self, error: Option<ProviderError>) {
        self.lock().switch_error = error;
    }

    pub fn fail_add(&self, error: Option<ProviderError>) {
        self.lock().add_error = error;
    }

    pub fn current_chain(&self) -> ChainId {
        self.lock().chain_id
    }

    /// The user picked another account in the wallet.
    pub fn select_account(&self, account: Address) {
        let accounts = {
            let mut state = self.lock();
            state.accounts = vec![account];
            state.accounts.clone()
        };
        self.subscribers.emit(&ProviderEvent::AccountsChanged(accounts));
    }

    /// The user moved the wallet to another chain on their own.
    pub fn select_chain(&self, chain_id: ChainId) {
        {
            let mut state = self.lock();
            state.chain_id = chain_id;
            state.known_chains.insert(chain_id);
        }
        self.subscribers.emit(&ProviderEvent::ChainChanged(chain_id.to_hex()));
    }

    /// The user locked the wallet: no accounts exposed any more.
    pub fn lock_wallet(&self) {
        {
            let mut state = self.lock();
            state.authorized = false;
        }
        self.subscribers.emit(&ProviderEvent::AccountsChanged(Vec::new()));
    }

    /// Deliver a raw event, e.g. a malformed one.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        self.subscribers.emit(&event)
    }

    /// All requests received (for assertions).
    pub fn calls(&self) -> Vec<WalletCall> {
        self.lock().calls.clone()
    }

    /// Descriptors passed to `wallet_addEthereumChain`.
    pub fn add_chain_requests(&self) -> Vec<NetworkDescriptor> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                WalletCall::AddChain(network) => Some(network),
                _ => None,
            })
            .collect()
    }

    pub fn switch_requests(&self) -> Vec<ChainId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                WalletCall::SwitchChain(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: WalletCall) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl WalletProvider for NullWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.lock();
        state.calls.push(WalletCall::RequestAccounts);
        if let Some(error) = state.connect_error.clone() {
            return Err(error);
        }
        state.authorized = true;
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.lock();
        state.calls.push(WalletCall::Accounts);
        Ok(if state.authorized {
            state.accounts.clone()
        } else {
            Vec::new()
        })
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let mut state = self.lock();
        state.calls.push(WalletCall::ChainId);
        Ok(state.chain_id)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ProviderError> {
        self.record(WalletCall::SwitchChain(chain_id));
        {
            let mut state = self.lock();
            if let Some(error) = state.switch_error.clone() {
                return Err(error);
            }
            if !state.known_chains.contains(&chain_id) {
                return Err(ProviderError::UnrecognizedChain);
            }
            if state.chain_id == chain_id {
                return Ok(());
            }
            state.chain_id = chain_id;
        }
        self.subscribers.emit(&ProviderEvent::ChainChanged(chain_id.to_hex()));
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        self.record(WalletCall::AddChain(network.clone()));
        {
            let mut state = self.lock();
            if let Some(error) = state.add_error.clone() {
                return Err(error);
            }
            state.known_chains.insert(network.chain_id);
            state.chain_id = network.chain_id;
        }
        self.subscribers.emit(&ProviderEvent::ChainChanged(network.chain_id.to_hex()));
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.unsubscribe(id);
    }
}
