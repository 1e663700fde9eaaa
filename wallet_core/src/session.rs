//! Wallet session state and its single owner.
//!
//! [`SessionManager`] is the only writer of [`WalletSession`]. Every mutation
//! is published on a `watch` channel so the sync engine and the presentation
//! layer re-derive their state immediately.

use chainvote_types::{Address, ChainId};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};

use crate::provider::{ProviderEvent, SubscriptionId, WalletProvider};
use crate::ProviderError;

/// Connection state as the rest of the app sees it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletSession {
    pub is_connected: bool,
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// Handle that can submit transactions for one account on one chain.
///
/// `generation` increases every time the account or chain behind the signer
/// changes, so holders can tell when a binding built on it is stale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signer {
    pub address: Address,
    pub chain_id: ChainId,
    pub generation: u64,
}

struct Inner {
    session: WalletSession,
    signer: Option<Signer>,
    generation: u64,
}

impl Inner {
    fn rebuild_signer(&mut self) {
        self.signer = match (self.session.is_connected, self.session.address, self.session.chain_id) {
            (true, Some(address), Some(chain_id)) => {
                self.generation += 1;
                Some(Signer {
                    address,
                    chain_id,
                    generation: self.generation,
                })
            }
            _ => None,
        };
    }
}

pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    inner: Mutex<Inner>,
    subscription: Mutex<Option<SubscriptionId>>,
    events: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<ProviderEvent>>>,
    published: watch::Sender<WalletSession>,
}

impl SessionManager {
    /// `provider` is `None` when no wallet is installed.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let (published, _) = watch::channel(WalletSession::disconnected());
        Self {
            provider,
            inner: Mutex::new(Inner {
                session: WalletSession::disconnected(),
                signer: None,
                generation: 0,
            }),
            subscription: Mutex::new(None),
            events: tokio::sync::Mutex::new(None),
            published,
        }
    }

    pub fn provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.provider.clone()
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn session(&self) -> WalletSession {
        self.lock_inner().session.clone()
    }

    pub fn signer(&self) -> Option<Signer> {
        self.lock_inner().signer.clone()
    }

    /// Receiver that observes every session change.
    pub fn watch(&self) -> watch::Receiver<WalletSession> {
        self.published.subscribe()
    }

    /// Register the account/chain handlers with the provider.
    ///
    /// Calling it again while attached is a no-op, so events are never
    /// delivered twice.
    pub fn attach(&self) {
        let Some(provider) = &self.provider else {
            return;
        };
        let mut subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if subscription.is_some() {
            return;
        }
        let sub = provider.subscribe();
        *subscription = Some(sub.id);
        match self.events.try_lock() {
            Ok(mut slot) => *slot = Some(sub.events),
            Err(_) => {
                // A reader is parked on the old receiver; it will see the
                // channel close once the old subscription is removed.
                tracing::warn!("event reader busy while attaching; dropping new subscription");
                provider.unsubscribe(sub.id);
                *subscription = None;
            }
        }
    }

    /// Deregister the handlers.
    pub fn detach(&self) {
        let id = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let (Some(id), Some(provider)) = (id, &self.provider) {
            provider.unsubscribe(id);
        }
        if let Ok(mut slot) = self.events.try_lock() {
            *slot = None;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Ask the wallet for account access and establish a signer.
    ///
    /// On any failure the session is left as it was.
    pub async fn connect(&self) -> Result<Signer, ProviderError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            tracing::warn!("no wallet provider installed");
            ProviderError::NoProvider
        })?;

        let accounts = provider.request_accounts().await.map_err(|e| {
            match &e {
                ProviderError::UserRejected => tracing::info!("user declined wallet connection"),
                other => tracing::error!(error = %other, "failed to connect wallet"),
            }
            e
        })?;
        let address = *accounts.first().ok_or(ProviderError::NoAccounts)?;
        let chain_id = provider.chain_id().await.map_err(|e| {
            tracing::error!(error = %e, "failed to read chain id while connecting");
            e
        })?;

        let signer = self.establish(address, chain_id);
        tracing::info!(%address, %chain_id, "wallet connected");
        Ok(signer)
    }

    /// Re-establish a session the wallet already authorised, without
    /// prompting. Failures are logged and leave the session disconnected.
    pub async fn restore(&self) -> Option<Signer> {
        let provider = self.provider.as_ref()?;
        let accounts = match provider.accounts().await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "failed to check existing wallet connection");
                return None;
            }
        };
        let address = *accounts.first()?;
        match provider.chain_id().await {
            Ok(chain_id) => {
                let signer = self.establish(address, chain_id);
                tracing::info!(%address, %chain_id, "restored wallet session");
                Some(signer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read chain id while restoring session");
                None
            }
        }
    }

    /// Clear the session and release the signer. No provider call is made.
    pub fn disconnect(&self) {
        {
            let mut inner = self.lock_inner();
            inner.session = WalletSession::disconnected();
            inner.signer = None;
        }
        tracing::info!("wallet disconnected");
        self.publish();
    }

    /// Re-read the provider's chain id and apply it if it moved.
    pub async fn refresh_chain(&self) -> Result<Option<ChainId>, ProviderError> {
        let provider = self.provider.as_ref().ok_or(ProviderError::NoProvider)?;
        let chain_id = provider.chain_id().await?;
        self.apply_chain(chain_id);
        Ok(self.session().chain_id)
    }

    /// Apply one provider notification.
    pub fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    tracing::info!("wallet exposed no accounts");
                    self.disconnect();
                }
                Some(&address) => {
                    let changed = {
                        let mut inner = self.lock_inner();
                        if !inner.session.is_connected || inner.session.address == Some(address) {
                            false
                        } else {
                            inner.session.address = Some(address);
                            inner.rebuild_signer();
                            true
                        }
                    };
                    if changed {
                        tracing::info!(%address, "active account changed");
                        self.publish();
                    }
                }
            },
            ProviderEvent::ChainChanged(hex) => match ChainId::from_hex(&hex) {
                Ok(chain_id) => self.apply_chain(chain_id),
                Err(e) => tracing::warn!(error = %e, "ignoring malformed chainChanged"),
            },
        }
    }

    /// Wait for the next provider event and apply it.
    ///
    /// Returns `false` once detached or the provider closed the channel.
    pub async fn process_next_event(&self) -> bool {
        let event = {
            let mut slot = self.events.lock().await;
            match slot.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            }
        };
        match event {
            Some(e) => {
                self.handle_event(e);
                true
            }
            None => false,
        }
    }

    /// Apply every event already queued, without waiting. Returns the count.
    pub fn drain_events(&self) -> usize {
        let mut pending = Vec::new();
        if let Ok(mut slot) = self.events.try_lock() {
            if let Some(rx) = slot.as_mut() {
                while let Ok(e) = rx.try_recv() {
                    pending.push(e);
                }
            }
        }
        let count = pending.len();
        for e in pending {
            self.handle_event(e);
        }
        count
    }

    fn establish(&self, address: Address, chain_id: ChainId) -> Signer {
        let signer = {
            let mut inner = self.lock_inner();
            inner.session = WalletSession {
                is_connected: true,
                address: Some(address),
                chain_id: Some(chain_id),
            };
            inner.rebuild_signer();
            inner.signer.clone()
        };
        self.publish();
        // rebuild_signer always yields a signer for a connected session.
        signer.unwrap_or(Signer {
            address,
            chain_id,
            generation: 0,
        })
    }

    fn apply_chain(&self, chain_id: ChainId) {
        let changed = {
            let mut inner = self.lock_inner();
            if !inner.session.is_connected || inner.session.chain_id == Some(chain_id) {
                false
            } else {
                inner.session.chain_id = Some(chain_id);
                inner.rebuild_signer();
                true
            }
        };
        if changed {
            tracing::info!(%chain_id, "active chain changed");
            self.publish();
        }
    }

    fn publish(&self) {
        let session = self.session();
        self.published.send_replace(session);
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_without_provider_fails_quietly() {
        let manager = SessionManager::new(None);
        assert_eq!(manager.connect().await, Err(ProviderError::NoProvider));
        assert_eq!(manager.session(), WalletSession::disconnected());
        assert!(manager.restore().await.is_none());
    }

    #[test]
    fn events_ignored_while_disconnected() {
        let manager = SessionManager::new(None);
        manager.handle_event(ProviderEvent::ChainChanged("0x1".into()));
        manager.handle_event(ProviderEvent::AccountsChanged(vec![Address::new([1; 20])]));
        assert_eq!(manager.session(), WalletSession::disconnected());
        assert!(manager.signer().is_none());
    }

    #[test]
    fn established_session_tracks_changes() {
        let manager = SessionManager::new(None);
        let mut watcher = manager.watch();
        let first = manager.establish(Address::new([1; 20]), ChainId::new(4202));
        assert!(watcher.has_changed().unwrap());
        assert_eq!(watcher.borrow_and_update().chain_id, Some(ChainId::new(4202)));

        manager.handle_event(ProviderEvent::ChainChanged("0x46f".into()));
        let session = manager.session();
        assert!(session.is_connected);
        assert_eq!(session.address, Some(Address::new([1; 20])));
        assert_eq!(session.chain_id, Some(ChainId::new(1135)));
        assert!(manager.signer().unwrap().generation > first.generation);

        manager.handle_event(ProviderEvent::AccountsChanged(Vec::new()));
        assert_eq!(manager.session(), WalletSession::disconnected());
        assert!(manager.signer().is_none());
    }

    #[test]
    fn malformed_chain_id_is_ignored() {
        let manager = SessionManager::new(None);
        manager.establish(Address::new([1; 20]), ChainId::new(4202));
        manager.handle_event(ProviderEvent::ChainChanged("0xzz".into()));
        assert_eq!(manager.session().chain_id, Some(ChainId::new(4202)));
    }
}
