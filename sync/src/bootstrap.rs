//! Wiring an engine to a JSON-RPC wallet node.

use chainvote_ledger::RpcLedgerBinder;
use chainvote_rpc::{RpcClient, Transport};
use chainvote_types::SystemClock;
use chainvote_wallet_core::{HttpWalletProvider, SessionManager, WalletProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::SyncConfig;
use crate::engine::PollSyncEngine;
use crate::notice::Notice;
use crate::SyncError;

/// A ready engine plus the handles needed to drive it.
pub struct Runtime {
    pub engine: Arc<PollSyncEngine>,
    pub provider: Arc<HttpWalletProvider>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

/// Build the engine against the node at `provider_url`, or the default
/// network's RPC endpoint.
pub fn build(config: &SyncConfig) -> Result<Runtime, SyncError> {
    let url = match &config.provider_url {
        Some(url) => url.clone(),
        None => config.network_registry()?.default_network().rpc_url.clone(),
    };
    info!(%url, "using wallet node");
    let client = RpcClient::with_timeout(url, config.rpc_timeout())?;
    build_with_transport(config, Arc::new(client))
}

/// Build the engine on an existing transport. Wallet requests and contract
/// calls share it.
pub fn build_with_transport(config: &SyncConfig, transport: Arc<dyn Transport>) -> Result<Runtime, SyncError> {
    let registry = config.network_registry()?;
    let provider = Arc::new(HttpWalletProvider::new(Arc::clone(&transport)));
    let binder = RpcLedgerBinder::new(transport)
        .with_abi(config.abi.clone())
        .with_receipt_poll_interval(config.receipt_poll_interval());
    let wallet: Arc<dyn WalletProvider> = provider.clone();
    let session = Arc::new(SessionManager::new(Some(wallet)));
    let (engine, notices) = PollSyncEngine::new(
        session,
        registry,
        Arc::new(binder),
        Arc::new(SystemClock),
        config,
    );
    Ok(Runtime {
        engine: Arc::new(engine),
        provider,
        notices,
    })
}

/// Poll the node for account and chain changes every `interval` until
/// `cancel` fires. Changes reach the engine as ordinary wallet events.
pub fn spawn_change_poller(
    provider: Arc<HttpWalletProvider>,
    interval: Duration,
    cancel: CancelToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match provider.poll_changes().await {
                    Ok(0) => {}
                    Ok(changes) => debug!(changes, "wallet changes detected"),
                    Err(e) => warn!(error = %e, "failed to poll wallet for changes"),
                },
            }
        }
        debug!("wallet change poller stopped");
    })
}
