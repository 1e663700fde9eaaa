//! Wallet provider backed by a JSON-RPC endpoint.
//!
//! Works against a browser-wallet bridge or a development node with unlocked
//! accounts. Plain HTTP has no push channel, so account and chain changes are
//! discovered by [`HttpWalletProvider::poll_changes`].

use async_trait::async_trait;
use chainvote_rpc::{codes, RpcError, Transport};
use chainvote_types::{Address, ChainId, NetworkDescriptor};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};

use crate::provider::{ProviderEvent, Subscribers, Subscription, SubscriptionId, WalletProvider};
use crate::ProviderError;

#[derive(Default)]
struct Observed {
    accounts: Option<Vec<Address>>,
    chain_id: Option<ChainId>,
}

pub struct HttpWalletProvider {
    transport: Arc<dyn Transport>,
    subscribers: Subscribers,
    observed: Mutex<Observed>,
}

impl HttpWalletProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            subscribers: Subscribers::new(),
            observed: Mutex::new(Observed::default()),
        }
    }

    /// The transport, for building a ledger client on the same endpoint.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Re-read accounts and chain id and emit events for whatever changed
    /// since the previous call. The first call only records a baseline.
    ///
    /// Returns the number of events emitted.
    pub async fn poll_changes(&self) -> Result<usize, ProviderError> {
        let accounts = self.accounts().await?;
        let chain_id = self.chain_id().await?;

        let mut events = Vec::new();
        {
            let mut observed = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = &observed.accounts {
                if *previous != accounts {
                    events.push(ProviderEvent::AccountsChanged(accounts.clone()));
                }
            }
            if let Some(previous) = observed.chain_id {
                if previous != chain_id {
                    events.push(ProviderEvent::ChainChanged(chain_id.to_hex()));
                }
            }
            observed.accounts = Some(accounts);
            observed.chain_id = Some(chain_id);
        }

        for event in &events {
            tracing::debug!(?event, "wallet change detected");
            self.subscribers.emit(event);
        }
        Ok(events.len())
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.transport
            .request(method, params)
            .await
            .map_err(ProviderError::from)
    }
}

/// The `wallet_addEthereumChain` parameter object for a descriptor.
pub fn add_chain_params(network: &NetworkDescriptor) -> Value {
    json!({
        "chainId": network.chain_id.to_hex(),
        "chainName": network.name,
        "rpcUrls": [network.rpc_url],
        "nativeCurrency": {
            "name": network.native_currency.name,
            "symbol": network.native_currency.symbol,
            "decimals": network.native_currency.decimals,
        },
        "blockExplorerUrls": [network.block_explorer],
    })
}

fn parse_accounts(value: Value) -> Result<Vec<Address>, ProviderError> {
    let list = value
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("accounts not an array: {value}")))?;
    list.iter()
        .map(|v| {
            let s = v
                .as_str()
                .ok_or_else(|| ProviderError::InvalidResponse(format!("account not a string: {v}")))?;
            Address::parse(s).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
        })
        .collect()
}

fn is_unsupported_method(e: &RpcError) -> bool {
    matches!(
        e.code(),
        Some(codes::METHOD_NOT_FOUND) | Some(codes::UNSUPPORTED_METHOD)
    )
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        match self.transport.request("eth_requestAccounts", json!([])).await {
            Ok(value) => parse_accounts(value),
            // Plain nodes expose unlocked accounts without a prompt.
            Err(e) if is_unsupported_method(&e) => self.accounts().await,
            Err(e) => Err(e.into()),
        }
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        parse_accounts(self.call("eth_accounts", json!([])).await?)
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let value = self.call("eth_chainId", json!([])).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse(format!("chain id not a string: {value}")))?;
        ChainId::from_hex(hex).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ProviderError> {
        self.call(
            "wallet_switchEthereumChain",
            json!([{ "chainId": chain_id.to_hex() }]),
        )
        .await?;
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        self.call("wallet_addEthereumChain", json!([add_chain_params(network)]))
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.unsubscribe(id);
    }
}
