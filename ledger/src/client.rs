//! Poll contract client over Ethereum JSON-RPC.
//!
//! One implementation serves every supported chain: the network descriptor
//! supplies the contract address and the [`PollAbi`] supplies the interface.

use async_trait::async_trait;
use chainvote_rpc::Transport;
use chainvote_types::{Address, ChainId, CreatePoll, NetworkDescriptor, Poll, PollId, PollStats};
use chainvote_wallet_core::Signer;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::abi::{decode, encode_call, from_hex, selector, to_hex, ParamType, Token};
use crate::contract::{self, PollAbi};
use crate::events::{LedgerEvent, Log};
use crate::ledger::{LedgerBinder, PollLedger};
use crate::tx::{PendingTx, Receipt, TxHash};
use crate::LedgerError;

/// Default delay between `eth_getTransactionReceipt` polls.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub struct ContractClient {
    transport: Arc<dyn Transport>,
    abi: PollAbi,
    contract: Address,
    account: Address,
    chain_id: ChainId,
    receipt_poll_interval: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Deserialize)]
struct RawLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).map_err(|e| LedgerError::Decode(format!("quantity {raw}: {e}")))
}

fn parse_topic(raw: &str) -> Result<[u8; 32], LedgerError> {
    let bytes = from_hex(raw)?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::Decode(format!("topic is not 32 bytes: {raw}")))
}

impl ContractClient {
    /// Bind to the poll contract configured for `network`.
    pub fn new(
        transport: Arc<dyn Transport>,
        network: &NetworkDescriptor,
        abi: PollAbi,
        account: Address,
    ) -> Result<Self, LedgerError> {
        let contract = network.poll_contract.ok_or(LedgerError::NotDeployed {
            chain_id: network.chain_id,
            contract: None,
        })?;
        Ok(Self {
            transport,
            abi,
            contract,
            account,
            chain_id: network.chain_id,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        })
    }

    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    pub fn abi(&self) -> &PollAbi {
        &self.abi
    }

    /// `eth_call` a view function and decode its return values.
    async fn call(&self, signature: &str, args: &[Token], returns: &[ParamType]) -> Result<Vec<Token>, LedgerError> {
        let data = encode_call(selector(signature), args);
        let result = self
            .transport
            .request(
                "eth_call",
                json!([
                    { "from": self.account.to_string(), "to": self.contract.to_string(), "data": to_hex(&data) },
                    "latest"
                ]),
            )
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode(format!("eth_call result not a string: {result}")))?;
        Ok(decode(returns, &from_hex(raw)?)?)
    }

    async fn call_one(&self, signature: &str, args: &[Token], returns: ParamType) -> Result<Token, LedgerError> {
        self.call(signature, args, &[returns])
            .await?
            .pop()
            .ok_or_else(|| LedgerError::Decode(format!("{signature} returned nothing")))
    }

    /// `eth_sendTransaction` a state-changing function from the bound account.
    async fn send(&self, signature: &str, args: &[Token]) -> Result<PendingTx, LedgerError> {
        let data = encode_call(selector(signature), args);
        let result = self
            .transport
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": self.account.to_string(),
                    "to": self.contract.to_string(),
                    "data": to_hex(&data),
                }]),
            )
            .await
            .map_err(|e| {
                let e = LedgerError::from(e);
                match &e {
                    LedgerError::UserRejected => tracing::info!(function = signature, "user rejected transaction"),
                    other => tracing::warn!(function = signature, error = %other, "transaction submission failed"),
                }
                e
            })?;
        let hash = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode(format!("transaction hash not a string: {result}")))?;
        tracing::info!(function = signature, tx_hash = hash, chain_id = %self.chain_id, "transaction submitted");
        Ok(PendingTx::new(TxHash::new(hash)))
    }

    /// One receipt lookup; `None` while the transaction is pending.
    async fn receipt(&self, hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let value = self
            .transport
            .request("eth_getTransactionReceipt", json!([hash.as_str()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        self.parse_receipt(value).map(Some)
    }

    fn parse_receipt(&self, value: Value) -> Result<Receipt, LedgerError> {
        let raw: RawReceipt =
            serde_json::from_value(value).map_err(|e| LedgerError::Decode(format!("receipt: {e}")))?;
        // Pre-Byzantium receipts carry no status; treat inclusion as success.
        let success = match raw.status.as_deref() {
            Some(status) => parse_quantity(status)? == 1,
            None => true,
        };
        let block_number = raw.block_number.as_deref().map(parse_quantity).transpose()?.unwrap_or(0);

        let mut events = Vec::new();
        for raw_log in raw.logs {
            let address = Address::parse(&raw_log.address).map_err(|e| LedgerError::Decode(e.to_string()))?;
            if address != self.contract {
                continue;
            }
            let log = Log {
                address,
                topics: raw_log.topics.iter().map(|t| parse_topic(t)).collect::<Result<_, _>>()?,
                data: from_hex(&raw_log.data)?,
            };
            match LedgerEvent::decode(&self.abi, &log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "undecodable poll contract log"),
            }
        }

        Ok(Receipt {
            tx_hash: TxHash::new(raw.transaction_hash),
            block_number,
            success,
            events,
        })
    }
}

#[async_trait]
impl PollLedger for ContractClient {
    fn contract(&self) -> Address {
        self.contract
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn is_deployed(&self) -> Result<bool, LedgerError> {
        let code = self
            .transport
            .request("eth_getCode", json!([self.contract.to_string(), "latest"]))
            .await?;
        let raw = code
            .as_str()
            .ok_or_else(|| LedgerError::Decode(format!("eth_getCode result not a string: {code}")))?;
        Ok(!from_hex(raw)?.is_empty())
    }

    async fn create_poll(&self, request: &CreatePoll) -> Result<PendingTx, LedgerError> {
        self.send(
            &self.abi.create_poll,
            &[
                Token::String(request.question.clone()),
                Token::Array(request.options.iter().cloned().map(Token::String).collect()),
                Token::Uint(request.duration_hours.into()),
            ],
        )
        .await
    }

    async fn vote(&self, poll_id: PollId, option_index: u64) -> Result<PendingTx, LedgerError> {
        self.send(
            &self.abi.vote,
            &[Token::Uint(poll_id.as_u64().into()), Token::Uint(option_index.into())],
        )
        .await
    }

    async fn end_poll(&self, poll_id: PollId) -> Result<PendingTx, LedgerError> {
        self.send(&self.abi.end_poll, &[Token::Uint(poll_id.as_u64().into())])
            .await
    }

    async fn extend_poll(&self, poll_id: PollId, additional_hours: u64) -> Result<PendingTx, LedgerError> {
        self.send(
            &self.abi.extend_poll,
            &[Token::Uint(poll_id.as_u64().into()), Token::Uint(additional_hours.into())],
        )
        .await
    }

    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<Receipt, LedgerError> {
        loop {
            if let Some(receipt) = self.receipt(&tx.hash).await? {
                if !receipt.success {
                    tracing::warn!(tx_hash = %tx.hash, block = receipt.block_number, "transaction reverted");
                    return Err(LedgerError::Reverted {
                        tx_hash: Some(tx.hash.to_string()),
                        reason: None,
                    });
                }
                tracing::debug!(tx_hash = %tx.hash, block = receipt.block_number, "transaction confirmed");
                return Ok(receipt);
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }

    async fn poll(&self, poll_id: PollId) -> Result<Poll, LedgerError> {
        let token = self
            .call_one(&self.abi.get_poll, &[Token::Uint(poll_id.as_u64().into())], contract::poll_type())
            .await?;
        Ok(contract::poll_from_token(token)?)
    }

    async fn active_polls(&self) -> Result<Vec<Poll>, LedgerError> {
        let token = self
            .call_one(&self.abi.get_active_polls, &[], contract::poll_list_type())
            .await?;
        Ok(contract::polls_from_token(token)?)
    }

    async fn polls(&self, offset: u64, limit: u64) -> Result<Vec<Poll>, LedgerError> {
        let token = self
            .call_one(
                &self.abi.get_polls,
                &[Token::Uint(offset.into()), Token::Uint(limit.into())],
                contract::poll_list_type(),
            )
            .await?;
        Ok(contract::polls_from_token(token)?)
    }

    async fn has_voted(&self, poll_id: PollId, voter: Address) -> Result<bool, LedgerError> {
        let token = self
            .call_one(
                &self.abi.has_voted,
                &[Token::Uint(poll_id.as_u64().into()), Token::Address(voter)],
                ParamType::Bool,
            )
            .await?;
        Ok(token.into_bool()?)
    }

    async fn user_vote(&self, poll_id: PollId, voter: Address) -> Result<u64, LedgerError> {
        let token = self
            .call_one(
                &self.abi.get_user_vote,
                &[Token::Uint(poll_id.as_u64().into()), Token::Address(voter)],
                ParamType::Uint,
            )
            .await?;
        Ok(token.into_u64()?)
    }

    async fn user_polls(&self, user: Address) -> Result<Vec<PollId>, LedgerError> {
        let token = self
            .call_one(
                &self.abi.get_user_polls,
                &[Token::Address(user)],
                ParamType::Array(Box::new(ParamType::Uint)),
            )
            .await?;
        Ok(contract::ids_from_token(token)?)
    }

    async fn user_votes(&self, user: Address) -> Result<Vec<PollId>, LedgerError> {
        let token = self
            .call_one(
                &self.abi.get_user_votes,
                &[Token::Address(user)],
                ParamType::Array(Box::new(ParamType::Uint)),
            )
            .await?;
        Ok(contract::ids_from_token(token)?)
    }

    async fn stats(&self) -> Result<PollStats, LedgerError> {
        let token = self
            .call_one(&self.abi.get_stats, &[], contract::stats_type())
            .await?;
        Ok(contract::stats_from_token(token)?)
    }

    async fn poll_count(&self) -> Result<u64, LedgerError> {
        let token = self
            .call_one(&self.abi.poll_count, &[], ParamType::Uint)
            .await?;
        Ok(token.into_u64()?)
    }
}

/// Binds [`ContractClient`]s on a shared transport.
pub struct RpcLedgerBinder {
    transport: Arc<dyn Transport>,
    abi: PollAbi,
    receipt_poll_interval: Duration,
}

impl RpcLedgerBinder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            abi: PollAbi::default(),
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }

    pub fn with_abi(mut self, abi: PollAbi) -> Self {
        self.abi = abi;
        self
    }

    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }
}

impl LedgerBinder for RpcLedgerBinder {
    fn bind(&self, signer: &Signer, network: &NetworkDescriptor) -> Result<Arc<dyn PollLedger>, LedgerError> {
        let client = ContractClient::new(Arc::clone(&self.transport), network, self.abi.clone(), signer.address)?
            .with_receipt_poll_interval(self.receipt_poll_interval);
        tracing::debug!(
            contract = %client.contract,
            account = %signer.address,
            chain_id = %network.chain_id,
            generation = signer.generation,
            "bound poll contract"
        );
        Ok(Arc::new(client))
    }
}
