//! The stable interface the sync engine uses to reach the poll contract.

use async_trait::async_trait;
use chainvote_types::{Address, ChainId, CreatePoll, NetworkDescriptor, Poll, PollId, PollStats};
use chainvote_wallet_core::Signer;
use std::sync::Arc;

use crate::tx::{PendingTx, Receipt};
use crate::LedgerError;

/// One contract instance bound to one signer on one chain.
///
/// Mutations return as soon as the ledger accepted the transaction;
/// [`wait_for_receipt`](Self::wait_for_receipt) waits for inclusion.
#[async_trait]
pub trait PollLedger: Send + Sync {
    fn contract(&self) -> Address;

    fn chain_id(&self) -> ChainId;

    /// Account transactions are sent from.
    fn account(&self) -> Address;

    /// Whether code exists at the contract address.
    async fn is_deployed(&self) -> Result<bool, LedgerError>;

    async fn create_poll(&self, request: &CreatePoll) -> Result<PendingTx, LedgerError>;

    async fn vote(&self, poll_id: PollId, option_index: u64) -> Result<PendingTx, LedgerError>;

    async fn end_poll(&self, poll_id: PollId) -> Result<PendingTx, LedgerError>;

    async fn extend_poll(&self, poll_id: PollId, additional_hours: u64) -> Result<PendingTx, LedgerError>;

    /// Wait until `tx` is included. A reverted transaction is
    /// [`LedgerError::Reverted`]. No timeout is applied here.
    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<Receipt, LedgerError>;

    async fn poll(&self, poll_id: PollId) -> Result<Poll, LedgerError>;

    async fn active_polls(&self) -> Result<Vec<Poll>, LedgerError>;

    async fn polls(&self, offset: u64, limit: u64) -> Result<Vec<Poll>, LedgerError>;

    async fn has_voted(&self, poll_id: PollId, voter: Address) -> Result<bool, LedgerError>;

    async fn user_vote(&self, poll_id: PollId, voter: Address) -> Result<u64, LedgerError>;

    async fn user_polls(&self, user: Address) -> Result<Vec<PollId>, LedgerError>;

    async fn user_votes(&self, user: Address) -> Result<Vec<PollId>, LedgerError>;

    async fn stats(&self) -> Result<PollStats, LedgerError>;

    async fn poll_count(&self) -> Result<u64, LedgerError>;
}

/// Builds a [`PollLedger`] for a signer on a supported network.
pub trait LedgerBinder: Send + Sync {
    /// Fails with [`LedgerError::NotDeployed`] when the network has no
    /// poll contract configured.
    fn bind(&self, signer: &Signer, network: &NetworkDescriptor) -> Result<Arc<dyn PollLedger>, LedgerError>;
}
