//! Nullable poll contract: in-memory ledger semantics with failure injection.

use async_trait::async_trait;
use chainvote_ledger::{LedgerBinder, LedgerError, LedgerEvent, PendingTx, PollLedger, Receipt, TxHash};
use chainvote_types::{Address, ChainId, Clock, CreatePoll, NetworkDescriptor, Poll, PollId, PollStats};
use chainvote_wallet_core::Signer;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

/// A request the ledger received.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerCall {
    IsDeployed,
    CreatePoll(CreatePoll),
    Vote { poll_id: PollId, option_index: u64 },
    EndPoll(PollId),
    ExtendPoll { poll_id: PollId, hours: u64 },
    WaitForReceipt(TxHash),
    Poll(PollId),
    ActivePolls,
    Polls { offset: u64, limit: u64 },
    HasVoted(PollId, Address),
    UserVote(PollId, Address),
    UserPolls(Address),
    UserVotes(Address),
    Stats,
    PollCount,
}

impl LedgerCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreatePoll(_) | Self::Vote { .. } | Self::EndPoll(_) | Self::ExtendPoll { .. }
        )
    }
}

#[derive(Clone, Debug)]
enum Effect {
    Create(CreatePoll),
    Vote { poll_id: PollId, option_index: u64 },
    End(PollId),
    Extend { poll_id: PollId, hours: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReceiptMode {
    Immediate,
    Held,
    Never,
}

struct ContractState {
    polls: Vec<Poll>,
    /// poll id -> voter -> option index
    ballots: HashMap<PollId, HashMap<Address, u64>>,
    pending: HashMap<TxHash, (Address, Effect)>,
    next_tx: u64,
    next_block: u64,
    submit_error: Option<LedgerError>,
    receipt_error: Option<LedgerError>,
    read_error: Option<LedgerError>,
    receipt_mode: ReceiptMode,
    calls: Vec<LedgerCall>,
}

/// An in-memory poll contract.
///
/// Mutations are accepted immediately and applied when their receipt is
/// awaited, with the contract's own rules (one vote per voter, only the
/// creator ends or extends, only active polls change). A rule violation
/// surfaces as [`LedgerError::Reverted`] from `wait_for_receipt`.
///
/// Receipts can be held back with [`hold_receipts`](Self::hold_receipts)
/// and let through one at a time with
/// [`release_receipts`](Self::release_receipts), or withheld forever with
/// [`never_confirm`](Self::never_confirm).
pub struct NullLedger {
    contract: Address,
    clock: Arc<dyn Clock>,
    deployed: AtomicBool,
    gate: Arc<Semaphore>,
    state: Mutex<ContractState>,
}

impl NullLedger {
    pub fn new(contract: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            contract,
            clock,
            deployed: AtomicBool::new(true),
            gate: Arc::new(Semaphore::new(0)),
            state: Mutex::new(ContractState {
                polls: Vec::new(),
                ballots: HashMap::new(),
                pending: HashMap::new(),
                next_tx: 1,
                next_block: 1,
                submit_error: None,
                receipt_error: None,
                read_error: None,
                receipt_mode: ReceiptMode::Immediate,
                calls: Vec::new(),
            }),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// A handle that sends from `account` on `chain_id`.
    pub fn bind(self: &Arc<Self>, account: Address, chain_id: ChainId) -> Arc<dyn PollLedger> {
        Arc::new(BoundLedger {
            ledger: Arc::clone(self),
            account,
            chain_id,
        })
    }

    /// Insert a poll as-is, bypassing the contract rules.
    pub fn seed_poll(&self, poll: Poll) {
        self.lock().polls.push(poll);
    }

    /// Create a poll directly with the contract rules, as if someone else
    /// sent the transaction. Returns its id.
    pub fn create_directly(&self, creator: Address, request: &CreatePoll) -> PollId {
        let mut state = self.lock();
        let now = self.clock.now();
        apply_create(&mut state, creator, request, now)
    }

    /// Record a ballot directly, as if `voter` had voted.
    pub fn vote_directly(&self, poll_id: PollId, voter: Address, option_index: u64) -> Result<(), LedgerError> {
        let mut state = self.lock();
        let now = self.clock.now();
        apply_vote(&mut state, voter, poll_id, option_index, now).map(|_| ())
    }

    pub fn polls_snapshot(&self) -> Vec<Poll> {
        self.lock().polls.clone()
    }

    pub fn set_deployed(&self, deployed: bool) {
        self.deployed.store(deployed, Ordering::SeqCst);
    }

    /// Fail the next mutation submission.
    pub fn fail_next_submit(&self, error: LedgerError) {
        self.lock().submit_error = Some(error);
    }

    /// Fail the next receipt wait (the transaction is dropped).
    pub fn fail_next_receipt(&self, error: LedgerError) {
        self.lock().receipt_error = Some(error);
    }

    /// Fail every read until cleared with `None`.
    pub fn fail_reads(&self, error: Option<LedgerError>) {
        self.lock().read_error = error;
    }

    pub fn hold_receipts(&self) {
        self.lock().receipt_mode = ReceiptMode::Held;
    }

    /// Let `n` held receipt waits complete.
    pub fn release_receipts(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn never_confirm(&self) {
        self.lock().receipt_mode = ReceiptMode::Never;
    }

    pub fn confirm_immediately(&self) {
        self.lock().receipt_mode = ReceiptMode::Immediate;
    }

    /// All requests received (for assertions).
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.lock().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    pub fn count(&self, matches: impl Fn(&LedgerCall) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, ContractState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, call: LedgerCall, f: impl FnOnce(&ContractState) -> Result<T, LedgerError>) -> Result<T, LedgerError> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(error) = state.read_error.clone() {
            return Err(error);
        }
        f(&*state)
    }

    fn submit(&self, from: Address, call: LedgerCall, effect: Effect) -> Result<PendingTx, LedgerError> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(error) = state.submit_error.take() {
            return Err(error);
        }
        let hash = TxHash::new(format!("0x{:064x}", state.next_tx));
        state.next_tx += 1;
        state.pending.insert(hash.clone(), (from, effect));
        Ok(PendingTx::new(hash))
    }

    async fn confirm(&self, tx: &PendingTx) -> Result<Receipt, LedgerError> {
        let mode = {
            let mut state = self.lock();
            state.calls.push(LedgerCall::WaitForReceipt(tx.hash.clone()));
            state.receipt_mode
        };
        match mode {
            ReceiptMode::Immediate => {}
            ReceiptMode::Held => {
                // The semaphore is never closed.
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
            }
            ReceiptMode::Never => std::future::pending::<()>().await,
        }

        let mut state = self.lock();
        let (from, effect) = state
            .pending
            .remove(&tx.hash)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", tx.hash)))?;
        if let Some(error) = state.receipt_error.take() {
            return Err(error);
        }
        let now = self.clock.now();
        let event = match effect {
            Effect::Create(request) => {
                let poll_id = apply_create(&mut state, from, &request, now);
                LedgerEvent::PollCreated {
                    poll_id,
                    creator: from,
                    question: request.question.clone(),
                    end_time: now.plus_secs(request.duration_secs()),
                    option_count: request.options.len() as u64,
                }
            }
            Effect::Vote { poll_id, option_index } => {
                apply_vote(&mut state, from, poll_id, option_index, now).map_err(|e| with_hash(e, tx))?
            }
            Effect::End(poll_id) => {
                let poll = creator_poll(&mut state, from, poll_id).map_err(|e| with_hash(e, tx))?;
                poll.is_active = false;
                LedgerEvent::PollEnded {
                    poll_id,
                    total_votes: poll.total_votes,
                    winning_option: poll.winning_option().unwrap_or(0) as u64,
                }
            }
            Effect::Extend { poll_id, hours } => {
                if hours == 0 {
                    return Err(with_hash(revert("Hours must be greater than 0"), tx));
                }
                let poll = creator_poll(&mut state, from, poll_id).map_err(|e| with_hash(e, tx))?;
                poll.end_time = poll.end_time.plus_secs(hours.saturating_mul(3600));
                LedgerEvent::PollExtended {
                    poll_id,
                    new_end_time: poll.end_time,
                }
            }
        };
        let block_number = state.next_block;
        state.next_block += 1;
        Ok(Receipt {
            tx_hash: tx.hash.clone(),
            block_number,
            success: true,
            events: vec![event],
        })
    }
}

fn revert(reason: &str) -> LedgerError {
    LedgerError::Reverted {
        tx_hash: None,
        reason: Some(reason.to_string()),
    }
}

fn with_hash(error: LedgerError, tx: &PendingTx) -> LedgerError {
    match error {
        LedgerError::Reverted { reason, .. } => LedgerError::Reverted {
            tx_hash: Some(tx.hash.to_string()),
            reason,
        },
        other => other,
    }
}

fn apply_create(state: &mut ContractState, creator: Address, request: &CreatePoll, now: chainvote_types::Timestamp) -> PollId {
    let poll_id = PollId::new(state.polls.len() as u64);
    state.polls.push(Poll {
        id: poll_id,
        question: request.question.clone(),
        options: request.options.clone(),
        votes: vec![0; request.options.len()],
        total_votes: 0,
        creator,
        is_active: true,
        created_at: now,
        end_time: now.plus_secs(request.duration_secs()),
    });
    poll_id
}

fn apply_vote(
    state: &mut ContractState,
    voter: Address,
    poll_id: PollId,
    option_index: u64,
    now: chainvote_types::Timestamp,
) -> Result<LedgerEvent, LedgerError> {
    if state
        .ballots
        .get(&poll_id)
        .is_some_and(|b| b.contains_key(&voter))
    {
        return Err(revert("Already voted"));
    }
    let poll = state
        .polls
        .iter_mut()
        .find(|p| p.id == poll_id)
        .ok_or_else(|| revert("Poll does not exist"))?;
    if !poll.is_open_at(now) {
        return Err(revert("Poll is not active"));
    }
    let slot = usize::try_from(option_index)
        .ok()
        .and_then(|i| poll.votes.get_mut(i))
        .ok_or_else(|| revert("Invalid option"))?;
    *slot += 1;
    poll.total_votes += 1;
    state.ballots.entry(poll_id).or_default().insert(voter, option_index);
    Ok(LedgerEvent::VoteCast {
        poll_id,
        voter,
        option_index,
        timestamp: now,
    })
}

fn creator_poll(state: &mut ContractState, from: Address, poll_id: PollId) -> Result<&mut Poll, LedgerError> {
    let poll = state
        .polls
        .iter_mut()
        .find(|p| p.id == poll_id)
        .ok_or_else(|| revert("Poll does not exist"))?;
    if poll.creator != from {
        return Err(revert("Only creator can modify poll"));
    }
    if !poll.is_active {
        return Err(revert("Poll already ended"));
    }
    Ok(poll)
}

struct BoundLedger {
    ledger: Arc<NullLedger>,
    account: Address,
    chain_id: ChainId,
}

#[async_trait]
impl PollLedger for BoundLedger {
    fn contract(&self) -> Address {
        self.ledger.contract
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn is_deployed(&self) -> Result<bool, LedgerError> {
        let deployed = self.ledger.deployed.load(Ordering::SeqCst);
        self.ledger.read(LedgerCall::IsDeployed, |_| Ok(deployed))
    }

    async fn create_poll(&self, request: &CreatePoll) -> Result<PendingTx, LedgerError> {
        self.ledger.submit(
            self.account,
            LedgerCall::CreatePoll(request.clone()),
            Effect::Create(request.clone()),
        )
    }

    async fn vote(&self, poll_id: PollId, option_index: u64) -> Result<PendingTx, LedgerError> {
        self.ledger.submit(
            self.account,
            LedgerCall::Vote { poll_id, option_index },
            Effect::Vote { poll_id, option_index },
        )
    }

    async fn end_poll(&self, poll_id: PollId) -> Result<PendingTx, LedgerError> {
        self.ledger
            .submit(self.account, LedgerCall::EndPoll(poll_id), Effect::End(poll_id))
    }

    async fn extend_poll(&self, poll_id: PollId, additional_hours: u64) -> Result<PendingTx, LedgerError> {
        self.ledger.submit(
            self.account,
            LedgerCall::ExtendPoll {
                poll_id,
                hours: additional_hours,
            },
            Effect::Extend {
                poll_id,
                hours: additional_hours,
            },
        )
    }

    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<Receipt, LedgerError> {
        self.ledger.confirm(tx).await
    }

    async fn poll(&self, poll_id: PollId) -> Result<Poll, LedgerError> {
        self.ledger.read(LedgerCall::Poll(poll_id), |s| {
            s.polls
                .iter()
                .find(|p| p.id == poll_id)
                .cloned()
                .ok_or_else(|| revert("Poll does not exist"))
        })
    }

    async fn active_polls(&self) -> Result<Vec<Poll>, LedgerError> {
        let now = self.ledger.clock.now();
        self.ledger.read(LedgerCall::ActivePolls, |s| {
            Ok(s.polls.iter().filter(|p| p.is_open_at(now)).cloned().collect())
        })
    }

    async fn polls(&self, offset: u64, limit: u64) -> Result<Vec<Poll>, LedgerError> {
        self.ledger.read(LedgerCall::Polls { offset, limit }, |s| {
            Ok(s.polls
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }

    async fn has_voted(&self, poll_id: PollId, voter: Address) -> Result<bool, LedgerError> {
        self.ledger.read(LedgerCall::HasVoted(poll_id, voter), |s| {
            Ok(s.ballots
                .get(&poll_id)
                .is_some_and(|b| b.contains_key(&voter)))
        })
    }

    async fn user_vote(&self, poll_id: PollId, voter: Address) -> Result<u64, LedgerError> {
        self.ledger.read(LedgerCall::UserVote(poll_id, voter), |s| {
            s.ballots
                .get(&poll_id)
                .and_then(|b| b.get(&voter))
                .copied()
                .ok_or_else(|| revert("User has not voted"))
        })
    }

    async fn user_polls(&self, user: Address) -> Result<Vec<PollId>, LedgerError> {
        self.ledger.read(LedgerCall::UserPolls(user), |s| {
            Ok(s.polls
                .iter()
                .filter(|p| p.creator == user)
                .map(|p| p.id)
                .collect())
        })
    }

    async fn user_votes(&self, user: Address) -> Result<Vec<PollId>, LedgerError> {
        self.ledger.read(LedgerCall::UserVotes(user), |s| {
            let mut ids: Vec<PollId> = s
                .ballots
                .iter()
                .filter(|(_, b)| b.contains_key(&user))
                .map(|(id, _)| *id)
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    async fn stats(&self) -> Result<PollStats, LedgerError> {
        let now = self.ledger.clock.now();
        self.ledger.read(LedgerCall::Stats, |s| {
            let participants: HashSet<&Address> = s.ballots.values().flat_map(|b| b.keys()).collect();
            Ok(PollStats {
                total_polls: s.polls.len() as u64,
                active_polls: s.polls.iter().filter(|p| p.is_open_at(now)).count() as u64,
                total_votes: s.polls.iter().map(|p| p.total_votes).sum(),
                total_participants: participants.len() as u64,
            })
        })
    }

    async fn poll_count(&self) -> Result<u64, LedgerError> {
        self.ledger
            .read(LedgerCall::PollCount, |s| Ok(s.polls.len() as u64))
    }
}

/// Binds [`NullLedger`] deployments by chain.
///
/// A chain without a registered ledger, or a network descriptor without a
/// poll contract, fails with [`LedgerError::NotDeployed`].
pub struct NullLedgerBinder {
    ledgers: Mutex<HashMap<ChainId, Arc<NullLedger>>>,
    binds: Mutex<Vec<Signer>>,
}

impl NullLedgerBinder {
    pub fn new() -> Self {
        Self {
            ledgers: Mutex::new(HashMap::new()),
            binds: Mutex::new(Vec::new()),
        }
    }

    pub fn deploy(&self, chain_id: ChainId, ledger: Arc<NullLedger>) {
        self.ledgers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chain_id, ledger);
    }

    /// Every signer a ledger was bound for, in order.
    pub fn binds(&self) -> Vec<Signer> {
        self.binds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for NullLedgerBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerBinder for NullLedgerBinder {
    fn bind(&self, signer: &Signer, network: &NetworkDescriptor) -> Result<Arc<dyn PollLedger>, LedgerError> {
        let not_deployed = LedgerError::NotDeployed {
            chain_id: network.chain_id,
            contract: network.poll_contract,
        };
        if network.poll_contract.is_none() {
            return Err(not_deployed);
        }
        let ledger = self
            .ledgers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&network.chain_id)
            .cloned()
            .ok_or(not_deployed)?;
        self.binds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(signer.clone());
        Ok(ledger.bind(signer.address, network.chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullClock;

    fn setup() -> (Arc<NullClock>, Arc<NullLedger>) {
        let clock = Arc::new(NullClock::new(1_000_000));
        let ledger = Arc::new(NullLedger::new(Address::new([0xcc; 20]), clock.clone()));
        (clock, ledger)
    }

    #[tokio::test]
    async fn mutation_applies_on_receipt() {
        let (_, ledger) = setup();
        let alice = Address::new([1; 20]);
        let handle = ledger.bind(alice, ChainId::new(4202));
        let tx = handle
            .create_poll(&CreatePoll::new("Q", ["a", "b"], 1))
            .await
            .unwrap();
        assert!(ledger.polls_snapshot().is_empty());
        let receipt = handle.wait_for_receipt(&tx).await.unwrap();
        assert_eq!(receipt.created_poll_id(), Some(PollId::new(0)));
        let poll = &ledger.polls_snapshot()[0];
        assert_eq!(poll.creator, alice);
        assert_eq!(poll.end_time.as_secs(), 1_000_000 + 3600);
    }

    #[tokio::test]
    async fn second_vote_reverts() {
        let (_, ledger) = setup();
        let alice = Address::new([1; 20]);
        let id = ledger.create_directly(alice, &CreatePoll::new("Q", ["a", "b"], 1));
        let handle = ledger.bind(alice, ChainId::new(4202));
        let tx = handle.vote(id, 1).await.unwrap();
        handle.wait_for_receipt(&tx).await.unwrap();
        let tx = handle.vote(id, 0).await.unwrap();
        assert!(matches!(
            handle.wait_for_receipt(&tx).await,
            Err(LedgerError::Reverted { tx_hash: Some(_), .. })
        ));
        assert_eq!(ledger.polls_snapshot()[0].votes, vec![0, 1]);
        assert_eq!(handle.user_vote(id, alice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_polls_leave_active_list() {
        let (clock, ledger) = setup();
        ledger.create_directly(Address::new([1; 20]), &CreatePoll::new("Q", ["a", "b"], 1));
        let handle = ledger.bind(Address::new([2; 20]), ChainId::new(4202));
        assert_eq!(handle.active_polls().await.unwrap().len(), 1);
        clock.advance(3600);
        assert!(handle.active_polls().await.unwrap().is_empty());
        assert_eq!(handle.polls(0, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_creator_may_end() {
        let (_, ledger) = setup();
        let alice = Address::new([1; 20]);
        let id = ledger.create_directly(alice, &CreatePoll::new("Q", ["a", "b"], 1));
        let bob = ledger.bind(Address::new([2; 20]), ChainId::new(4202));
        let tx = bob.end_poll(id).await.unwrap();
        assert!(bob.wait_for_receipt(&tx).await.is_err());
        assert!(ledger.polls_snapshot()[0].is_active);
    }
}
