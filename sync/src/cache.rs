//! Local poll state in two phases.
//!
//! `confirmed` is exactly what the ledger last returned for one chain and
//! is only ever replaced wholesale. `pending` holds projections of
//! creations submitted but not yet reconciled; each is removed when its
//! action resolves, whatever the outcome.

use chainvote_ledger::TxHash;
use chainvote_types::{Address, ChainId, CreatePoll, Poll, PollId, Timestamp};

/// A poll creation between submission and reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPoll {
    pub token: u64,
    pub request: CreatePoll,
    pub creator: Address,
    pub submitted_at: Timestamp,
    /// Set once the ledger accepted the transaction.
    pub tx_hash: Option<TxHash>,
}

impl PendingPoll {
    /// What the poll is expected to look like once included. The id is a
    /// placeholder; the ledger assigns the real one.
    pub fn projection(&self) -> Poll {
        Poll {
            id: PollId::new(u64::MAX),
            question: self.request.question.clone(),
            options: self.request.options.clone(),
            votes: vec![0; self.request.options.len()],
            total_votes: 0,
            creator: self.creator,
            is_active: true,
            created_at: self.submitted_at,
            end_time: self.submitted_at.plus_secs(self.request.duration_secs()),
        }
    }
}

#[derive(Debug, Default)]
pub struct PollCache {
    chain: Option<ChainId>,
    confirmed: Vec<Poll>,
    pending: Vec<PendingPoll>,
    next_token: u64,
}

impl PollCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain the confirmed list belongs to.
    pub fn chain(&self) -> Option<ChainId> {
        self.chain
    }

    pub fn confirmed(&self) -> &[Poll] {
        &self.confirmed
    }

    pub fn pending(&self) -> &[PendingPoll] {
        &self.pending
    }

    pub fn find(&self, id: PollId) -> Option<&Poll> {
        self.confirmed.iter().find(|p| p.id == id)
    }

    /// Replace the confirmed list with a fresh ledger read.
    pub fn replace_confirmed(&mut self, chain: ChainId, polls: Vec<Poll>) {
        self.chain = Some(chain);
        self.confirmed = polls;
    }

    /// Drop everything, including pending projections.
    pub fn clear(&mut self) {
        self.chain = None;
        self.confirmed.clear();
        self.pending.clear();
    }

    pub fn add_pending(&mut self, request: CreatePoll, creator: Address, now: Timestamp) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.pending.push(PendingPoll {
            token,
            request,
            creator,
            submitted_at: now,
            tx_hash: None,
        });
        token
    }

    pub fn attach_tx(&mut self, token: u64, hash: TxHash) {
        if let Some(p) = self.pending.iter_mut().find(|p| p.token == token) {
            p.tx_hash = Some(hash);
        }
    }

    pub fn resolve_pending(&mut self, token: u64) -> Option<PendingPoll> {
        let index = self.pending.iter().position(|p| p.token == token)?;
        Some(self.pending.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(id: u64) -> Poll {
        let mut poll = PendingPoll {
            token: 0,
            request: CreatePoll::new("Q", ["A", "B"], 1),
            creator: Address::new([1; 20]),
            submitted_at: Timestamp::new(100),
            tx_hash: None,
        }
        .projection();
        poll.id = PollId::new(id);
        poll
    }

    #[test]
    fn replace_is_wholesale() {
        let mut cache = PollCache::new();
        cache.replace_confirmed(ChainId::new(4202), vec![poll(1), poll(2)]);
        cache.replace_confirmed(ChainId::new(4202), vec![poll(3)]);
        assert_eq!(cache.confirmed().len(), 1);
        assert!(cache.find(PollId::new(3)).is_some());
        assert!(cache.find(PollId::new(1)).is_none());
    }

    #[test]
    fn pending_lifecycle() {
        let mut cache = PollCache::new();
        let a = cache.add_pending(CreatePoll::new("A?", ["x", "y"], 2), Address::new([1; 20]), Timestamp::new(10));
        let b = cache.add_pending(CreatePoll::new("B?", ["x", "y"], 2), Address::new([1; 20]), Timestamp::new(10));
        assert_ne!(a, b);
        cache.attach_tx(a, TxHash::new("0x1"));
        assert_eq!(cache.pending()[0].tx_hash, Some(TxHash::new("0x1")));
        assert_eq!(cache.resolve_pending(a).unwrap().request.question, "A?");
        assert!(cache.resolve_pending(a).is_none());
        assert_eq!(cache.pending().len(), 1);
    }

    #[test]
    fn projection_matches_request() {
        let pending = PendingPoll {
            token: 0,
            request: CreatePoll::new("Q", ["A", "B", "C"], 24),
            creator: Address::new([2; 20]),
            submitted_at: Timestamp::new(1_000),
            tx_hash: None,
        };
        let projected = pending.projection();
        assert_eq!(projected.votes, vec![0, 0, 0]);
        assert_eq!(projected.end_time.as_secs() - projected.created_at.as_secs(), 24 * 3600);
        assert!(projected.check_invariants().is_ok());
    }

    #[test]
    fn clear_drops_chain_and_pending() {
        let mut cache = PollCache::new();
        cache.replace_confirmed(ChainId::new(1135), vec![poll(1)]);
        cache.add_pending(CreatePoll::new("Q", ["A", "B"], 1), Address::new([1; 20]), Timestamp::new(1));
        cache.clear();
        assert_eq!(cache.chain(), None);
        assert!(cache.confirmed().is_empty());
        assert!(cache.pending().is_empty());
    }
}
