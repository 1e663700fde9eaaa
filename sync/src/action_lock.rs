//! Per-action mutual exclusion keyed by action kind and poll.
//!
//! Actions on different keys run concurrently; a second action on a key
//! already in flight is refused rather than queued.

use chainvote_types::PollId;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Vote,
    End,
    Extend,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Vote => "vote",
            Self::End => "end",
            Self::Extend => "extend",
        })
    }
}

/// What a lock is held on. `poll` is `None` for creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub kind: ActionKind,
    pub poll: Option<PollId>,
}

impl ActionKey {
    pub fn new(kind: ActionKind, poll: Option<PollId>) -> Self {
        Self { kind, poll }
    }
}

#[derive(Default)]
pub struct ActionLocks {
    held: Mutex<HashSet<ActionKey>>,
}

/// Releases its key on drop.
pub struct ActionGuard<'a> {
    locks: &'a ActionLocks,
    key: ActionKey,
}

impl ActionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `key`, or `None` if an action on it is in flight.
    pub fn try_acquire(&self, key: ActionKey) -> Option<ActionGuard<'_>> {
        let inserted = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        inserted.then_some(ActionGuard { locks: self, key })
    }

    pub fn is_held(&self, key: &ActionKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Number of actions in flight.
    pub fn in_flight(&self) -> usize {
        self.held.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ActionGuard<'_> {
    pub fn key(&self) -> ActionKey {
        self.key
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
