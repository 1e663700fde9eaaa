//! Submitted transactions and their receipts.

use chainvote_types::PollId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::LedgerEvent;

/// `0x`-prefixed transaction hash as returned by the node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle for a transaction the ledger accepted but has not yet included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
}

impl PendingTx {
    pub fn new(hash: TxHash) -> Self {
        Self { hash }
    }
}

/// Outcome of an included transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    /// Poll contract events emitted by the transaction, in log order.
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    /// Id assigned by a `createPoll` transaction.
    pub fn created_poll_id(&self) -> Option<PollId> {
        self.events.iter().find_map(|e| match e {
            LedgerEvent::PollCreated { poll_id, .. } => Some(*poll_id),
            _ => None,
        })
    }
}
