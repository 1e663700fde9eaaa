//! Polls as recorded by the ledger, and the request to create one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, Timestamp, TypesError};

/// Ledger-assigned poll identifier. Immutable once assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(u64);

impl PollId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One voting round.
///
/// `options[i]` and `votes[i]` are paired by index; the index is the option
/// identifier used when voting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<String>,
    pub votes: Vec<u64>,
    pub total_votes: u64,
    pub creator: Address,
    /// Explicit flag from the ledger. Use [`Poll::is_open_at`] for display.
    pub is_active: bool,
    pub created_at: Timestamp,
    pub end_time: Timestamp,
}

impl Poll {
    /// Whether the poll accepts votes at `now`.
    ///
    /// Recomputed on every call: a poll whose `end_time` has passed is closed
    /// even while the ledger still reports `is_active`.
    pub fn is_open_at(&self, now: Timestamp) -> bool {
        self.is_active && now < self.end_time
    }

    /// Index of the option with the most votes. Ties go to the lowest index.
    pub fn winning_option(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (index, &count) in self.votes.iter().enumerate() {
            match best {
                Some((_, max)) if count <= max => {}
                _ => best = Some((index, count)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Share of the vote for option `index`, rounded to a whole percent.
    /// Zero when nobody has voted yet.
    pub fn vote_percentage(&self, index: usize) -> u32 {
        let count = self.votes.get(index).copied().unwrap_or(0);
        if self.total_votes == 0 {
            return 0;
        }
        let scaled = u128::from(count) * 200 + u128::from(self.total_votes);
        (scaled / (u128::from(self.total_votes) * 2)) as u32
    }

    pub fn is_creator(&self, who: &Address) -> bool {
        self.creator == *who
    }

    /// Structural checks every poll read from the ledger must pass.
    pub fn check_invariants(&self) -> Result<(), TypesError> {
        let fail = |reason: String| TypesError::InvalidPoll {
            id: self.id.as_u64(),
            reason,
        };
        if self.question.trim().is_empty() {
            return Err(fail("empty question".into()));
        }
        if self.options.len() < 2 {
            return Err(fail(format!("{} options, need at least 2", self.options.len())));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(fail("empty option label".into()));
        }
        if self.votes.len() != self.options.len() {
            return Err(fail(format!(
                "{} vote counters for {} options",
                self.votes.len(),
                self.options.len()
            )));
        }
        let sum = self
            .votes
            .iter()
            .try_fold(0u64, |acc, v| acc.checked_add(*v))
            .ok_or_else(|| fail("vote counters overflow".into()))?;
        if sum != self.total_votes {
            return Err(fail(format!(
                "totalVotes {} but counters sum to {sum}",
                self.total_votes
            )));
        }
        if self.end_time <= self.created_at {
            return Err(fail(format!(
                "endTime {} not after createdAt {}",
                self.end_time, self.created_at
            )));
        }
        Ok(())
    }
}

/// Split polls into (open, ended) at `now`, preserving order.
pub fn partition(polls: &[Poll], now: Timestamp) -> (Vec<&Poll>, Vec<&Poll>) {
    polls.iter().partition(|p| p.is_open_at(now))
}

/// Aggregate counters reported by the ledger's `getStats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStats {
    pub total_polls: u64,
    pub active_polls: u64,
    pub total_votes: u64,
    pub total_participants: u64,
}

/// Request to create a poll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePoll {
    pub question: String,
    pub options: Vec<String>,
    pub duration_hours: u64,
}

impl CreatePoll {
    pub fn new(
        question: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
        duration_hours: u64,
    ) -> Self {
        Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
            duration_hours,
        }
    }

    /// Trimmed copy, or an error if any field would produce an invalid poll.
    pub fn normalized(&self) -> Result<Self, TypesError> {
        let question = self.question.trim().to_string();
        let options: Vec<String> = self.options.iter().map(|o| o.trim().to_string()).collect();
        if question.is_empty() {
            return Err(TypesError::InvalidInput("question is empty".into()));
        }
        if options.len() < 2 {
            return Err(TypesError::InvalidInput(format!(
                "{} options, need at least 2",
                options.len()
            )));
        }
        if let Some(index) = options.iter().position(|o| o.is_empty()) {
            return Err(TypesError::InvalidInput(format!("option {index} is empty")));
        }
        if self.duration_hours == 0 {
            return Err(TypesError::InvalidInput("duration must be at least one hour".into()));
        }
        Ok(Self {
            question,
            options,
            duration_hours: self.duration_hours,
        })
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_hours.saturating_mul(3600)
    }
}
