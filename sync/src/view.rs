//! Display-ready projections of polls.
//!
//! Everything here is recomputed from a [`Poll`], the current time and the
//! viewer; nothing is stored back into the cache.

use chainvote_types::{format_remaining, Address, Poll, PollId, Timestamp};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub index: usize,
    pub label: String,
    pub votes: u64,
    pub percentage: u32,
    /// Set on every option sharing the top count, and only once someone voted.
    pub is_winning: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: PollId,
    pub question: String,
    pub options: Vec<OptionView>,
    pub total_votes: u64,
    pub creator_short: String,
    pub is_active: bool,
    pub is_creator: bool,
    pub can_vote: bool,
    pub can_end: bool,
    pub remaining_label: String,
}

impl PollView {
    pub fn new(poll: &Poll, now: Timestamp, viewer: Option<&Address>) -> Self {
        let is_active = poll.is_open_at(now);
        let is_creator = viewer.is_some_and(|v| poll.is_creator(v));
        let max = poll.votes.iter().copied().max().unwrap_or(0);
        let options = poll
            .options
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let votes = poll.votes.get(index).copied().unwrap_or(0);
                OptionView {
                    index,
                    label: label.clone(),
                    votes,
                    percentage: poll.vote_percentage(index),
                    is_winning: poll.total_votes > 0 && votes == max,
                }
            })
            .collect();
        Self {
            id: poll.id,
            question: poll.question.clone(),
            options,
            total_votes: poll.total_votes,
            creator_short: poll.creator.short(),
            is_active,
            is_creator,
            can_vote: viewer.is_some() && is_active,
            can_end: is_creator && is_active,
            remaining_label: if is_active {
                format_remaining(poll.end_time, now)
            } else {
                "Ended".to_string()
            },
        }
    }
}

/// Views split into (active, ended), each in input order.
pub fn split_views(polls: &[Poll], now: Timestamp, viewer: Option<&Address>) -> (Vec<PollView>, Vec<PollView>) {
    polls
        .iter()
        .map(|p| PollView::new(p, now, viewer))
        .partition(|v| v.is_active)
}
