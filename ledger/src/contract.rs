//! The poll contract interface: canonical signatures and value mapping.

use chainvote_types::{Poll, PollId, PollStats, Timestamp};
use serde::{Deserialize, Serialize};

use crate::abi::{AbiError, ParamType, Token};

/// Canonical function and event signatures of the poll contract.
///
/// Every supported deployment shares the default set. A deployment with a
/// different interface supplies its own through configuration instead of a
/// separate client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollAbi {
    pub create_poll: String,
    pub vote: String,
    pub end_poll: String,
    pub extend_poll: String,
    pub get_poll: String,
    pub get_active_polls: String,
    pub get_polls: String,
    pub has_voted: String,
    pub get_user_vote: String,
    pub get_user_polls: String,
    pub get_user_votes: String,
    pub get_stats: String,
    pub poll_count: String,
    pub poll_created: String,
    pub vote_cast: String,
    pub poll_ended: String,
    pub poll_extended: String,
}

impl Default for PollAbi {
    fn default() -> Self {
        Self {
            create_poll: "createPoll(string,string[],uint256)".into(),
            vote: "vote(uint256,uint256)".into(),
            end_poll: "endPoll(uint256)".into(),
            extend_poll: "extendPoll(uint256,uint256)".into(),
            get_poll: "getPoll(uint256)".into(),
            get_active_polls: "getActivePolls()".into(),
            get_polls: "getPolls(uint256,uint256)".into(),
            has_voted: "hasVoted(uint256,address)".into(),
            get_user_vote: "getUserVote(uint256,address)".into(),
            get_user_polls: "getUserPolls(address)".into(),
            get_user_votes: "getUserVotes(address)".into(),
            get_stats: "getStats()".into(),
            poll_count: "pollCount()".into(),
            poll_created: "PollCreated(uint256,string,address,uint256,uint256)".into(),
            vote_cast: "VoteCast(uint256,address,uint256,uint256)".into(),
            poll_ended: "PollEnded(uint256,uint256,uint256)".into(),
            poll_extended: "PollExtended(uint256,uint256)".into(),
        }
    }
}

/// `tuple(uint256 id, string question, string[] options, uint256[] votes,
/// uint256 totalVotes, address creator, bool isActive, uint256 createdAt,
/// uint256 endTime)`
pub fn poll_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint,
        ParamType::String,
        ParamType::Array(Box::new(ParamType::String)),
        ParamType::Array(Box::new(ParamType::Uint)),
        ParamType::Uint,
        ParamType::Address,
        ParamType::Bool,
        ParamType::Uint,
        ParamType::Uint,
    ])
}

pub fn poll_list_type() -> ParamType {
    ParamType::Array(Box::new(poll_type()))
}

/// `tuple(uint256 totalPolls, uint256 activePolls, uint256 totalVotes,
/// uint256 totalParticipants)`, a static tuple encoded inline.
pub fn stats_type() -> ParamType {
    ParamType::Tuple(vec![ParamType::Uint; 4])
}

fn take(fields: &mut std::vec::IntoIter<Token>) -> Result<Token, AbiError> {
    fields.next().ok_or(AbiError::TypeMismatch {
        expected: "field",
        found: "end of tuple",
    })
}

pub fn poll_from_token(token: Token) -> Result<Poll, AbiError> {
    let mut fields = token.into_tuple()?.into_iter();
    let id = PollId::new(take(&mut fields)?.into_u64()?);
    let question = take(&mut fields)?.into_string()?;
    let options = take(&mut fields)?
        .into_array()?
        .into_iter()
        .map(Token::into_string)
        .collect::<Result<Vec<_>, _>>()?;
    let votes = take(&mut fields)?
        .into_array()?
        .into_iter()
        .map(Token::into_u64)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Poll {
        id,
        question,
        options,
        votes,
        total_votes: take(&mut fields)?.into_u64()?,
        creator: take(&mut fields)?.into_address()?,
        is_active: take(&mut fields)?.into_bool()?,
        created_at: Timestamp::new(take(&mut fields)?.into_u64()?),
        end_time: Timestamp::new(take(&mut fields)?.into_u64()?),
    })
}

pub fn poll_to_token(poll: &Poll) -> Token {
    Token::Tuple(vec![
        Token::Uint(poll.id.as_u64().into()),
        Token::String(poll.question.clone()),
        Token::Array(poll.options.iter().cloned().map(Token::String).collect()),
        Token::Array(poll.votes.iter().map(|v| Token::Uint((*v).into())).collect()),
        Token::Uint(poll.total_votes.into()),
        Token::Address(poll.creator),
        Token::Bool(poll.is_active),
        Token::Uint(poll.created_at.as_secs().into()),
        Token::Uint(poll.end_time.as_secs().into()),
    ])
}

pub fn polls_from_token(token: Token) -> Result<Vec<Poll>, AbiError> {
    token.into_array()?.into_iter().map(poll_from_token).collect()
}

pub fn stats_from_token(token: Token) -> Result<PollStats, AbiError> {
    let mut fields = token.into_tuple()?.into_iter();
    Ok(PollStats {
        total_polls: take(&mut fields)?.into_u64()?,
        active_polls: take(&mut fields)?.into_u64()?,
        total_votes: take(&mut fields)?.into_u64()?,
        total_participants: take(&mut fields)?.into_u64()?,
    })
}

pub fn stats_to_token(stats: &PollStats) -> Token {
    Token::Tuple(vec![
        Token::Uint(stats.total_polls.into()),
        Token::Uint(stats.active_polls.into()),
        Token::Uint(stats.total_votes.into()),
        Token::Uint(stats.total_participants.into()),
    ])
}

pub fn ids_from_token(token: Token) -> Result<Vec<PollId>, AbiError> {
    token
        .into_array()?
        .into_iter()
        .map(|t| t.into_u64().map(PollId::new))
        .collect()
}
