//! Contract events carried in transaction receipts, and a fan-out bus for
//! observers.

use chainvote_types::{Address, PollId, Timestamp};

use crate::abi::{decode, encode, event_topic, AbiError, ParamType, Token};
use crate::contract::PollAbi;

/// A raw log entry from a receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// Events the poll contract emits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    PollCreated {
        poll_id: PollId,
        creator: Address,
        question: String,
        end_time: Timestamp,
        option_count: u64,
    },
    VoteCast {
        poll_id: PollId,
        voter: Address,
        option_index: u64,
        timestamp: Timestamp,
    },
    PollEnded {
        poll_id: PollId,
        total_votes: u64,
        winning_option: u64,
    },
    PollExtended {
        poll_id: PollId,
        new_end_time: Timestamp,
    },
}

fn uint_topic(v: u64) -> [u8; 32] {
    let mut topic = [0u8; 32];
    topic[24..].copy_from_slice(&v.to_be_bytes());
    topic
}

fn address_topic(a: &Address) -> [u8; 32] {
    let mut topic = [0u8; 32];
    topic[12..].copy_from_slice(a.as_bytes());
    topic
}

fn topic_u64(topic: &[u8; 32]) -> Result<u64, AbiError> {
    decode(&[ParamType::Uint], topic)?.remove(0).into_u64()
}

fn topic_address(topic: &[u8; 32]) -> Result<Address, AbiError> {
    decode(&[ParamType::Address], topic)?.remove(0).into_address()
}

fn indexed(log: &Log, position: usize) -> Result<&[u8; 32], AbiError> {
    log.topics.get(position).ok_or(AbiError::OutOfBounds {
        offset: position,
        needed: 1,
        len: log.topics.len(),
    })
}

impl LedgerEvent {
    pub fn poll_id(&self) -> PollId {
        match self {
            Self::PollCreated { poll_id, .. }
            | Self::VoteCast { poll_id, .. }
            | Self::PollEnded { poll_id, .. }
            | Self::PollExtended { poll_id, .. } => *poll_id,
        }
    }

    /// Decode `log` if its topic 0 is one of the contract's events.
    /// Foreign events yield `Ok(None)`.
    pub fn decode(abi: &PollAbi, log: &Log) -> Result<Option<Self>, AbiError> {
        let Some(topic0) = log.topics.first() else {
            return Ok(None);
        };
        let event = if *topic0 == event_topic(&abi.poll_created) {
            let mut data = decode(
                &[ParamType::String, ParamType::Uint, ParamType::Uint],
                &log.data,
            )?
            .into_iter();
            let mut next = || {
                data.next().ok_or(AbiError::TypeMismatch {
                    expected: "field",
                    found: "end of data",
                })
            };
            Self::PollCreated {
                poll_id: PollId::new(topic_u64(indexed(log, 1)?)?),
                creator: topic_address(indexed(log, 2)?)?,
                question: next()?.into_string()?,
                end_time: Timestamp::new(next()?.into_u64()?),
                option_count: next()?.into_u64()?,
            }
        } else if *topic0 == event_topic(&abi.vote_cast) {
            let data = decode(&[ParamType::Uint, ParamType::Uint], &log.data)?;
            let [option_index, timestamp] = two_uints(data)?;
            Self::VoteCast {
                poll_id: PollId::new(topic_u64(indexed(log, 1)?)?),
                voter: topic_address(indexed(log, 2)?)?,
                option_index,
                timestamp: Timestamp::new(timestamp),
            }
        } else if *topic0 == event_topic(&abi.poll_ended) {
            let data = decode(&[ParamType::Uint, ParamType::Uint], &log.data)?;
            let [total_votes, winning_option] = two_uints(data)?;
            Self::PollEnded {
                poll_id: PollId::new(topic_u64(indexed(log, 1)?)?),
                total_votes,
                winning_option,
            }
        } else if *topic0 == event_topic(&abi.poll_extended) {
            let new_end_time = decode(&[ParamType::Uint], &log.data)?.remove(0).into_u64()?;
            Self::PollExtended {
                poll_id: PollId::new(topic_u64(indexed(log, 1)?)?),
                new_end_time: Timestamp::new(new_end_time),
            }
        } else {
            return Ok(None);
        };
        Ok(Some(event))
    }

    /// The log the contract at `contract` would emit for this event.
    pub fn to_log(&self, abi: &PollAbi, contract: Address) -> Log {
        let (signature, topics, data) = match self {
            Self::PollCreated {
                poll_id,
                creator,
                question,
                end_time,
                option_count,
            } => (
                &abi.poll_created,
                vec![uint_topic(poll_id.as_u64()), address_topic(creator)],
                vec![
                    Token::String(question.clone()),
                    Token::Uint(end_time.as_secs().into()),
                    Token::Uint((*option_count).into()),
                ],
            ),
            Self::VoteCast {
                poll_id,
                voter,
                option_index,
                timestamp,
            } => (
                &abi.vote_cast,
                vec![uint_topic(poll_id.as_u64()), address_topic(voter)],
                vec![
                    Token::Uint((*option_index).into()),
                    Token::Uint(timestamp.as_secs().into()),
                ],
            ),
            Self::PollEnded {
                poll_id,
                total_votes,
                winning_option,
            } => (
                &abi.poll_ended,
                vec![uint_topic(poll_id.as_u64())],
                vec![
                    Token::Uint((*total_votes).into()),
                    Token::Uint((*winning_option).into()),
                ],
            ),
            Self::PollExtended {
                poll_id,
                new_end_time,
            } => (
                &abi.poll_extended,
                vec![uint_topic(poll_id.as_u64())],
                vec![Token::Uint(new_end_time.as_secs().into())],
            ),
        };
        let mut all_topics = vec![event_topic(signature)];
        all_topics.extend(topics);
        Log {
            address: contract,
            topics: all_topics,
            data: encode(&data),
        }
    }
}

fn two_uints(tokens: Vec<Token>) -> Result<[u64; 2], AbiError> {
    let mut it = tokens.into_iter();
    match (it.next(), it.next()) {
        (Some(a), Some(b)) => Ok([a.into_u64()?, b.into_u64()?]),
        _ => Err(AbiError::TypeMismatch {
            expected: "two uints",
            found: "fewer values",
        }),
    }
}

/// Synchronous fan-out of decoded ledger events.
///
/// Listeners run inline on the emitting task; keep them fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn contract() -> Address {
        Address::new([0xcc; 20])
    }

    #[test]
    fn poll_created_log_layout() {
        let abi = PollAbi::default();
        let event = LedgerEvent::PollCreated {
            poll_id: PollId::new(12),
            creator: Address::new([0x22; 20]),
            question: "Ship it?".into(),
            end_time: Timestamp::new(1_700_000_000),
            option_count: 2,
        };
        let log = event.to_log(&abi, contract());
        assert_eq!(log.topics.len(), 3);
        assert_eq!(log.topics[1][31], 12);
        assert_eq!(&log.topics[2][12..], &[0x22; 20]);
        assert_eq!(LedgerEvent::decode(&abi, &log).unwrap(), Some(event));
    }

    #[test]
    fn decodes_every_kind() {
        let abi = PollAbi::default();
        let events = [
            LedgerEvent::VoteCast {
                poll_id: PollId::new(1),
                voter: Address::new([3; 20]),
                option_index: 1,
                timestamp: Timestamp::new(99),
            },
            LedgerEvent::PollEnded {
                poll_id: PollId::new(2),
                total_votes: 10,
                winning_option: 0,
            },
            LedgerEvent::PollExtended {
                poll_id: PollId::new(3),
                new_end_time: Timestamp::new(5_000),
            },
        ];
        for event in events {
            let log = event.to_log(&abi, contract());
            assert_eq!(LedgerEvent::decode(&abi, &log).unwrap(), Some(event.clone()));
            assert_eq!(
                LedgerEvent::decode(&abi, &log).unwrap().unwrap().poll_id(),
                event.poll_id()
            );
        }
    }

    #[test]
    fn foreign_and_empty_logs_are_skipped() {
        let abi = PollAbi::default();
        let foreign = Log {
            address: contract(),
            topics: vec![event_topic("Transfer(address,address,uint256)")],
            data: Vec::new(),
        };
        assert_eq!(LedgerEvent::decode(&abi, &foreign).unwrap(), None);
        let anonymous = Log {
            address: contract(),
            topics: Vec::new(),
            data: Vec::new(),
        };
        assert_eq!(LedgerEvent::decode(&abi, &anonymous).unwrap(), None);
    }

    #[test]
    fn missing_indexed_topic_is_an_error() {
        let abi = PollAbi::default();
        let log = Log {
            address: contract(),
            topics: vec![event_topic(&abi.poll_ended)],
            data: encode(&[Token::Uint(1), Token::Uint(0)]),
        };
        assert!(LedgerEvent::decode(&abi, &log).is_err());
    }

    #[test]
    fn bus_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));
        bus.emit(&LedgerEvent::PollExtended {
            poll_id: PollId::new(1),
            new_end_time: Timestamp::new(1),
        });
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert_eq!(bus.len(), 2);
    }
}
