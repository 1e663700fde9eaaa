//! Fundamental types for chainvote.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! polls, account addresses, chain identifiers, network descriptors and timestamps.

pub mod address;
pub mod error;
pub mod network;
pub mod poll;
pub mod time;

pub use address::Address;
pub use error::TypesError;
pub use network::{ChainId, NativeCurrency, NetworkDescriptor};
pub use poll::{partition, CreatePoll, Poll, PollId, PollStats};
pub use time::{format_remaining, Clock, SystemClock, Timestamp};
