//! Poll synchronization for chainvote.
//!
//! [`PollSyncEngine`] keeps a local poll list consistent with the on-chain
//! contract across wallet connection, account and chain changes, and runs
//! every poll mutation through one gated, timed, reconciled sequence.
//!
//! - [`config`]: TOML configuration
//! - [`engine`]: the engine itself
//! - [`cache`]: confirmed polls and pending projections
//! - [`view`]: display derivations for the presentation layer
//! - [`bootstrap`]: wiring to a JSON-RPC wallet node

pub mod action_lock;
pub mod bootstrap;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod notice;
pub mod view;

pub use action_lock::{ActionKey, ActionKind};
pub use bootstrap::{build, build_with_transport, spawn_change_poller, Runtime};
pub use cache::PendingPoll;
pub use cancel::CancelToken;
pub use config::{LoadStrategy, SyncConfig};
pub use engine::PollSyncEngine;
pub use error::SyncError;
pub use logging::{init_logging, LogFormat};
pub use notice::{FailureKind, Notice};
pub use view::{split_views, OptionView, PollView};
