//! Failure classification and user-facing notices.

use chainvote_ledger::LedgerError;
use chainvote_wallet_core::ProviderError;
use std::fmt;

/// Why an engine operation resolved to `false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No wallet session.
    NotConnected,
    /// No wallet provider installed.
    NoProvider,
    /// The user declined a prompt (connection, signature or network switch).
    UserRejected,
    /// The wallet is on a chain outside the registry and was not switched.
    UnsupportedNetwork,
    /// The wallet reported a chain the registry does not know after switching.
    UnknownChain,
    InsufficientFunds,
    AlreadyVoted,
    /// Another action on the same poll (or another creation) is in flight.
    Busy,
    InvalidInput,
    /// Node, transport or contract-availability failure.
    Remote,
    /// The transaction was included but reverted.
    Reverted,
    /// Confirmation did not arrive within the configured timeout.
    TimedOut,
    /// The engine was cancelled while waiting.
    Cancelled,
}

impl FailureKind {
    /// Whether the user gets a notice for this kind. Declines, cancellation
    /// and gating outcomes are logged only.
    pub fn notifies(&self) -> bool {
        !matches!(
            self,
            Self::NotConnected | Self::UserRejected | Self::UnsupportedNetwork | Self::Cancelled
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotConnected => "not connected",
            Self::NoProvider => "no provider",
            Self::UserRejected => "user rejected",
            Self::UnsupportedNetwork => "unsupported network",
            Self::UnknownChain => "unknown chain",
            Self::InsufficientFunds => "insufficient funds",
            Self::AlreadyVoted => "already voted",
            Self::Busy => "busy",
            Self::InvalidInput => "invalid input",
            Self::Remote => "remote failure",
            Self::Reverted => "reverted",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl From<&LedgerError> for FailureKind {
    fn from(e: &LedgerError) -> Self {
        match e {
            LedgerError::UserRejected => Self::UserRejected,
            LedgerError::InsufficientFunds(_) => Self::InsufficientFunds,
            LedgerError::Reverted { .. } => Self::Reverted,
            LedgerError::NotDeployed { .. }
            | LedgerError::Rpc { .. }
            | LedgerError::Transport(_)
            | LedgerError::Decode(_)
            | LedgerError::NotFound(_) => Self::Remote,
        }
    }
}

impl From<&ProviderError> for FailureKind {
    fn from(e: &ProviderError) -> Self {
        match e {
            ProviderError::NoProvider => Self::NoProvider,
            ProviderError::UserRejected => Self::UserRejected,
            ProviderError::UnrecognizedChain => Self::UnknownChain,
            ProviderError::NoAccounts => Self::NotConnected,
            ProviderError::RequestPending | ProviderError::InvalidResponse(_) | ProviderError::Rpc(_) => {
                Self::Remote
            }
        }
    }
}

/// A message for the user, sent on the engine's notice channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: FailureKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
