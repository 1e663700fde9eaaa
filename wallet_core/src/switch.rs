//! Moving the wallet onto a supported chain.

use chainvote_types::NetworkDescriptor;

use crate::{ProviderError, WalletProvider};

/// Result of a switch attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum SwitchOutcome {
    /// The wallet switched to the target chain.
    Switched,
    /// The wallet did not know the chain; it was added (and selected).
    Added,
    /// The user declined. An expected outcome, not an error.
    Declined,
    Failed(ProviderError),
}

impl SwitchOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Switched | Self::Added)
    }
}

/// Ask the wallet to switch to `target`, adding the chain first if the
/// wallet reports it as unrecognised.
pub async fn switch_network(
    provider: &dyn WalletProvider,
    target: &NetworkDescriptor,
) -> SwitchOutcome {
    let chain_id = target.chain_id;
    match provider.switch_chain(chain_id).await {
        Ok(()) => {
            tracing::info!(%chain_id, network = %target.name, "switched network");
            SwitchOutcome::Switched
        }
        Err(ProviderError::UnrecognizedChain) => {
            tracing::info!(%chain_id, network = %target.name, "wallet does not know chain, adding it");
            match provider.add_chain(target).await {
                Ok(()) => SwitchOutcome::Added,
                Err(ProviderError::UserRejected) => {
                    tracing::info!(%chain_id, "user declined adding network");
                    SwitchOutcome::Declined
                }
                Err(e) => {
                    tracing::error!(%chain_id, error = %e, "error adding network");
                    SwitchOutcome::Failed(e)
                }
            }
        }
        Err(ProviderError::UserRejected) => {
            tracing::info!(%chain_id, "user declined network switch");
            SwitchOutcome::Declined
        }
        Err(e) => {
            tracing::error!(%chain_id, error = %e, "error switching network");
            SwitchOutcome::Failed(e)
        }
    }
}
