//! Cancellation shared by the engine's in-flight waits.

use std::sync::Arc;
use tokio::sync::watch;

/// Cancels every confirmation wait and the event loop of one engine.
///
/// Clones share the same state. Cancelling is permanent: a token never
/// becomes live again. Transactions already submitted are not recalled;
/// the ledger may still apply them.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_every_waiter() {
        let token = CancelToken::new();
        let a = tokio::spawn({
            let t = token.clone();
            async move { t.cancelled().await }
        });
        let b = tokio::spawn({
            let t = token.clone();
            async move { t.cancelled().await }
        });
        tokio::task::yield_now().await;
        token.cancel();
        a.await.unwrap();
        b.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn late_waiters_see_earlier_cancel() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("already cancelled");
    }

    #[tokio::test]
    async fn live_token_does_not_resolve() {
        let token = CancelToken::new();
        assert!(tokio::time::timeout(Duration::from_millis(20), token.cancelled())
            .await
            .is_err());
        assert!(!token.is_cancelled());
    }
}
