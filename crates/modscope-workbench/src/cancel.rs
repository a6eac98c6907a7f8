use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation signal, checked at every suspension point of a
/// resolution and before every cache/index commit.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    receiver: watch::Receiver<bool>,
    /// Set only for [`never`](Self::never) tokens, which own their sender so
    /// waiters are not woken by a dropped handle.
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

/// The firing side of a token. The session holds the handle of the
/// in-flight resolution and fires it when a newer request supersedes it.
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl CancellationToken {
    pub fn new() -> (Self, CancellationHandle) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                receiver,
                _keepalive: None,
            },
            CancellationHandle { sender },
        )
    }

    /// A token that can never fire, for callers that do not cancel.
    pub fn never() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            receiver,
            _keepalive: Some(Arc::new(sender)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested. A dropped handle counts as
    /// cancellation so orphaned waiters do not hang.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        while !*receiver.borrow() {
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

impl CancellationHandle {
    /// Signals cancellation to every clone of the token.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn fires_across_clones() {
        let (token, handle) = CancellationToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        assert!(timeout(Duration::from_millis(100), other.cancelled())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn dropped_handle_unblocks_waiters() {
        let (token, handle) = CancellationToken::new();
        drop(handle);
        assert!(timeout(Duration::from_millis(100), token.cancelled())
            .await
            .is_ok());
    }

    #[test]
    fn never_token_stays_live() {
        let token = CancellationToken::never();
        assert!(!token.is_cancelled());
    }
}
