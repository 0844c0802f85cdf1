//! Server-wide shutdown signal.
//!
//! One root [`CancellationToken`] is owned here. `axum::serve` waits on
//! [`ShutdownCoordinator::serve_signal`] and every channel session holds a
//! child from [`ShutdownCoordinator::session_token`], so triggering shutdown
//! stops accepting and closes every open channel.

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::info;

/// Owner of the root shutdown token.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    root: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create an untriggered coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for one channel session. Cancelling it does not affect the root.
    pub fn session_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Future that resolves once shutdown is triggered.
    pub fn serve_signal(&self) -> WaitForCancellationFutureOwned {
        self.root.clone().cancelled_owned()
    }

    /// Trigger shutdown. Later calls are no-ops.
    pub fn shutdown(&self) {
        if !self.root.is_cancelled() {
            info!("shutdown triggered");
            self.root.cancel();
        }
    }

    /// Whether shutdown has been triggered.
    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_untriggered() {
        assert!(!ShutdownCoordinator::new().is_shutting_down());
    }

    #[test]
    fn session_tokens_follow_root() {
        let coord = ShutdownCoordinator::new();
        let a = coord.session_token();
        let b = coord.session_token();
        coord.shutdown();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        coord.shutdown();
        assert!(coord.is_shutting_down());
    }

    #[test]
    fn ending_one_session_leaves_root_alone() {
        let coord = ShutdownCoordinator::new();
        let a = coord.session_token();
        let b = coord.session_token();
        a.cancel();
        assert!(!b.is_cancelled());
        assert!(!coord.is_shutting_down());
    }

    #[tokio::test]
    async fn serve_signal_resolves_on_shutdown() {
        let coord = ShutdownCoordinator::new();
        let signal = coord.serve_signal();
        let waiter = tokio::spawn(signal);
        coord.shutdown();
        waiter.await.unwrap();
    }
}
