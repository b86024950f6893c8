//! Graceful shutdown coordination via `CancellationToken`.
//!
//! The root token is cancelled once. The dispatcher and the HTTP server
//! watch it directly; every WebSocket session holds a child token, so a
//! session can also be closed on its own (heartbeat timeout) without
//! affecting the others.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default timeout for graceful shutdown before giving up on tasks.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Coordinates graceful shutdown across server tasks.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Clone of the root token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token cancelled with the root but closable on its own.
    pub fn session_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel, then wait up to `timeout` for `handles` to finish.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        info!(
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let drain = futures::future::join_all(handles);
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("shutdown timed out after {timeout:?}, some tasks may still be running");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_cancels_root_token() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        assert!(!coord.is_shutting_down());
        coord.shutdown();
        coord.shutdown();
        assert!(token.is_cancelled());
        assert!(coord.is_shutting_down());
    }

    #[test]
    fn session_token_follows_root() {
        let coord = ShutdownCoordinator::new();
        let session = coord.session_token();
        coord.shutdown();
        assert!(session.is_cancelled());
    }

    #[test]
    fn session_token_cancels_alone() {
        let coord = ShutdownCoordinator::new();
        let a = coord.session_token();
        let b = coord.session_token();
        a.cancel();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!coord.is_shutting_down());
    }

    #[tokio::test]
    async fn graceful_shutdown_awaits_all_tasks() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
        });
        coord.graceful_shutdown(vec![handle], None).await;
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn graceful_shutdown_times_out() {
        let coord = ShutdownCoordinator::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(300)).await;
        });
        coord
            .graceful_shutdown(vec![handle], Some(Duration::from_millis(100)))
            .await;
        assert!(coord.is_shutting_down());
    }
}
