//! Shutdown coordination via `CancellationToken`.
//!
//! The process stops on Ctrl-C or when the debug session ends, whichever
//! comes first. Both paths cancel the same token.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Grace period for the HTTP server to drain after cancellation.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the process is stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl-C or the equivalent.
    Interrupted,
    /// The debug adapter connection closed.
    SessionEnded,
    /// Something else cancelled the token.
    Requested,
}

/// Process-wide stop switch.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create an untriggered coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token cancelled on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the first of `interrupt`, `session_end` or an explicit
    /// [`shutdown`](Self::shutdown), then cancel the token.
    pub async fn wait_for<I, S>(&self, interrupt: I, session_end: S) -> ShutdownReason
    where
        I: Future<Output = ()>,
        S: Future<Output = ()>,
    {
        let reason = tokio::select! {
            () = interrupt => ShutdownReason::Interrupted,
            () = session_end => ShutdownReason::SessionEnded,
            () = self.token.cancelled() => ShutdownReason::Requested,
        };
        info!(?reason, "shutting down");
        self.shutdown();
        reason
    }

    /// Wait up to `timeout` for `handles` to finish after cancellation.
    pub async fn drain(&self, handles: Vec<JoinHandle<()>>, timeout: Duration) {
        self.shutdown();
        let count = handles.len();
        if tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_err()
        {
            warn!(count, "shutdown timed out after {timeout:?}, some tasks may still be running");
        }
    }
}
