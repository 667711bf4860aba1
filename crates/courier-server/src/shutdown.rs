//! Server-wide stop signal.
//!
//! One [`CancellationToken`] is shared by the axum listener and every
//! `WebSocket` session. Firing it stops accepting connections, makes each
//! session writer send a Close frame, and lets the session remove itself from
//! the connection registry.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Upper bound on how long the binary waits for the listener to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the stop signal for one [`crate::CourierServer`].
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator that has not fired.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token for the listener or a session to await.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Close every session and stop the listener. Idempotent.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested, closing sessions");
        }
        self.token.cancel();
    }

    /// Whether [`ShutdownCoordinator::shutdown`] has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fire the signal and wait for the serve tasks returned by
    /// [`crate::CourierServer::listen`].
    ///
    /// Returns `false` when `limit` (default ten seconds) elapsed first; the
    /// remaining tasks are left running.
    pub async fn graceful_shutdown(
        &self,
        serve_tasks: Vec<JoinHandle<()>>,
        limit: Option<Duration>,
    ) -> bool {
        let limit = limit.unwrap_or(DRAIN_TIMEOUT);
        self.shutdown();

        let pending = serve_tasks.len();
        match tokio::time::timeout(limit, futures::future::join_all(serve_tasks)).await {
            Ok(results) => {
                let panicked = results.iter().filter(|r| r.is_err()).count();
                if panicked > 0 {
                    warn!(panicked, "serve task ended abnormally");
                }
                info!(tasks = pending, "listener drained");
                true
            }
            Err(_) => {
                warn!(tasks = pending, ?limit, "listener still draining, giving up");
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
