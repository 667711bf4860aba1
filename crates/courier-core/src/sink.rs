//! Outbound side of a connection, as seen by the router.

use std::sync::Arc;

/// Why an outbound message was not enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The connection's send queue is full.
    #[error("send queue full")]
    QueueFull,
    /// The connection is gone.
    #[error("connection closed")]
    Closed,
}

/// Somewhere replies for one connection can be written.
///
/// Implementations must not block: a slow peer is handled by queueing or
/// dropping, never by stalling the caller.
pub trait ReplySink: Send + Sync {
    /// Stable identifier of the underlying connection.
    fn id(&self) -> &str;

    /// Enqueue one encoded message.
    fn send_text(&self, text: Arc<String>) -> Result<(), SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(SendError::QueueFull.to_string(), "send queue full");
        assert_eq!(SendError::Closed.to_string(), "connection closed");
    }
}
