//! `WebSocket` client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use courier_core::{ReplySink, SendError, codec};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use uuid::Uuid;

/// A connected `WebSocket` client.
///
/// Outbound text goes through a bounded queue drained by the session's writer
/// task, so sending never blocks the caller.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    last_seen: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection around the writer task's queue.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            last_seen: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// A fresh `conn_<uuid v7>` identifier.
    pub fn new_id() -> String {
        format!("conn_{}", Uuid::now_v7())
    }

    /// Enqueue one encoded message.
    pub fn send(&self, message: Arc<String>) -> Result<(), SendError> {
        self.tx.try_send(message).map_err(|e| {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            match e {
                TrySendError::Full(_) => SendError::QueueFull,
                TrySendError::Closed(_) => SendError::Closed,
            }
        })
    }

    /// Encode `value` and enqueue it verbatim.
    pub fn send_obj<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), crate::ServerError> {
        let text = codec::encode(value).inspect_err(|e| {
            warn!(conn_id = %self.id, error = %e, "dropping unencodable message");
        })?;
        self.send(Arc::new(text))
            .map_err(|source| crate::ServerError::Send {
                conn_id: self.id.clone(),
                source,
            })
    }

    /// Messages dropped because the queue was full or closed.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record inbound activity (any frame, including pongs).
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or since connecting).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Whether the writer side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl ReplySink for ClientConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_text(&self, text: Arc<String>) -> Result<(), SendError> {
        self.send(text)
    }
}
