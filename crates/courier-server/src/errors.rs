//! Server error types.

use courier_core::{CodecError, SendError};

/// Errors surfaced by the server's public API.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Could not bind the listener.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An outbound object could not be encoded.
    #[error(transparent)]
    Encode(#[from] CodecError),

    /// No live connection has this id.
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    /// The connection refused the message.
    #[error("send to {conn_id} failed: {source}")]
    Send {
        /// Target connection.
        conn_id: String,
        /// Why.
        source: SendError,
    },

    /// The Prometheus recorder could not be installed.
    #[error("metrics recorder: {0}")]
    Metrics(String),
}
