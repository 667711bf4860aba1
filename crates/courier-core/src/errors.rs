//! Client-visible error taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── errsrc values ───────────────────────────────────────────────────

/// Envelope missing `func` or `data`.
pub const MSGFORMAT: &str = "msgformat";
/// No handler registered under `func`.
pub const NO_SUCH_HANDLER: &str = "no-such-handler";
/// Access gate rejected the call.
pub const ACL: &str = "acl";
/// Handler-issued error.
pub const APPLICATION: &str = "application";

/// Machine-readable error category carried in a reply's `errsrc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSource {
    /// See [`MSGFORMAT`].
    #[serde(rename = "msgformat")]
    MsgFormat,
    /// See [`NO_SUCH_HANDLER`].
    #[serde(rename = "no-such-handler")]
    NoSuchHandler,
    /// See [`ACL`].
    #[serde(rename = "acl")]
    Acl,
    /// See [`APPLICATION`].
    #[serde(rename = "application")]
    Application,
}

impl ErrorSource {
    /// Wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MsgFormat => MSGFORMAT,
            Self::NoSuchHandler => NO_SUCH_HANDLER,
            Self::Acl => ACL,
            Self::Application => APPLICATION,
        }
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatch failure that is answered with an error reply.
///
/// Malformed wire input never reaches this type: without a parsed envelope
/// there is no template to reply with, so it is dropped at the codec.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// Envelope has no string `func`.
    #[error("message is missing 'func'")]
    MissingFunc,

    /// Envelope has no `data` (absent or null).
    #[error("message is missing 'data'")]
    MissingData,

    /// `func` names no registered handler.
    #[error("no handler registered for func '{func}'")]
    NoSuchHandler {
        /// The requested name.
        func: String,
    },

    /// The access gate rejected the call.
    #[error("access denied: {reason}")]
    Denied {
        /// Gate-supplied reason, relayed verbatim as `err`.
        reason: Value,
    },
}

impl RouteError {
    /// Category for `errsrc`.
    pub fn source(&self) -> ErrorSource {
        match self {
            Self::MissingFunc | Self::MissingData => ErrorSource::MsgFormat,
            Self::NoSuchHandler { .. } => ErrorSource::NoSuchHandler,
            Self::Denied { .. } => ErrorSource::Acl,
        }
    }

    /// Value for `err`.
    pub fn reason(&self) -> Value {
        match self {
            Self::Denied { reason } => reason.clone(),
            other => Value::String(other.to_string()),
        }
    }
}
