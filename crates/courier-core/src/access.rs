//! Access rules and the authorization contract.
//!
//! The router never interprets an [`AccessRule`]; it hands it, together with
//! the caller's token, to whatever [`AccessGate`] the application configured.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attributes describing the authenticated caller, produced by a gate.
pub type CallerAttributes = Map<String, Value>;

/// Opaque policy descriptor attached to a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessRule(Value);

impl AccessRule {
    /// Wrap a policy value.
    pub fn new(rule: Value) -> Self {
        Self(rule)
    }

    /// The rule that places no restriction (`{}`).
    pub fn unrestricted() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Whether this rule is `{}` or `null`.
    pub fn is_unrestricted(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// The raw policy value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Default for AccessRule {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl From<Value> for AccessRule {
    fn from(rule: Value) -> Self {
        Self(rule)
    }
}

/// A failure reason relayed to the client as `err`.
///
/// Produced by gates (authorization failures) and by promise handlers
/// (application failures). The reason is any JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Reason relayed verbatim.
    pub reason: Value,
}

impl Rejection {
    /// Build from any JSON value.
    pub fn new(reason: impl Into<Value>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl std::error::Error for Rejection {}

impl From<&str> for Rejection {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for Rejection {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}

impl From<Value> for Rejection {
    fn from(reason: Value) -> Self {
        Self { reason }
    }
}

/// Authorization collaborator.
///
/// Called once per inbound message, after the handler is resolved and before
/// it is invoked. Timeouts, if any, are the gate's own business.
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Resolve the caller's attributes, or reject the call.
    async fn check(
        &self,
        token: Option<&str>,
        rule: &AccessRule,
    ) -> Result<CallerAttributes, Rejection>;
}
