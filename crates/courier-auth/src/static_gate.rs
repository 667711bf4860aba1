//! Fixed token table.

use std::collections::HashMap;

use async_trait::async_trait;
use courier_core::{AccessGate, AccessRule, CallerAttributes, Rejection};
use tracing::debug;

use crate::errors::AuthError;
use crate::rule::evaluate;

/// Gate backed by a static map of tokens to caller attributes.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenGate {
    tokens: HashMap<String, CallerAttributes>,
}

impl StaticTokenGate {
    /// Build from a token table. Empty tokens are rejected.
    pub fn new(tokens: HashMap<String, CallerAttributes>) -> Result<Self, AuthError> {
        if tokens.keys().any(String::is_empty) {
            return Err(AuthError::InvalidToken("empty token".into()));
        }
        Ok(Self { tokens })
    }

    /// Add one token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, attributes: CallerAttributes) -> Self {
        let _ = self.tokens.insert(token.into(), attributes);
        self
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl AccessGate for StaticTokenGate {
    async fn check(
        &self,
        token: Option<&str>,
        rule: &AccessRule,
    ) -> Result<CallerAttributes, Rejection> {
        evaluate(token, rule, |t| {
            let found = self.tokens.get(t).cloned();
            if found.is_none() {
                debug!("unknown static token");
            }
            found
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{Value, json};

    fn attrs(value: Value) -> CallerAttributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn gate() -> StaticTokenGate {
        StaticTokenGate::default()
            .with_token("alice-token", attrs(json!({"user": "alice", "role": "admin"})))
            .with_token("bob-token", attrs(json!({"user": "bob", "role": ["dev"]})))
    }

    #[test]
    fn empty_token_rejected() {
        let mut table = HashMap::new();
        let _ = table.insert(String::new(), CallerAttributes::new());
        assert_matches!(StaticTokenGate::new(table), Err(AuthError::InvalidToken(_)));
    }

    #[test]
    fn builder_counts_tokens() {
        assert_eq!(gate().len(), 2);
        assert!(StaticTokenGate::default().is_empty());
    }

    #[tokio::test]
    async fn admin_allowed() {
        let rule = AccessRule::new(json!({"role": "admin"}));
        let out = gate().check(Some("alice-token"), &rule).await.unwrap();
        assert_eq!(out["user"], "alice");
    }

    #[tokio::test]
    async fn wrong_role_denied() {
        let rule = AccessRule::new(json!({"role": "admin"}));
        let err = gate().check(Some("bob-token"), &rule).await.unwrap_err();
        assert_eq!(err.reason, "access denied: role");
    }

    #[tokio::test]
    async fn unknown_token() {
        let rule = AccessRule::new(json!({"role": "admin"}));
        let err = gate().check(Some("mallory"), &rule).await.unwrap_err();
        assert_eq!(err.reason, "invalid token");

        let open = gate().check(Some("mallory"), &AccessRule::default()).await.unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn unrestricted_carries_attributes() {
        let out = gate()
            .check(Some("bob-token"), &AccessRule::default())
            .await
            .unwrap();
        assert_eq!(out["user"], "bob");
    }
}
