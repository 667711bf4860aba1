//! HS256 JSON Web Token verification.
//!
//! Every claim of a verified token becomes a caller attribute. Expiry is
//! always enforced; the issuer and audience only when configured.

use std::fmt;

use async_trait::async_trait;
use courier_core::{AccessGate, AccessRule, CallerAttributes, Rejection};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::errors::AuthError;
use crate::rule::evaluate;

/// Gate that verifies HS256-signed JWTs.
pub struct JwtGate {
    key: DecodingKey,
    validation: Validation,
}

impl JwtGate {
    /// Build a gate for `secret`, optionally pinned to `issuer`.
    pub fn new(secret: &str, issuer: Option<&str>) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Require the `aud` claim to contain `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    fn verify(&self, token: &str) -> Option<CallerAttributes> {
        match jsonwebtoken::decode::<CallerAttributes>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "jwt verification failed");
                None
            }
        }
    }
}

impl fmt::Debug for JwtGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtGate")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AccessGate for JwtGate {
    async fn check(
        &self,
        token: Option<&str>,
        rule: &AccessRule,
    ) -> Result<CallerAttributes, Rejection> {
        evaluate(token, rule, |t| self.verify(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::{Value, json};

    const SECRET: &str = "test-secret";
    const FAR_FUTURE: u64 = 4_102_444_800;

    fn sign(secret: &str, claims: &Value) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn admin_rule() -> AccessRule {
        AccessRule::new(json!({"role": "admin"}))
    }

    #[test]
    fn empty_secret_rejected() {
        assert_matches!(JwtGate::new("", None), Err(AuthError::MissingSecret));
    }

    #[tokio::test]
    async fn valid_token_claims_become_attributes() {
        let gate = JwtGate::new(SECRET, None).unwrap();
        let token = sign(SECRET, &json!({"sub": "u1", "role": "admin", "exp": FAR_FUTURE}));
        let attrs = gate.check(Some(&token), &admin_rule()).await.unwrap();
        assert_eq!(attrs["sub"], "u1");
        assert_eq!(attrs["role"], "admin");
    }

    #[tokio::test]
    async fn wrong_signature_is_invalid() {
        let gate = JwtGate::new(SECRET, None).unwrap();
        let token = sign("other", &json!({"role": "admin", "exp": FAR_FUTURE}));
        let err = gate.check(Some(&token), &admin_rule()).await.unwrap_err();
        assert_eq!(err.reason, "invalid token");
    }

    #[tokio::test]
    async fn expired_token_is_invalid() {
        let gate = JwtGate::new(SECRET, None).unwrap();
        let token = sign(SECRET, &json!({"role": "admin", "exp": 1_000}));
        let err = gate.check(Some(&token), &admin_rule()).await.unwrap_err();
        assert_eq!(err.reason, "invalid token");
    }

    #[tokio::test]
    async fn issuer_enforced_when_configured() {
        let gate = JwtGate::new(SECRET, Some("courier")).unwrap();
        let good = sign(SECRET, &json!({"role": "admin", "iss": "courier", "exp": FAR_FUTURE}));
        let bad = sign(SECRET, &json!({"role": "admin", "iss": "elsewhere", "exp": FAR_FUTURE}));
        assert!(gate.check(Some(&good), &admin_rule()).await.is_ok());
        assert!(gate.check(Some(&bad), &admin_rule()).await.is_err());
    }

    #[tokio::test]
    async fn garbage_token_on_open_handler_yields_no_attributes() {
        let gate = JwtGate::new(SECRET, None).unwrap();
        let attrs = gate
            .check(Some("not.a.jwt"), &AccessRule::default())
            .await
            .unwrap();
        assert!(attrs.is_empty());
    }

    #[tokio::test]
    async fn insufficient_claims_denied() {
        let gate = JwtGate::new(SECRET, None).unwrap();
        let token = sign(SECRET, &json!({"role": "viewer", "exp": FAR_FUTURE}));
        let err = gate.check(Some(&token), &admin_rule()).await.unwrap_err();
        assert_eq!(err.reason, "access denied: role");
    }

    #[tokio::test]
    async fn audience_claim_accepted_without_configured_audience() {
        let gate = JwtGate::new(SECRET, None).unwrap();
        let token = sign(
            SECRET,
            &json!({"role": "admin", "aud": "courier-clients", "exp": FAR_FUTURE}),
        );
        let attrs = gate.check(Some(&token), &admin_rule()).await.unwrap();
        assert_eq!(attrs["aud"], "courier-clients");
    }

    #[tokio::test]
    async fn audience_enforced_when_configured() {
        let gate = JwtGate::new(SECRET, None)
            .unwrap()
            .with_audience("courier-clients");
        let good = sign(
            SECRET,
            &json!({"role": "admin", "aud": "courier-clients", "exp": FAR_FUTURE}),
        );
        let other = sign(SECRET, &json!({"role": "admin", "aud": "billing", "exp": FAR_FUTURE}));
        let missing = sign(SECRET, &json!({"role": "admin", "exp": FAR_FUTURE}));
        assert!(gate.check(Some(&good), &admin_rule()).await.is_ok());
        assert_eq!(
            gate.check(Some(&other), &admin_rule()).await.unwrap_err().reason,
            "invalid token"
        );
        assert!(gate.check(Some(&missing), &admin_rule()).await.is_err());
    }

    #[test]
    fn debug_omits_key_material() {
        let gate = JwtGate::new(SECRET, Some("courier")).unwrap();
        let rendered = format!("{gate:?}");
        assert!(rendered.starts_with("JwtGate"));
        assert!(!rendered.contains(SECRET));
    }
}
