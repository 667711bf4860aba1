//! Gate construction errors.

/// Errors raised while building a gate.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// JWT mode without a signing secret.
    #[error("jwt secret must not be empty")]
    MissingSecret,

    /// A static token was configured twice or left empty.
    #[error("invalid static token entry: {0}")]
    InvalidToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_display() {
        assert_eq!(
            AuthError::MissingSecret.to_string(),
            "jwt secret must not be empty"
        );
    }

    #[test]
    fn invalid_token_display() {
        let err = AuthError::InvalidToken("empty token".into());
        assert_eq!(err.to_string(), "invalid static token entry: empty token");
    }
}
