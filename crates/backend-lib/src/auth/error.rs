//! Typed failures of the authentication core.
use thiserror::Error;

/// Every distinct outcome the auth core can fail with.
///
/// The HTTP boundary collapses all authentication failures into one 401, but
/// the variants stay distinct here so callers and logs can tell them apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("identity already registered")]
    DuplicateIdentity,

    #[error("identity not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    TokenExpired,

    #[error("secret hash could not be verified: {0}")]
    Verification(String),

    #[error("too many failed login attempts")]
    RateLimited,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Failures that must surface as a generic "not authenticated" to
    /// untrusted callers.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::NotFound
                | AuthError::InvalidCredentials
                | AuthError::MalformedToken(_)
                | AuthError::InvalidSignature
                | AuthError::TokenExpired
                | AuthError::Verification(_)
        )
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation",
            AuthError::DuplicateIdentity => "duplicate_identity",
            AuthError::NotFound => "not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::Verification(_) => "verification",
            AuthError::RateLimited => "rate_limited",
            AuthError::Configuration(_) => "configuration",
            AuthError::Storage(_) => "storage",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_are_authentication_failures() {
        assert!(AuthError::TokenExpired.is_authentication_failure());
        assert!(AuthError::InvalidSignature.is_authentication_failure());
        assert!(AuthError::MalformedToken("x".into()).is_authentication_failure());
        assert!(AuthError::NotFound.is_authentication_failure());
        assert!(AuthError::InvalidCredentials.is_authentication_failure());
    }

    #[test]
    fn client_errors_are_not_authentication_failures() {
        assert!(!AuthError::Validation("empty".into()).is_authentication_failure());
        assert!(!AuthError::DuplicateIdentity.is_authentication_failure());
        assert!(!AuthError::RateLimited.is_authentication_failure());
        assert!(!AuthError::Storage("disk".into()).is_authentication_failure());
    }

    #[test]
    fn kinds_are_distinct_for_token_failures() {
        let kinds = [
            AuthError::MalformedToken(String::new()).kind(),
            AuthError::InvalidSignature.kind(),
            AuthError::TokenExpired.kind(),
        ];
        assert_ne!(kinds[0], kinds[1]);
        assert_ne!(kinds[1], kinds[2]);
        assert_ne!(kinds[0], kinds[2]);
    }
}
