use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AuthError, Claims};

/// A freshly signed token and the instant it stops being accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The three verbs the transport layer calls into.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Store a new identity and return a token for it.
    async fn register(&self, identity: &str, secret: &str) -> Result<IssuedToken, AuthError>;

    /// Check credentials and return a fresh token.
    async fn login(&self, identity: &str, secret: &str) -> Result<IssuedToken, AuthError>;

    /// Verify a presented token. Any error means the request must be rejected.
    fn authenticate(&self, token: &str) -> Result<Claims, AuthError>;
}
