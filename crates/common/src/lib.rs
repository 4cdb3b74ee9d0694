// ================
// common/src/lib.rs
// ================
//! Request and response bodies exchanged between `authgate` and its clients.
//! The server deserializes the requests and serializes the responses; clients
//! do the reverse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token scheme advertised in every token response
pub const BEARER: &str = "Bearer";

/// Body of `POST /register` and `POST /login`
/// # Fields
/// * `identity` - Unique identifier of the account, usually an email
/// * `secret` - Plaintext secret, only ever held long enough to hash or verify
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CredentialsRequest {
    #[serde(alias = "email")]
    pub identity: String,
    #[serde(alias = "password")]
    pub secret: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Successful response to registration or login
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    /// Signed bearer token
    pub token: String,
    /// Always `"Bearer"`
    pub token_type: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl TokenResponse {
    pub fn bearer(token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            token_type: BEARER.to_string(),
            expires_at,
        }
    }
}

/// Response of a protected route: who the token was issued to
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityResponse {
    pub identity: String,
}

/// Error envelope, `{"error": {"code": .., "message": ..}}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_accept_legacy_field_names() {
        let req: CredentialsRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"pw"}"#).unwrap();
        assert_eq!(req.identity, "a@example.com");
        assert_eq!(req.secret, "pw");
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let req = CredentialsRequest {
            identity: "a@example.com".to_string(),
            secret: "hunter2".to_string(),
        };
        let printed = format!("{req:?}");
        assert!(printed.contains("a@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn token_response_is_bearer() {
        let resp = TokenResponse::bearer("abc".to_string(), Utc::now());
        assert_eq!(resp.token_type, "Bearer");

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["token"], "abc");
        assert!(json["expires_at"].is_string());
    }

    #[test]
    fn error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("AUTH_001", "Authentication failed"))
            .unwrap();
        assert_eq!(json["error"]["code"], "AUTH_001");
        assert_eq!(json["error"]["message"], "Authentication failed");
    }
}
