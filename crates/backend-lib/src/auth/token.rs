//! Signed, time-bound bearer tokens (HS256 JWS).
//!
//! Expiry is checked against the caller's clock rather than the library's, so
//! issuance and verification are pure functions of key, token and `now`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::AuthError;
use crate::config::TokenSettings;

/// Keys shorter than this are accepted but logged as weak (HS256 block size).
pub const MIN_RECOMMENDED_KEY_BYTES: usize = 32;

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the authenticated identity.
    pub sub: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds). The token is rejected from this instant on.
    pub exp: i64,
    /// Unique token ID.
    pub jti: String,
}

impl Claims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Issues and verifies tokens under one process-wide symmetric key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(settings: &TokenSettings) -> Result<Self, AuthError> {
        Self::from_secret(settings.signing_key.as_bytes(), settings.ttl())
    }

    pub fn from_secret(secret: &[u8], ttl: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("signing key is empty".to_string()));
        }
        if ttl <= Duration::zero() {
            return Err(AuthError::Configuration(
                "token lifetime must be positive".to_string(),
            ));
        }
        if secret.len() < MIN_RECOMMENDED_KEY_BYTES {
            warn!(
                key_len = secret.len(),
                "signing key is shorter than {MIN_RECOMMENDED_KEY_BYTES} bytes"
            );
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            header: Header::new(Algorithm::HS256),
            validation,
            ttl,
        })
    }

    /// Default lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `Claims { sub: subject, iat: now, exp: now + ttl }`.
    pub fn issue(
        &self,
        subject: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal("token expiry overflows".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        jsonwebtoken::encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("JWT encode: {e}")))
    }

    /// Decode a token, check its signature, then check `now < exp`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)?;

        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::MalformedToken(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KEY: &[u8] = b"unit-test-signing-key-0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::from_secret(KEY, Duration::minutes(5)).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issue_then_verify_within_lifetime() {
        let codec = codec();
        let token = codec.issue("alice@example.com", t0(), codec.ttl()).unwrap();

        let claims = codec.verify(&token, t0() + Duration::seconds(1)).unwrap();
        assert_eq!(claims.subject(), "alice@example.com");
        assert_eq!(claims.issued_at(), Some(t0()));
        assert_eq!(claims.expires_at(), Some(t0() + Duration::minutes(5)));

        // Last valid second
        assert!(codec
            .verify(&token, t0() + Duration::minutes(5) - Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn expired_at_and_after_exp() {
        let codec = codec();
        let token = codec.issue("alice@example.com", t0(), codec.ttl()).unwrap();

        let at_exp = codec.verify(&token, t0() + Duration::minutes(5));
        assert_eq!(at_exp, Err(AuthError::TokenExpired));

        let later = codec.verify(&token, t0() + Duration::hours(3));
        assert_eq!(later, Err(AuthError::TokenExpired));
    }

    #[test]
    fn other_key_is_invalid_signature() {
        let token = codec().issue("alice@example.com", t0(), Duration::minutes(5)).unwrap();
        let other = TokenCodec::from_secret(b"a-completely-different-signing-key!!", Duration::minutes(5))
            .unwrap();

        assert_eq!(
            other.verify(&token, t0()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn bad_signature_wins_over_expiry() {
        let token = codec().issue("alice@example.com", t0(), Duration::minutes(5)).unwrap();
        let other = TokenCodec::from_secret(b"a-completely-different-signing-key!!", Duration::minutes(5))
            .unwrap();

        assert_eq!(
            other.verify(&token, t0() + Duration::days(1)),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_is_invalid_signature() {
        let codec = codec();
        let token = codec.issue("alice@example.com", t0(), codec.ttl()).unwrap();
        let forged_claims = Claims {
            sub: "mallory@example.com".to_string(),
            iat: t0().timestamp(),
            exp: (t0() + Duration::days(365)).timestamp(),
            jti: "forged".to_string(),
        };
        let forged_payload = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &forged_claims,
            &EncodingKey::from_secret(b"attacker-key"),
        )
        .unwrap();

        // Original header and signature around the attacker's payload
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_payload.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(codec.verify(&spliced, t0()), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let claims = Claims {
            sub: "alice@example.com".to_string(),
            iat: t0().timestamp(),
            exp: (t0() + Duration::minutes(5)).timestamp(),
            jti: "x".to_string(),
        };
        let hs512 = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();

        assert_eq!(codec().verify(&hs512, t0()), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        for token in ["", "garbage", "a.b", "not.a.token", "###.###.###"] {
            let result = codec.verify(token, t0());
            assert!(
                matches!(result, Err(AuthError::MalformedToken(_))),
                "{token:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn missing_required_claim_is_malformed() {
        #[derive(Serialize)]
        struct NoSubject {
            iat: i64,
            exp: i64,
        }
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &NoSubject {
                iat: t0().timestamp(),
                exp: (t0() + Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();

        assert!(matches!(
            codec().verify(&token, t0()),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn every_token_is_unique() {
        let codec = codec();
        let a = codec.issue("alice@example.com", t0(), codec.ttl()).unwrap();
        let b = codec.issue("alice@example.com", t0(), codec.ttl()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_key_and_non_positive_ttl_are_rejected() {
        assert!(matches!(
            TokenCodec::from_secret(b"", Duration::minutes(5)),
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            TokenCodec::from_secret(KEY, Duration::zero()),
            Err(AuthError::Configuration(_))
        ));
    }
}
