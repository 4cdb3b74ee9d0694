use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use metrics::counter;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::auth::{
    hash_secret_secure, validate_password_strength, AuthError, AuthService, Claims,
    CredentialRecord, CredentialStore, IssuedToken, LoginThrottle, PasswordRequirements,
    SecretHasher, TokenCodec, MAX_SECRET_LENGTH,
};
use crate::config::Settings;
use crate::metrics::{
    LOGIN_FAILURE, LOGIN_LOCKED, LOGIN_SUCCESS, REGISTER_FAILURE, REGISTER_SUCCESS,
    TOKEN_REJECTED, TOKEN_VERIFIED,
};

/// Longest accepted identity (RFC 5321 address limit)
pub const MAX_IDENTITY_LENGTH: usize = 254;

/// [`AuthService`] over a credential store, a hasher and a token codec.
///
/// Hashing and verification run on the blocking pool.
pub struct DefaultAuth {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<SecretHasher>,
    codec: Arc<TokenCodec>,
    throttle: LoginThrottle,
    requirements: PasswordRequirements,
}

impl DefaultAuth {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: SecretHasher, codec: TokenCodec) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
            codec: Arc::new(codec),
            throttle: LoginThrottle::default(),
            requirements: PasswordRequirements::default(),
        }
    }

    /// Build the hasher, codec, throttle and password policy from settings
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, AuthError> {
        let hasher = SecretHasher::new(&settings.hashing)?;
        let codec = TokenCodec::new(&settings.token)?;

        Ok(Self::new(store, hasher, codec)
            .with_throttle(LoginThrottle::from(&settings.rate_limit))
            .with_password_requirements(settings.password_requirements.clone()))
    }

    pub fn with_throttle(mut self, throttle: LoginThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_password_requirements(mut self, requirements: PasswordRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    fn issue(&self, identity: &str) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let ttl = self.codec.ttl();
        let token = self.codec.issue(identity, now, ttl)?;

        Ok(IssuedToken {
            token,
            expires_at: (now + ttl).trunc_subsecs(0),
        })
    }

    async fn register_inner(&self, identity: &str, secret: &str) -> Result<IssuedToken, AuthError> {
        let identity = validate_identity(identity)?;
        validate_secret(secret, &self.requirements)?;

        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(secret.to_owned());
        let secret_hash =
            tokio::task::spawn_blocking(move || hash_secret_secure(&hasher, secret)).await??;

        self.store
            .register(CredentialRecord::new(identity, secret_hash))
            .await?;

        self.issue(identity)
    }

    async fn login_inner(&self, identity: &str, secret: &str) -> Result<IssuedToken, AuthError> {
        // Nothing that could not have been registered reaches the throttle
        let identity = validate_identity(identity).map_err(|e| {
            debug!(error = %e, "login identity rejected before lookup");
            AuthError::InvalidCredentials
        })?;

        if !self.throttle.is_allowed(identity) {
            counter!(LOGIN_LOCKED).increment(1);
            return Err(AuthError::RateLimited);
        }

        let (secret_hash, known) = match self.store.lookup(identity).await {
            Ok(record) => (record.secret_hash, true),
            Err(AuthError::NotFound) => (self.hasher.dummy_hash().to_string(), false),
            Err(e) => return Err(e),
        };

        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(secret.to_owned());
        let verified =
            tokio::task::spawn_blocking(move || hasher.verify(&secret, &secret_hash)).await?;

        match verified {
            Ok(true) if known => {
                self.throttle.record_success(identity);
                self.issue(identity)
            }
            Ok(_) => {
                debug!(known, "login secret did not match");
                self.throttle.record_failure(identity);
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "stored hash could not be verified");
                self.throttle.record_failure(identity);
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn register(&self, identity: &str, secret: &str) -> Result<IssuedToken, AuthError> {
        let result = self.register_inner(identity, secret).await;
        match &result {
            Ok(_) => {
                counter!(REGISTER_SUCCESS).increment(1);
                info!(identity = identity.trim(), "identity registered");
            }
            Err(e) => {
                counter!(REGISTER_FAILURE, "kind" => e.kind()).increment(1);
                warn!(kind = e.kind(), "registration rejected");
            }
        }
        result
    }

    async fn login(&self, identity: &str, secret: &str) -> Result<IssuedToken, AuthError> {
        let identity = identity.trim();
        let result = self.login_inner(identity, secret).await;
        let logged = if identity.len() <= MAX_IDENTITY_LENGTH {
            identity
        } else {
            "<oversized>"
        };
        match &result {
            Ok(_) => {
                counter!(LOGIN_SUCCESS).increment(1);
                info!(identity = logged, "login succeeded");
            }
            Err(e) => {
                counter!(LOGIN_FAILURE, "kind" => e.kind()).increment(1);
                warn!(identity = logged, kind = e.kind(), "login rejected");
            }
        }
        result
    }

    fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        match self.codec.verify(token, Utc::now()) {
            Ok(claims) => {
                counter!(TOKEN_VERIFIED).increment(1);
                Ok(claims)
            }
            Err(e) => {
                counter!(TOKEN_REJECTED, "kind" => e.kind()).increment(1);
                debug!(kind = e.kind(), "token rejected");
                Err(e)
            }
        }
    }
}

/// Trimmed identity, or why it cannot be registered
pub fn validate_identity(identity: &str) -> Result<&str, AuthError> {
    let identity = identity.trim();
    if identity.is_empty() {
        return Err(AuthError::Validation("identity must be provided".to_string()));
    }
    if identity.len() > MAX_IDENTITY_LENGTH {
        return Err(AuthError::Validation(format!(
            "identity exceeds {MAX_IDENTITY_LENGTH} bytes"
        )));
    }
    if identity.chars().any(char::is_control) {
        return Err(AuthError::Validation(
            "identity contains control characters".to_string(),
        ));
    }
    Ok(identity)
}

/// Check a secret for registration
pub fn validate_secret(secret: &str, requirements: &PasswordRequirements) -> Result<(), AuthError> {
    if secret.is_empty() {
        return Err(AuthError::Validation("secret must be provided".to_string()));
    }
    if secret.len() > MAX_SECRET_LENGTH {
        return Err(AuthError::Validation(format!(
            "secret exceeds {MAX_SECRET_LENGTH} bytes"
        )));
    }
    if !validate_password_strength(secret, requirements) {
        return Err(AuthError::Validation(
            "secret does not meet password requirements".to_string(),
        ));
    }
    Ok(())
}
