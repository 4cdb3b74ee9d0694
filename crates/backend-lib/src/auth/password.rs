// ============================
// authgate-lib/src/auth/password.rs
// ============================
//! Secret hashing and verification.
use scrypt::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::AuthError;
use crate::config::HashingSettings;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 1;

/// Longest secret accepted for hashing
pub const MAX_SECRET_LENGTH: usize = 1024;

/// Password complexity requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: false,
            require_special: false,
        }
    }
}

/// One-way salted scrypt hashing of secrets.
///
/// Hashes are PHC strings carrying their own salt and cost parameters, so a
/// hasher configured with new costs still verifies older hashes.
#[derive(Clone)]
pub struct SecretHasher {
    params: Params,
    dummy_hash: String,
}

impl SecretHasher {
    pub fn new(settings: &HashingSettings) -> Result<Self, AuthError> {
        let params = Params::new(
            settings.log_n,
            settings.r,
            settings.p,
            Params::RECOMMENDED_LEN,
        )
        .map_err(|e| AuthError::Configuration(format!("invalid scrypt parameters: {e}")))?;

        // Verified against when an identity is unknown so both paths cost one hash.
        let filler = SaltString::generate(&mut OsRng);
        let dummy_hash = hash_with(params, filler.as_str())?;

        Ok(Self { params, dummy_hash })
    }

    /// Hash a secret under a fresh random salt
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        hash_with(self.params, secret)
    }

    /// Check a secret against a stored hash.
    ///
    /// `Ok(false)` on mismatch; `Err(Verification)` when the hash itself is
    /// unusable. The comparison is constant-time.
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::Verification(format!("invalid hash format: {e}")))?;

        match Scrypt.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(AuthError::Verification(e.to_string())),
        }
    }

    /// Hash of a random secret nobody knows
    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}

fn hash_with(params: Params, secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(secret.as_bytes(), None, None, params, &salt)
        .map_err(|e| AuthError::Internal(format!("hashing failed: {e}")))?
        .to_string();
    Ok(hash)
}

/// Check if a password meets the complexity requirements
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.chars().count() < requirements.min_length {
        return false;
    }

    if requirements.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return false;
    }

    if requirements.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return false;
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if requirements.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return false;
    }

    true
}

/// Hash a secret the caller owns and wipe it from memory afterwards
pub fn hash_secret_secure(
    hasher: &SecretHasher,
    secret: Zeroizing<String>,
) -> Result<String, AuthError> {
    hasher.hash(&secret)
}
