// ============================
// authgate-lib/src/auth/mod.rs
// ============================
//! Authentication core: secret hashing, token codec, credential store and
//! the service tying them together.

pub mod error;
pub mod password;
pub mod rate_limit;
pub mod store;
pub mod token;
mod service;
mod service_impl;

pub use error::AuthError;
pub use password::{
    hash_secret_secure, validate_password_strength, PasswordRequirements, SecretHasher,
    MAX_SECRET_LENGTH, MIN_PASSWORD_LENGTH,
};
pub use rate_limit::LoginThrottle;
pub use service::{AuthService, IssuedToken};
pub use service_impl::{validate_identity, validate_secret, DefaultAuth, MAX_IDENTITY_LENGTH};
pub use store::{CredentialRecord, CredentialStore, FlatFileCredentialStore, InMemoryCredentialStore};
pub use token::{Claims, TokenCodec};
