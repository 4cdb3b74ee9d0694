// ============================
// authgate-lib/src/config/mod.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then an optional TOML
//! file, then `AUTHGATE_` environment variables (`__` separates nested keys,
//! e.g. `AUTHGATE_TOKEN__SIGNING_KEY`). They are loaded once at startup.
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::rate_limit::DEFAULT_MAX_TRACKED;
use crate::auth::{AuthError, PasswordRequirements};
use crate::error::AppError;

/// Config file read by [`Settings::load`]
pub const DEFAULT_CONFIG_FILE: &str = "authgate.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "AUTHGATE_";

/// Token lifetime used when none is configured (5 minutes)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 5 * 60;

/// Upper bound on the configurable token lifetime (7 days)
pub const MAX_TOKEN_TTL_SECS: u64 = 60 * 60 * 24 * 7;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Token signing
    pub token: TokenSettings,
    /// scrypt cost parameters
    pub hashing: HashingSettings,
    /// Credential storage backend
    pub storage: StorageSettings,
    /// Password complexity requirements applied on registration
    pub password_requirements: PasswordRequirements,
    /// Failed-login lockout
    pub rate_limit: RateLimitSettings,
}

/// Signing key and lifetime of issued tokens
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    /// Symmetric HS256 key. Must be set explicitly; there is no usable default.
    pub signing_key: String,
    /// Lifetime of every issued token, in seconds
    pub ttl_secs: u64,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("signing_key", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenSettings {
    /// Configured lifetime as a chrono duration
    pub fn ttl(&self) -> chrono::Duration {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS as i64))
    }
}

/// scrypt parameters. Higher `log_n` means slower, more brute-force resistant hashing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HashingSettings {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map, lost on restart
    Memory,
    /// JSON file under `data_dir`
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

/// Failed-login lockout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Failed attempts per identity before it is locked out
    pub max_failed_attempts: u32,
    /// Duration of the lockout in seconds. Failure counters idle this long are dropped.
    pub lockout_secs: u64,
    /// Upper bound on identities with live failure counters
    pub max_tracked_identities: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            log_level: "info".to_string(),
            cors_origins: vec!["http://localhost:8000".to_string()],
            token: TokenSettings::default(),
            hashing: HashingSettings::default(),
            storage: StorageSettings::default(),
            password_requirements: PasswordRequirements::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            signing_key: String::new(),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_secs: 5 * 60,
            max_tracked_identities: DEFAULT_MAX_TRACKED,
        }
    }
}

impl Settings {
    /// Layered figment for the given config file. A missing file is not an error.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load settings from [`DEFAULT_CONFIG_FILE`] and the environment
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from a specific file and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let settings: Settings = Self::figment(path).extract().map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the service cannot safely run with
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.token.signing_key.is_empty() {
            return Err(AuthError::Configuration(
                "token.signing_key must be set".to_string(),
            ));
        }

        if self.token.ttl_secs == 0 || self.token.ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(AuthError::Configuration(format!(
                "token.ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AuthError::Configuration(format!(
                "unknown log level: {}",
                self.log_level
            )));
        }

        if self.password_requirements.min_length == 0 {
            return Err(AuthError::Configuration(
                "password_requirements.min_length must be at least 1".to_string(),
            ));
        }

        if self.rate_limit.max_failed_attempts == 0 {
            return Err(AuthError::Configuration(
                "rate_limit.max_failed_attempts must be at least 1".to_string(),
            ));
        }

        scrypt::Params::new(
            self.hashing.log_n,
            self.hashing.r,
            self.hashing.p,
            scrypt::Params::RECOMMENDED_LEN,
        )
        .map_err(|e| AuthError::Configuration(format!("invalid scrypt parameters: {e}")))?;

        Ok(())
    }
}
