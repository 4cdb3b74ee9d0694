// ============================
// authgate-lib/src/lib.rs
// ============================
//! Credential registration, login and signed bearer-token verification,
//! plus the thin HTTP layer exposing them.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod router;

use std::sync::Arc;

use tracing::info;

use crate::auth::{
    AuthService, CredentialStore, DefaultAuth, FlatFileCredentialStore, InMemoryCredentialStore,
    LoginThrottle,
};
use crate::config::{Settings, StorageBackend};
use crate::error::AppError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Settings, fixed for the life of the process
    pub settings: Arc<Settings>,
    /// Failed-login throttle, shared with the service for periodic cleanup
    pub throttle: LoginThrottle,
}

impl AppState {
    /// Create application state around an existing service
    pub fn new(auth: Arc<dyn AuthService>, settings: Settings, throttle: LoginThrottle) -> Self {
        Self {
            auth,
            settings: Arc::new(settings),
            throttle,
        }
    }

    /// Build the credential store and auth service described by `settings`
    pub async fn from_settings(settings: Settings) -> Result<Self, AppError> {
        settings.validate()?;

        let store: Arc<dyn CredentialStore> = match settings.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryCredentialStore::new()),
            StorageBackend::File => {
                Arc::new(FlatFileCredentialStore::open(&settings.storage.data_dir).await?)
            },
        };

        let throttle = LoginThrottle::from(&settings.rate_limit);
        let auth = DefaultAuth::from_settings(&settings, store)?.with_throttle(throttle.clone());

        info!(
            backend = ?settings.storage.backend,
            token_ttl_secs = settings.token.ttl_secs,
            "auth service ready"
        );

        Ok(Self::new(Arc::new(auth), settings, throttle))
    }
}
