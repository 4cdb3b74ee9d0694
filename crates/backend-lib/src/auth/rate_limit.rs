// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Lockout after repeated failed logins.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::RateLimitSettings;

/// Default number of failed attempts before lockout
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);

/// Default cap on identities tracked at once
pub const DEFAULT_MAX_TRACKED: usize = 10_000;

#[derive(Debug, Clone)]
struct ThrottleEntry {
    failed_attempts: u32,
    last_failure: Instant,
    lockout_expiry: Option<Instant>,
}

impl ThrottleEntry {
    /// Served lockouts and counters idle for a whole lockout period are spent
    fn is_spent(&self, now: Instant, lockout_duration: Duration) -> bool {
        match self.lockout_expiry {
            Some(expiry) => now >= expiry,
            None => now.duration_since(self.last_failure) > lockout_duration,
        }
    }
}

/// Failed-login counter keyed by identity
#[derive(Debug, Clone)]
pub struct LoginThrottle {
    attempts: Arc<DashMap<String, ThrottleEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
    max_tracked: usize,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

impl From<&RateLimitSettings> for LoginThrottle {
    fn from(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_failed_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
        .with_max_tracked(settings.max_tracked_identities)
    }
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts: max_attempts.max(1),
            lockout_duration,
            max_tracked: DEFAULT_MAX_TRACKED,
        }
    }

    pub fn with_max_tracked(mut self, max_tracked: usize) -> Self {
        self.max_tracked = max_tracked.max(1);
        self
    }

    /// Record a failed login for `identity`
    pub fn record_failure(&self, identity: &str) {
        let now = Instant::now();

        if !self.attempts.contains_key(identity) && self.attempts.len() >= self.max_tracked {
            self.cleanup();
            if self.attempts.len() >= self.max_tracked {
                warn!(
                    tracked = self.attempts.len(),
                    "login throttle full, failure not tracked"
                );
                return;
            }
        }

        let mut entry = self
            .attempts
            .entry(identity.to_string())
            .or_insert_with(|| ThrottleEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        if entry.is_spent(now, self.lockout_duration) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts = entry.failed_attempts.saturating_add(1);
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            warn!(
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "identity locked out after repeated login failures"
            );
        }
    }

    /// Forget failures after a successful login
    pub fn record_success(&self, identity: &str) {
        self.attempts.remove(identity);
    }

    /// Whether `identity` may attempt a login right now
    pub fn is_allowed(&self, identity: &str) -> bool {
        match self.attempts.get(identity) {
            Some(entry) => !entry
                .lockout_expiry
                .is_some_and(|expiry| Instant::now() < expiry),
            None => true,
        }
    }

    /// Drop served lockouts and idle counters
    pub fn cleanup(&self) {
        let now = Instant::now();
        let lockout_duration = self.lockout_duration;
        self.attempts
            .retain(|_, entry| !entry.is_spent(now, lockout_duration));
    }

    /// Number of identities currently tracked
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}
