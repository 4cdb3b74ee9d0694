// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const REGISTER_SUCCESS: &str = "auth.register.success";
pub const REGISTER_FAILURE: &str = "auth.register.failure";
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const LOGIN_LOCKED: &str = "auth.login.locked";
pub const TOKEN_VERIFIED: &str = "auth.token.verified";
pub const TOKEN_REJECTED: &str = "auth.token.rejected";
