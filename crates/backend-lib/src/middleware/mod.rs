// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the `authgate` HTTP layer.

pub mod bearer;

pub use bearer::{bearer_token, require_bearer};
