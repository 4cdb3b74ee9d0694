// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use authgate_common::ErrorResponse;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

/// Errors surfaced at the HTTP boundary
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Missing bearer credentials")]
    MissingCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => match e {
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::DuplicateIdentity => StatusCode::CONFLICT,
                AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                e if e.is_authentication_failure() => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error. Every authentication failure shares one code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(e) => match e {
                AuthError::Validation(_) => "VAL_001",
                AuthError::DuplicateIdentity => "AUTH_002",
                AuthError::RateLimited => "AUTH_003",
                e if e.is_authentication_failure() => "AUTH_001",
                AuthError::Configuration(_) => "CFG_001",
                _ => "INT_001",
            },
            AppError::MissingCredentials => "AUTH_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
            AppError::Config(_) => "CFG_001",
        }
    }

    /// Get a message that is safe to show to untrusted callers
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(e) => match e {
                AuthError::Validation(reason) => format!("Invalid input: {reason}"),
                AuthError::DuplicateIdentity => "Identity already registered".to_string(),
                AuthError::RateLimited => {
                    "Too many authentication attempts, please try again later".to_string()
                },
                e if e.is_authentication_failure() => "Authentication failed".to_string(),
                _ => "An internal server error occurred".to_string(),
            },
            AppError::MissingCredentials => "Authentication failed".to_string(),
            AppError::InvalidInput(reason) => format!("Invalid input: {reason}"),
            AppError::Json(_) => "Invalid request format".to_string(),
            AppError::Io(_) | AppError::Config(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse::new(self.error_code(), self.sanitized_message());
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}
