//! Bearer-token authentication for protected routes.
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{error::AppError, AppState};

/// Verify `Authorization: Bearer <token>` and expose the verified
/// [`Claims`](crate::auth::Claims) as a request extension.
///
/// Every failure becomes the same 401; the specific kind is only logged.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or(AppError::MissingCredentials)?
        .to_owned();

    let claims = state.auth.authenticate(&token).map_err(|e| {
        warn!(kind = e.kind(), path = %request.uri().path(), "bearer token rejected");
        AppError::from(e)
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Token from an `Authorization` header using the Bearer scheme (case-insensitive)
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
