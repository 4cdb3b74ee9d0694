// ============================
// authgate-lib/src/router.rs
// ============================
//! HTTP routes mapping register / login / protected access onto the auth core.
use authgate_common::{CredentialsRequest, IdentityResponse, TokenResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::Claims;
use crate::error::AppError;
use crate::middleware::require_bearer;
use crate::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/protected", get(protected).post(protected))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/health", get(health))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.cors_origins))
        .with_state(state)
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(req) = payload?;
    let issued = state.auth.register(&req.identity, &req.secret).await?;
    Ok(Json(TokenResponse::bearer(issued.token, issued.expires_at)))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(req) = payload?;
    let issued = state.auth.login(&req.identity, &req.secret).await?;
    Ok(Json(TokenResponse::bearer(issued.token, issued.expires_at)))
}

/// `GET|POST /protected`, reachable only with a valid bearer token
pub async fn protected(Extension(claims): Extension<Claims>) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        identity: claims.sub,
    })
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
