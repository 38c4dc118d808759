//! API route handlers.

pub mod auth;

use crate::auth::middleware::AppState;
use crate::config::Config;
use crate::middleware::{log_requests, security_headers};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(auth::ping))
        .route("/auth/nonce", get(auth::issue_nonce))
        .route("/auth/siwe", post(auth::verify_sign_in))
        .route("/auth/logout", post(auth::logout))
}

/// The full application: routes, body limit, CORS, logging and security
/// headers, bound to `state`.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    api_router()
        .layer(body_limit)
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(security_headers))
        .with_state(state)
}

/// Credentialed CORS for the single configured browser origin.
fn cors_layer(config: &Config) -> CorsLayer {
    match HeaderValue::from_str(&config.allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
        Err(e) => {
            // Denies every cross-origin request
            tracing::warn!(error = %e, "Unusable ALLOWED_ORIGIN, CORS disabled");
            CorsLayer::new()
        }
    }
}
