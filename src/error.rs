//! Error types and Axum response conversions.

use crate::storage::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Reasons a sign-in attempt is rejected.
///
/// The names are stable and machine-distinguishable; they are what the
/// server logs and, unless configured otherwise, what the client sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("MalformedMessage")]
    MalformedMessage,

    #[error("NonceInvalidOrExpired")]
    NonceInvalidOrExpired,

    #[error("NonceMismatch")]
    NonceMismatch,

    #[error("DomainMismatch")]
    DomainMismatch,

    #[error("ChainMismatch")]
    ChainMismatch,

    #[error("MessageExpired")]
    MessageExpired,

    #[error("MessageNotYetValid")]
    MessageNotYetValid,

    #[error("SignatureInvalid")]
    SignatureInvalid,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::MalformedMessage => "MalformedMessage",
            AuthFailure::NonceInvalidOrExpired => "NonceInvalidOrExpired",
            AuthFailure::NonceMismatch => "NonceMismatch",
            AuthFailure::DomainMismatch => "DomainMismatch",
            AuthFailure::ChainMismatch => "ChainMismatch",
            AuthFailure::MessageExpired => "MessageExpired",
            AuthFailure::MessageNotYetValid => "MessageNotYetValid",
            AuthFailure::SignatureInvalid => "SignatureInvalid",
        }
    }
}

/// Client error text for requests missing the message, the signature, the
/// session cookie, or any usable domain.
pub const MISSING_INPUT: &str = "MissingInput";

/// Client error text for every rejection when failure reasons are hidden.
pub const GENERIC_FAILURE: &str = "VerificationFailed";

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    pub fn missing_input() -> Self {
        AppError::BadRequest(MISSING_INPUT.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        };

        let body = Json(json!({
            "ok": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(format!("Nonce store error: {}", err))
    }
}
