//! Sign-in API endpoints.

use crate::auth::middleware::{AppState, RequestDomain};
use crate::auth::nonce::{generate_session_key, is_valid_session_key};
use crate::auth::signature::decode_signature_hex;
use crate::auth::{issuer, verifier, Expectations};
use crate::config::Config;
use crate::error::{AppError, AuthFailure, GENERIC_FAILURE};
use crate::models::{NonceResponse, OkResponse, VerifyRequest, VerifyResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

/// Cookie carrying the session key that locates the nonce record.
pub const SESSION_COOKIE: &str = "siwe_session";

/// GET /ping: Liveness check
pub async fn ping() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// GET /auth/nonce: Issue a single-use nonce
///
/// Reuses the caller's session key when the cookie is present and well
/// formed, so the new nonce replaces any earlier one for that session.
pub async fn issue_nonce(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let session_key = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|key| is_valid_session_key(key))
        .unwrap_or_else(generate_session_key);

    let record = issuer::issue(
        &state.store,
        &session_key,
        state.config.nonce_ttl(),
        Utc::now(),
    )
    .await?;

    tracing::info!(action = "nonce_issued", expires_at = %record.expires_at, "Nonce issued");

    let jar = jar.add(session_cookie(session_key, &state.config));
    Ok((jar, Json(NonceResponse { nonce: record.value })))
}

/// POST /auth/siwe: Verify a signed sign-in message
pub async fn verify_sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    RequestDomain(domain): RequestDomain,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (message, signature) = match body {
        Ok(Json(VerifyRequest {
            message: Some(message),
            signature: Some(signature),
        })) if !message.is_empty() && !signature.is_empty() => (message, signature),
        _ => {
            tracing::warn!(action = "auth_failed", reason = "MissingInput", "Message or signature missing");
            return Err(AppError::missing_input());
        }
    };

    let session_key = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            tracing::warn!(action = "auth_failed", reason = "MissingInput", "Session cookie missing");
            return Err(AppError::missing_input());
        }
    };

    // Undecodable hex becomes an empty signature; the verifier still runs
    // its nonce checks first and then rejects it as SignatureInvalid.
    let signature_bytes = decode_signature_hex(&signature).unwrap_or_default();

    let expected = Expectations {
        domain: &domain,
        chain_id: state.config.expected_chain_id,
    };
    let result = verifier::authenticate(
        &state.store,
        &session_key,
        &message,
        &signature_bytes,
        expected,
        Utc::now(),
    )
    .await?;

    match result {
        Ok(sign_in) => {
            tracing::info!(
                action = "auth_success",
                address = %sign_in.address,
                chain_id = sign_in.chain_id,
                domain = %sign_in.domain,
                "Sign-in verified"
            );
            let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
            Ok((
                jar,
                Json(VerifyResponse {
                    ok: true,
                    address: sign_in.address.to_checksum(None),
                    chain_id: sign_in.chain_id,
                }),
            ))
        }
        Err(failure) => {
            tracing::warn!(
                action = "auth_failed",
                reason = failure.as_str(),
                domain = %domain,
                "Sign-in rejected"
            );
            Err(AppError::Unauthorized(client_reason(failure, &state.config)))
        }
    }
}

/// POST /auth/logout: Clear the session cookie
///
/// Always answers `{ok: true}`; a store failure is logged and does not
/// block the client from considering itself logged out.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.store.remove(cookie.value()).await {
            tracing::warn!(action = "logout", error = %e, "Failed to delete nonce record");
        }
    }

    tracing::info!(action = "logout", "Session cleared");

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(OkResponse { ok: true }))
}

fn session_cookie(session_key: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_key))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .path("/")
        .max_age(cookie::time::Duration::seconds(config.nonce_ttl_secs as i64))
        .build()
}

fn client_reason(failure: AuthFailure, config: &Config) -> String {
    if config.expose_failure_reason {
        failure.as_str().to_string()
    } else {
        GENERIC_FAILURE.to_string()
    }
}
