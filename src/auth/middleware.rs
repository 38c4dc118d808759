//! Axum state and extractors for the sign-in endpoints.

use crate::config::Config;
use crate::error::AppError;
use crate::storage::NonceStore;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, Uri},
};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: NonceStore,
    pub config: Arc<Config>,
}

/// The domain a sign-in message must be bound to for this request.
///
/// Resolution order:
/// 1. `SIWE_DOMAIN` from configuration, when set.
/// 2. The host (and non-default port) of the `Origin` header. Browsers
///    always send it on cross-origin POSTs.
/// 3. The `Host` header, for non-browser callers that send no `Origin`.
///
/// Step 3 trusts a header the caller fully controls. Deployments that face
/// untrusted networks should pin `SIWE_DOMAIN`.
///
/// Rejects with 400 `MissingInput` when no domain can be determined.
pub struct RequestDomain(pub String);

impl FromRequestParts<AppState> for RequestDomain {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(domain) = &state.config.siwe_domain {
            return Ok(RequestDomain(domain.clone()));
        }

        resolve_domain(&parts.headers, &parts.uri)
            .map(RequestDomain)
            .ok_or_else(AppError::missing_input)
    }
}

/// Derive the relying-party domain from request headers.
///
/// A present but unusable `Origin` (e.g. `null` from a sandboxed frame)
/// yields `None` rather than falling back to `Host`. HTTP/2 requests carry
/// `:authority` in the URI instead of a `Host` header.
pub fn resolve_domain(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(origin) = headers.get(header::ORIGIN) {
        let origin = url::Url::parse(origin.to_str().ok()?).ok()?;
        let host = origin.host_str()?;
        return Some(match origin.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        });
    }

    if let Some(host) = headers.get(header::HOST) {
        return host
            .to_str()
            .ok()
            .filter(|host| !host.is_empty())
            .map(str::to_string);
    }

    let authority = uri.authority()?;
    Some(match authority.port_u16() {
        Some(port) => format!("{}:{}", authority.host(), port),
        None => authority.host().to_string(),
    })
}
