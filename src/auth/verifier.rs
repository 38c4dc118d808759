//! Sign-in verification.
//!
//! `verify` is the pure decision: it takes the session's nonce record as
//! read from the store and never mutates anything. `authenticate` wraps it
//! with the store round-trip and performs the single-use consumption, and it
//! is the only path that can produce an accepted sign-in.

use alloy_primitives::Address;
use crate::auth::message::SiweMessage;
use crate::auth::signature::recover_signer;
use crate::error::AuthFailure;
use crate::models::NonceRecord;
use crate::storage::{NonceStore, StoreError};
use chrono::{DateTime, Utc};

/// An accepted sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    pub address: Address,
    pub chain_id: u64,
    pub domain: String,
    pub nonce: String,
}

/// Accepted sign-in, or the reason it was rejected.
pub type VerificationResult = Result<SignIn, AuthFailure>;

/// What the relying party requires of a message.
#[derive(Debug, Clone, Copy)]
pub struct Expectations<'a> {
    pub domain: &'a str,
    pub chain_id: u64,
}

/// Check a submitted message and signature against the session's record.
///
/// Checks run in a fixed order and the first failure wins: parse, record
/// liveness, nonce, domain, chain, validity window, then signature. The
/// record is checked before any signature math.
///
/// This does not consume the nonce; see [`authenticate`].
pub fn verify(
    raw_message: &str,
    signature: &[u8],
    record: Option<&NonceRecord>,
    expected: Expectations<'_>,
    now: DateTime<Utc>,
) -> VerificationResult {
    let message = SiweMessage::parse(raw_message).map_err(|e| {
        tracing::debug!(error = %e, "Sign-in message did not parse");
        AuthFailure::MalformedMessage
    })?;

    let record = record
        .filter(|r| r.is_live(now))
        .ok_or(AuthFailure::NonceInvalidOrExpired)?;

    if message.nonce != record.value {
        return Err(AuthFailure::NonceMismatch);
    }
    if message.domain != expected.domain {
        return Err(AuthFailure::DomainMismatch);
    }
    if message.chain_id != expected.chain_id {
        return Err(AuthFailure::ChainMismatch);
    }
    if let Some(exp) = &message.expiration_time {
        if now >= exp.at() {
            return Err(AuthFailure::MessageExpired);
        }
    }
    if let Some(nbf) = &message.not_before {
        if now < nbf.at() {
            return Err(AuthFailure::MessageNotYetValid);
        }
    }

    // Signature is checked over our own encoding, not the submitted text
    let signed_bytes = message.encode();
    let signer = recover_signer(signed_bytes.as_bytes(), signature).map_err(|e| {
        tracing::debug!(error = %e, "Signature recovery failed");
        AuthFailure::SignatureInvalid
    })?;
    if signer != message.address {
        return Err(AuthFailure::SignatureInvalid);
    }

    Ok(SignIn {
        address: message.address,
        chain_id: message.chain_id,
        domain: message.domain,
        nonce: message.nonce,
    })
}

/// Verify against the session's stored record and consume it on success.
///
/// The outer `Result` carries store failures; the inner one is the
/// verification outcome. When several requests race with the same nonce,
/// the store lets exactly one consume it and the rest are reported as
/// `NonceInvalidOrExpired`.
pub async fn authenticate(
    store: &NonceStore,
    session_key: &str,
    raw_message: &str,
    signature: &[u8],
    expected: Expectations<'_>,
    now: DateTime<Utc>,
) -> Result<VerificationResult, StoreError> {
    let record = store.get(session_key).await?;

    let sign_in = match verify(raw_message, signature, record.as_ref(), expected, now) {
        Ok(sign_in) => sign_in,
        Err(failure) => return Ok(Err(failure)),
    };

    if !store.consume(session_key, &sign_in.nonce, now).await? {
        return Ok(Err(AuthFailure::NonceInvalidOrExpired));
    }
    Ok(Ok(sign_in))
}
