//! Nonce and session key generation.

use base64::{engine::general_purpose, Engine as _};
use rand::Rng;

/// Raw nonce length in bytes (128 bits).
pub const NONCE_BYTES: usize = 16;

/// Raw session key length in bytes.
pub const SESSION_KEY_BYTES: usize = 32;

/// Encoded session key length (URL-safe base64 without padding).
pub const SESSION_KEY_LEN: usize = 43;

/// Generate a cryptographically random challenge nonce.
///
/// Returns 32 lowercase hex characters from 16 random bytes. Hex keeps the
/// value inside the alphanumeric alphabet sign-in messages require.
pub fn generate_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; NONCE_BYTES];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// Generate a cryptographically random session key for the nonce cookie.
///
/// Returns a URL-safe base64 string (43 characters) from 32 random bytes,
/// so it can travel in a cookie value without quoting.
pub fn generate_session_key() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; SESSION_KEY_BYTES];
    rng.fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Check that a client-supplied session key has the shape we issue.
pub fn is_valid_session_key(key: &str) -> bool {
    key.len() == SESSION_KEY_LEN
        && general_purpose::URL_SAFE_NO_PAD
            .decode(key)
            .is_ok_and(|bytes| bytes.len() == SESSION_KEY_BYTES)
}
