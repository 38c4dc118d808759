//! Request, response, and storage models.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Nonce Records
// ============================================================================

/// A single-use challenge bound to one client session.
///
/// Timestamps are stored as Unix milliseconds so the Redis consume script
/// can compare them numerically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceRecord {
    pub value: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl NonceRecord {
    /// `issued_at` is truncated to milliseconds, the stored precision.
    pub fn new(value: String, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let issued_at = issued_at.trunc_subsecs(3);
        NonceRecord {
            value,
            issued_at,
            expires_at: issued_at + ttl,
            consumed: false,
        }
    }

    /// Unconsumed and not past its expiry. The expiry instant itself is
    /// still live.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && now <= self.expires_at
    }
}

// ============================================================================
// API Models
// ============================================================================

/// Response carrying a freshly issued nonce.
#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

/// Signed sign-in submission.
///
/// Both fields are optional at the serde level so a missing field surfaces
/// as `MissingInput` instead of a generic deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    pub message: Option<String>,
    pub signature: Option<String>, // 0x-prefixed hex, 65 bytes
}

/// Response after a successful verification.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    /// EIP-55 checksummed.
    pub address: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

/// Bare acknowledgement (`/ping`, `/auth/logout`).
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
