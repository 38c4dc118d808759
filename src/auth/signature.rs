//! secp256k1 signer recovery for EIP-191 `personal_sign` signatures.

use alloy_primitives::{eip191_hash_message, Address};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature hex: {0}")]
    InvalidHex(String),

    #[error("invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Decode a `0x`-prefixed (or bare) hex signature into bytes.
pub fn decode_signature_hex(signature: &str) -> Result<Vec<u8>, SignatureError> {
    let digits = signature.strip_prefix("0x").unwrap_or(signature);
    hex::decode(digits).map_err(|e| SignatureError::InvalidHex(e.to_string()))
}

/// Recover the address that produced `signature` over `message`.
///
/// # Arguments
/// * `message` - The exact bytes that were passed to `personal_sign`
/// * `signature` - 65 bytes `r || s || v`, with `v` in {0, 1, 27, 28}
///
/// # Returns
/// * `Ok(Address)` of the recovered signer
/// * `Err(SignatureError)` if the signature is malformed or recovery fails
pub fn recover_signer(message: &[u8], signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(signature.len()));
    }

    let v = signature[64];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::InvalidRecoveryId(v))?;

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;

    let hash = eip191_hash_message(message);
    let verifying_key = VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, recovery_id)
        .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))?;

    Ok(Address::from_public_key(&verifying_key))
}
