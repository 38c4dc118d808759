//! Client side of the handshake: the wallet that signs sign-in messages.
//!
//! Browsers talk to an injected wallet; non-browser clients and tests use
//! `LocalWallet`, which holds a secp256k1 key in process. Either way the
//! flow is the same: pick an account, make sure the wallet is on the
//! requested chain, then `personal_sign` the canonical message.

use crate::auth::message::{SiweMessage, Timestamp, SIWE_VERSION};
use alloy_primitives::{eip191_hash_message, Address};
use k256::ecdsa::SigningKey;
use zeroize::Zeroizing;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// The user dismissed the prompt.
    #[error("user rejected the request")]
    UserRejected,

    #[error("wallet does not support chain {0}")]
    UnsupportedChain(u64),

    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// The request cannot be expressed as a message the verifier accepts.
    #[error("invalid sign-in request: {0}")]
    InvalidRequest(String),
}

/// A signing oracle. Calls block until the wallet answers.
pub trait WalletOracle {
    /// The account the wallet will sign with.
    fn account(&self) -> Result<Address, WalletError>;

    /// Switch the wallet to `chain_id`.
    fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// EIP-191 `personal_sign` of `message` by `account`; 65 bytes `r || s || v`.
    fn personal_sign(&self, message: &str, account: &Address) -> Result<Vec<u8>, WalletError>;
}

/// A wallet backed by an in-process private key.
pub struct LocalWallet {
    key: SigningKey,
    address: Address,
    chains: Vec<u64>,
}

impl LocalWallet {
    /// Build from a hex private key (with or without `0x`) and the chains
    /// this wallet is willing to switch to.
    pub fn from_hex(private_key: &str, chains: Vec<u64>) -> Result<Self, WalletError> {
        let digits = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = Zeroizing::new(
            hex::decode(digits).map_err(|e| WalletError::InvalidKey(e.to_string()))?,
        );
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        let address = Address::from_public_key(key.verifying_key());

        Ok(LocalWallet {
            key,
            address,
            chains,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign raw bytes with `personal_sign` framing. `v` is 27 or 28.
    pub fn sign_bytes(&self, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        let hash = eip191_hash_message(message);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| WalletError::ProviderUnavailable(e.to_string()))?;

        let mut out = signature.to_bytes().to_vec();
        out.push(recovery_id.to_byte() + 27);
        Ok(out)
    }
}

impl WalletOracle for LocalWallet {
    fn account(&self) -> Result<Address, WalletError> {
        Ok(self.address)
    }

    fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if self.chains.contains(&chain_id) {
            Ok(())
        } else {
            Err(WalletError::UnsupportedChain(chain_id))
        }
    }

    fn personal_sign(&self, message: &str, account: &Address) -> Result<Vec<u8>, WalletError> {
        // A wallet never signs for an account it does not hold
        if *account != self.address {
            return Err(WalletError::UserRejected);
        }
        self.sign_bytes(message.as_bytes())
    }
}

/// What the relying party asks the user to sign.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub domain: String,
    pub uri: String,
    pub chain_id: u64,
    pub nonce: String,
    pub statement: Option<String>,
}

/// A signed message ready to submit to the verify endpoint.
#[derive(Debug, Clone)]
pub struct SignedSignIn {
    pub message: SiweMessage,
    /// `0x`-prefixed hex signature.
    pub signature: String,
}

/// Run the client half of the handshake against `wallet`.
///
/// An empty statement is treated as no statement. The request is rejected
/// before the wallet is asked to sign when any field would break the line
/// structure, or when the built message does not parse back to itself.
pub fn sign_in(
    wallet: &dyn WalletOracle,
    request: SignInRequest,
) -> Result<SignedSignIn, WalletError> {
    let statement = request.statement.filter(|s| !s.is_empty());
    for (field, value) in [
        ("domain", Some(&request.domain)),
        ("uri", Some(&request.uri)),
        ("nonce", Some(&request.nonce)),
        ("statement", statement.as_ref()),
    ] {
        if value.is_some_and(|v| v.contains(['\n', '\r'])) {
            return Err(WalletError::InvalidRequest(format!(
                "{} must be a single line",
                field
            )));
        }
    }

    let account = wallet.account()?;
    wallet.switch_chain(request.chain_id)?;

    let message = SiweMessage {
        domain: request.domain,
        address: account,
        statement,
        uri: request.uri,
        version: SIWE_VERSION.to_string(),
        chain_id: request.chain_id,
        nonce: request.nonce,
        issued_at: Timestamp::now(),
        expiration_time: None,
        not_before: None,
        request_id: None,
        resources: Vec::new(),
    };

    let encoded = message.encode();
    match SiweMessage::parse(&encoded) {
        Ok(parsed) if parsed == message => {}
        Ok(_) => {
            return Err(WalletError::InvalidRequest(
                "message does not encode canonically".to_string(),
            ))
        }
        Err(e) => return Err(WalletError::InvalidRequest(e.to_string())),
    }

    let signature = wallet.personal_sign(&encoded, &account)?;
    Ok(SignedSignIn {
        message,
        signature: format!("0x{}", hex::encode(signature)),
    })
}
