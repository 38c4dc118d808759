//! Sign-In with Ethereum: nonce issuance, message codec, and signature
//! verification.

pub mod issuer;
pub mod message;
pub mod middleware;
pub mod nonce;
pub mod signature;
pub mod verifier;
pub mod wallet;

pub use alloy_primitives::Address;
pub use message::SiweMessage;
pub use middleware::{AppState, RequestDomain};
pub use nonce::{generate_nonce, generate_session_key};
pub use verifier::{authenticate, verify, Expectations, SignIn, VerificationResult};
pub use wallet::{LocalWallet, WalletError, WalletOracle};
