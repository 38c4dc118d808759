//! Nonce storage: session key → nonce record.
//!
//! Two backends sit behind one `NonceStore` handle:
//! - `Memory`: a mutex-guarded map for single-process deployments.
//! - `Redis`: shared storage for deployments with more than one process.
//!
//! Both replace records atomically and consume them with a single
//! compare-and-mark step, so concurrent duplicate verifications cannot both
//! succeed.

pub mod memory;
pub mod redis_store;

pub use memory::MemoryNonceStore;
pub use redis_store::RedisNonceStore;

use crate::models::NonceRecord;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle to the configured nonce backend.
#[derive(Clone)]
pub enum NonceStore {
    Memory(MemoryNonceStore),
    Redis(RedisNonceStore),
}

impl NonceStore {
    pub fn memory() -> Self {
        NonceStore::Memory(MemoryNonceStore::new())
    }

    /// Store `record` for the session, replacing any previous one.
    pub async fn put(&self, session_key: &str, record: &NonceRecord) -> Result<(), StoreError> {
        match self {
            NonceStore::Memory(store) => {
                store.put(session_key, record.clone());
                Ok(())
            }
            NonceStore::Redis(store) => {
                let ttl_secs = (record.expires_at - record.issued_at).num_seconds().max(1) as u64;
                store.put(session_key, record, ttl_secs).await
            }
        }
    }

    pub async fn get(&self, session_key: &str) -> Result<Option<NonceRecord>, StoreError> {
        match self {
            NonceStore::Memory(store) => Ok(store.get(session_key)),
            NonceStore::Redis(store) => store.get(session_key).await,
        }
    }

    /// Atomically consume the session's record if it still holds `nonce`
    /// and is live at `now`. Returns `true` for at most one caller.
    pub async fn consume(
        &self,
        session_key: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self {
            NonceStore::Memory(store) => Ok(store.consume(session_key, nonce, now)),
            NonceStore::Redis(store) => store.consume(session_key, nonce, now).await,
        }
    }

    pub async fn remove(&self, session_key: &str) -> Result<bool, StoreError> {
        match self {
            NonceStore::Memory(store) => Ok(store.remove(session_key)),
            NonceStore::Redis(store) => store.remove(session_key).await,
        }
    }
}
