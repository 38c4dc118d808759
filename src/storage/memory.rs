//! In-process nonce store: one mutex-guarded map from session key to record.

use crate::models::NonceRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared in-memory nonce store. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct MemoryNonceStore {
    records: Arc<Mutex<HashMap<String, NonceRecord>>>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a record half-written
    // (every mutation is a single insert or field store), so poison is
    // safe to ignore.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, NonceRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace the session's record.
    pub fn put(&self, session_key: &str, record: NonceRecord) {
        self.lock().insert(session_key.to_string(), record);
    }

    pub fn get(&self, session_key: &str) -> Option<NonceRecord> {
        self.lock().get(session_key).cloned()
    }

    /// Mark the session's record consumed if it still holds `nonce` and is
    /// live at `now`. Check and mark happen under one lock acquisition.
    pub fn consume(&self, session_key: &str, nonce: &str, now: DateTime<Utc>) -> bool {
        let mut records = self.lock();
        match records.get_mut(session_key) {
            Some(record) if record.value == nonce && record.is_live(now) => {
                record.consumed = true;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, session_key: &str) -> bool {
        self.lock().remove(session_key).is_some()
    }

    /// Drop consumed and expired records. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| record.is_live(now));
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
