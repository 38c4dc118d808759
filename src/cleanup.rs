//! Background sweep of dead in-memory nonce records.
//!
//! Expiry is enforced at verification time, so this job only reclaims
//! memory held by consumed and abandoned challenges. The Redis backend does
//! not need it: keys carry their own TTL.

use crate::storage::MemoryNonceStore;
use chrono::Utc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Every `interval`, removes records that are consumed or past expiry.
pub async fn run_sweep_loop(store: MemoryNonceStore, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        sweep_once(&store);
    }
}

/// One sweep pass. Returns how many records were dropped.
pub fn sweep_once(store: &MemoryNonceStore) -> usize {
    let removed = store.sweep(Utc::now());
    if removed > 0 {
        tracing::info!(
            removed = removed,
            remaining = store.len(),
            "Nonce sweep completed"
        );
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NonceRecord;

    #[test]
    fn test_sweep_once_keeps_live_records() {
        let store = MemoryNonceStore::new();
        let now = Utc::now();
        store.put(
            "live",
            NonceRecord::new("live0000".to_string(), now, chrono::Duration::minutes(10)),
        );
        store.put(
            "stale",
            NonceRecord::new(
                "stale000".to_string(),
                now - chrono::Duration::hours(1),
                chrono::Duration::minutes(10),
            ),
        );

        assert_eq!(sweep_once(&store), 1);
        assert!(store.get("live").is_some());
        assert!(store.get("stale").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_loop_runs_on_interval() {
        let store = MemoryNonceStore::new();
        store.put(
            "stale",
            NonceRecord::new(
                "stale000".to_string(),
                Utc::now() - chrono::Duration::hours(1),
                chrono::Duration::minutes(10),
            ),
        );

        let task = tokio::spawn(run_sweep_loop(store.clone(), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(61)).await;
        task.abort();

        assert!(store.is_empty());
    }
}
