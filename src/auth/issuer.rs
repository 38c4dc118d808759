//! Challenge issuance.

use crate::auth::nonce::generate_nonce;
use crate::models::NonceRecord;
use crate::storage::{NonceStore, StoreError};
use chrono::{DateTime, Duration, Utc};

/// Issue a fresh nonce for `session_key`.
///
/// The new record replaces whatever the session held, so an earlier
/// unconsumed nonce for the same session stops working immediately.
pub async fn issue(
    store: &NonceStore,
    session_key: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<NonceRecord, StoreError> {
    let record = NonceRecord::new(generate_nonce(), now, ttl);
    store.put(session_key, &record).await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_stores_live_record() {
        let store = NonceStore::memory();
        let now = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let record = issue(&store, "session", Duration::minutes(10), now)
            .await
            .unwrap();

        assert_eq!(record.value.len(), 32);
        assert_eq!(record.issued_at, now);
        assert_eq!(record.expires_at, now + Duration::minutes(10));
        assert!(!record.consumed);
        assert_eq!(store.get("session").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_nonce() {
        let store = NonceStore::memory();
        let now = Utc::now();

        let first = issue(&store, "session", Duration::minutes(10), now)
            .await
            .unwrap();
        let second = issue(&store, "session", Duration::minutes(10), now)
            .await
            .unwrap();

        assert_ne!(first.value, second.value);
        assert!(!store.consume("session", &first.value, now).await.unwrap());
        assert!(store.consume("session", &second.value, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = NonceStore::memory();
        let now = Utc::now();

        let a = issue(&store, "a", Duration::minutes(10), now).await.unwrap();
        let b = issue(&store, "b", Duration::minutes(10), now).await.unwrap();

        assert!(!store.consume("a", &b.value, now).await.unwrap());
        assert!(store.consume("a", &a.value, now).await.unwrap());
        assert!(store.consume("b", &b.value, now).await.unwrap());
    }
}
