//! Redis-backed nonce store for multi-process deployments.
//!
//! Redis key pattern:
//! - `siwe:nonce:{session_key}`: nonce record (JSON), `SET EX` with the
//!   nonce TTL so Redis itself retires abandoned challenges.
//!
//! Consumption deletes the key from inside a Lua script after comparing the
//! stored nonce and expiry, so two concurrent verifications of the same
//! nonce cannot both win. The key TTL only reclaims abandoned records;
//! liveness is decided by `expires_at` like in the memory store.
//!
//! Records read back from Redis pass through `Zeroizing` so the JSON copy of
//! a live nonce does not linger in freed memory.

use crate::models::NonceRecord;
use crate::storage::StoreError;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use zeroize::Zeroizing;

const KEY_PREFIX: &str = "siwe:nonce:";

fn nonce_key(session_key: &str) -> String {
    format!("{}{}", KEY_PREFIX, session_key)
}

/// Handle to a Redis server holding nonce records.
#[derive(Clone)]
pub struct RedisNonceStore {
    client: redis::Client,
}

impl RedisNonceStore {
    /// Open a client and check that the server answers.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let mut con = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(RedisNonceStore { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    pub async fn put(
        &self,
        session_key: &str,
        record: &NonceRecord,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        store_record(&mut con, session_key, record, ttl_secs).await
    }

    pub async fn get(&self, session_key: &str) -> Result<Option<NonceRecord>, StoreError> {
        let mut con = self.connection().await?;
        get_record(&mut con, session_key).await
    }

    pub async fn consume(
        &self,
        session_key: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        consume_record(&mut con, session_key, nonce, now).await
    }

    pub async fn remove(&self, session_key: &str) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        delete_record(&mut con, session_key).await
    }
}

/// Store a nonce record, replacing whatever the session held before.
///
/// `SET EX` swaps the value in one command, so a concurrent reader sees the
/// old record or the new one, never a mix.
pub async fn store_record<C>(
    con: &mut C,
    session_key: &str,
    record: &NonceRecord,
    ttl_secs: u64,
) -> Result<(), StoreError>
where
    C: AsyncCommands,
{
    let json = serde_json::to_string(record)?;
    con.set_ex::<_, _, ()>(nonce_key(session_key), json, ttl_secs)
        .await?;
    Ok(())
}

/// Get the record for a session, if one is still held.
pub async fn get_record<C>(con: &mut C, session_key: &str) -> Result<Option<NonceRecord>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(nonce_key(session_key)).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let record = serde_json::from_str(&zeroizing_data)?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Atomically consume the session's record if it still holds `nonce` and
/// is live at `now`.
///
/// Returns `true` for exactly one caller per issued nonce.
pub async fn consume_record<C>(
    con: &mut C,
    session_key: &str,
    nonce: &str,
    now: DateTime<Utc>,
) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    // Lua script for atomic compare + DEL
    let script = redis::Script::new(
        r"
        local val = redis.call('GET', KEYS[1])
        if not val then
            return 0
        end
        local record = cjson.decode(val)
        if record.value == ARGV[1]
            and not record.consumed
            and tonumber(ARGV[2]) <= record.expires_at then
            redis.call('DEL', KEYS[1])
            return 1
        end
        return 0
        ",
    );

    let consumed: i32 = script
        .key(nonce_key(session_key))
        .arg(nonce)
        .arg(now.timestamp_millis())
        .invoke_async(con)
        .await?;
    Ok(consumed == 1)
}

/// Delete the session's record. Returns true if one existed.
pub async fn delete_record<C>(con: &mut C, session_key: &str) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let deleted: i32 = con.del(nonce_key(session_key)).await?;
    Ok(deleted > 0)
}
