//! Fast tier client over a shared Redis pool.

use std::time::Duration;

use deadpool_redis::Pool;
use rand::Rng;
use redis::AsyncCommands;
use tracing::debug;

use crate::envelope::CacheEnvelope;
use crate::error::{FastStoreError, Result};
use crate::lock::LOCK_RELEASE_SCRIPT;

/// A fast-tier hit: the decoded envelope plus the key's remaining TTL.
#[derive(Debug, Clone)]
pub struct FastHit {
    pub envelope: CacheEnvelope,

    /// Remaining TTL in seconds, when Redis reports one.
    pub ttl_remaining: Option<u64>,
}

/// Redis-backed fast tier.
///
/// Holds a pool handle constructed at startup and injected by the caller;
/// cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct RedisFastStore {
    pool: Pool,
}

impl RedisFastStore {
    /// Creates a fast store over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Fetches and decodes the envelope stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Option<FastHit>> {
        let mut conn = self.connection().await?;

        let bytes = conn.get::<_, Option<Vec<u8>>>(key).await?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let envelope = CacheEnvelope::decode(&bytes)?;

        let ttl = conn.ttl::<_, i64>(key).await?;
        let ttl_remaining = (ttl > 0).then_some(ttl as u64);

        Ok(Some(FastHit {
            envelope,
            ttl_remaining,
        }))
    }

    /// Stores an envelope under `key` with a jittered TTL.
    ///
    /// The ±10% jitter spreads out mass expiry of entries written in the
    /// same burst.
    pub async fn set(&self, key: &str, envelope: &CacheEnvelope, ttl_seconds: u64) -> Result<()> {
        let payload = envelope.encode()?;
        let ttl = jittered_ttl(ttl_seconds);

        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, payload, ttl).await?;

        debug!(key = %key, ttl_seconds = ttl, "fast tier set");
        Ok(())
    }

    /// Attempts to acquire the lock at `lock_key` with `token`.
    ///
    /// Single atomic `SET NX PX` attempt; returns whether this caller now
    /// owns the lock. Retry policy belongs to the caller.
    pub async fn try_acquire_lock(
        &self,
        lock_key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.connection().await?;

        let reply = redis::cmd("SET")
            .arg(lock_key)
            .arg(token)
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .arg("NX")
            .query_async::<Option<String>>(&mut conn)
            .await?;

        Ok(reply.is_some())
    }

    /// Releases the lock at `lock_key`, but only if it still holds `token`.
    ///
    /// Returns whether a lock was actually deleted. A stale or foreign
    /// token is a no-op by construction.
    pub async fn release_lock(&self, lock_key: &str, token: &str) -> Result<bool> {
        let mut conn = self.connection().await?;

        let released = redis::Script::new(LOCK_RELEASE_SCRIPT)
            .key(lock_key)
            .arg(token)
            .invoke_async::<i64>(&mut conn)
            .await?;

        Ok(released == 1)
    }

    /// Closes the underlying pool. Subsequent operations fail fast.
    pub fn close(&self) {
        self.pool.close();
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| FastStoreError::Pool(e.to_string()))
    }
}

/// Perturbs a TTL by ±10%, clamped to at least one second.
fn jittered_ttl(ttl_seconds: u64) -> u64 {
    let range = ttl_seconds as f64 * 0.1;
    let jitter = rand::thread_rng().gen_range(-range..=range);
    (ttl_seconds as f64 + jitter).round().max(1.0) as u64
}
