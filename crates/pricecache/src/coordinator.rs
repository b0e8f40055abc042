//! Cache-aside coordination with anti-stampede locking.
//!
//! Per-key flow: lookup, then on a miss acquire the lock, double-check,
//! compute, persist, release. Contended callers poll for the holder's fill
//! and, once their attempts run out, fall back to computing without the
//! lock. The degraded mode bounds worst-case latency; the price is a
//! possible duplicate computation.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use pricecache_hash::{CanonicalizeOptions, HashOptions, StableHash, stable_hash};
use pricecache_postgres::NewCacheRecord;
use pricecache_redis::{CacheEnvelope, lock_key};

use crate::settings::CacheSettings;
use crate::store::{DynDurableStore, DynFastStore};
use crate::types::{CacheControl, CacheMetadata, CacheResult, CacheSource};

/// Cache-aside coordinator over a fast tier and an optional durable tier.
///
/// Stateless between calls apart from the injected tier handles; safe to
/// clone and share across tasks. Tier clients are constructed at startup
/// and closed at shutdown by the embedding process.
#[derive(Clone)]
pub struct PricingCache {
    settings: CacheSettings,
    hash_options: HashOptions,
    fast: DynFastStore,
    durable: Option<DynDurableStore>,
}

impl PricingCache {
    /// Creates a coordinator over the given tiers.
    pub fn new(
        settings: CacheSettings,
        fast: DynFastStore,
        durable: Option<DynDurableStore>,
    ) -> Self {
        let hash_options = HashOptions {
            prefix: settings.key_prefix.clone(),
            hash_length: settings.hash_length,
            canonicalize: CanonicalizeOptions::default(),
        };
        Self {
            settings,
            hash_options,
            fast,
            durable,
        }
    }

    /// Replaces the canonicalization field sets.
    #[must_use]
    pub fn with_canonicalize_options(mut self, options: CanonicalizeOptions) -> Self {
        self.hash_options.canonicalize = options;
        self
    }

    /// Computes the stable hash this coordinator would key a request on.
    pub fn hash(&self, tenant_id: &str, schema_version: &str, request: &Value) -> StableHash {
        stable_hash(tenant_id, schema_version, request, &self.hash_options)
    }

    /// Serves a pricing request through the cache.
    ///
    /// `compute` runs at most once per call and its error propagates to the
    /// caller unmodified; tier and lock failures never surface here.
    pub async fn with_cache<F, Fut, E>(
        &self,
        tenant_id: &str,
        schema_version: &str,
        request: &Value,
        control: &CacheControl,
        compute: F,
    ) -> Result<CacheResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let hash = self.hash(tenant_id, schema_version, request);

        if !self.settings.enabled || !control.cacheable {
            let response = compute().await?;
            return Ok(CacheResult::bypass(response, hash));
        }

        if control.bust {
            let response = compute().await?;
            self.persist(tenant_id, schema_version, &hash, request, &response, control)
                .await;
            return Ok(CacheResult::miss(response, hash));
        }

        if control.bypass {
            let response = compute().await?;
            return Ok(CacheResult::bypass(response, hash));
        }

        if let Some(hit) = self.lookup(tenant_id, schema_version, &hash).await {
            return Ok(hit);
        }

        let token = Uuid::new_v4().to_string();
        let lock = lock_key(&hash.cache_key);

        if !self.acquire_lock(&lock, &token).await {
            // Wait for the lock holder to populate the cache.
            if let Some(hit) = self.wait_for_fill(tenant_id, schema_version, &hash).await {
                return Ok(hit);
            }

            warn!(key = %hash.cache_key, "cache lock contention; computing without lock");
            let response = compute().await?;
            self.persist(tenant_id, schema_version, &hash, request, &response, control)
                .await;
            return Ok(CacheResult::miss(response, hash));
        }

        let outcome = self
            .locked_compute(tenant_id, schema_version, &hash, request, control, compute)
            .await;
        self.release_lock(&lock, &token).await;
        outcome
    }

    /// Double-check then compute-and-persist, with the lock held.
    async fn locked_compute<F, Fut, E>(
        &self,
        tenant_id: &str,
        schema_version: &str,
        hash: &StableHash,
        request: &Value,
        control: &CacheControl,
        compute: F,
    ) -> Result<CacheResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        // Another writer may have filled the cache between the first lookup
        // and lock acquisition.
        if let Some(hit) = self.lookup(tenant_id, schema_version, hash).await {
            return Ok(hit);
        }

        let response = compute().await?;
        self.persist(tenant_id, schema_version, hash, request, &response, control)
            .await;
        Ok(CacheResult::miss(response, hash.clone()))
    }

    /// Fast tier first, then the durable tier with a fast-tier backfill.
    /// Tier errors are logged and treated as misses.
    async fn lookup(
        &self,
        tenant_id: &str,
        schema_version: &str,
        hash: &StableHash,
    ) -> Option<CacheResult> {
        match self.fast.get(&hash.cache_key).await {
            Ok(Some(hit)) => {
                info!(key = %hash.cache_key, source = "fast-tier", "pricing cache hit");
                return Some(CacheResult::hit(
                    CacheSource::FastTier,
                    hit.envelope.response,
                    hash.clone(),
                    CacheMetadata {
                        ttl_remaining_seconds: hit.ttl_remaining,
                        created_at: Some(hit.envelope.created_at),
                    },
                ));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %hash.cache_key, error = %e, "fast tier lookup failed; treating as miss");
            }
        }

        if !self.settings.db_fallback_enabled {
            return None;
        }
        let durable = self.durable.as_ref()?;

        let record = match durable
            .find(tenant_id, &hash.digest_hex, schema_version)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %hash.cache_key, error = %e, "durable tier lookup failed; treating as miss");
                return None;
            }
        };

        if record.is_expired(Utc::now()) {
            return None;
        }

        if let Err(e) = durable.record_hit(record.id).await {
            warn!(key = %hash.cache_key, error = %e, "failed to record durable tier hit");
        }

        // Write-through backfill so the next lookup stays on the fast path.
        let envelope = CacheEnvelope {
            response: record.response.clone(),
            created_at: record.created_at,
            ttl_at: record.ttl_at,
        };
        if let Err(e) = self
            .fast
            .set(&hash.cache_key, &envelope, self.settings.default_ttl_seconds)
            .await
        {
            warn!(key = %hash.cache_key, error = %e, "fast tier backfill failed");
        }

        info!(key = %hash.cache_key, source = "durable-tier", "pricing cache hit");
        Some(CacheResult::hit(
            CacheSource::DurableTier,
            record.response,
            hash.clone(),
            CacheMetadata {
                ttl_remaining_seconds: None,
                created_at: Some(record.created_at),
            },
        ))
    }

    /// Writes the computed response to both tiers. Failures are logged;
    /// the freshly computed response is returned to the caller regardless.
    async fn persist(
        &self,
        tenant_id: &str,
        schema_version: &str,
        hash: &StableHash,
        request: &Value,
        response: &Value,
        control: &CacheControl,
    ) {
        let ttl_seconds = resolve_ttl(&self.settings, control);
        let ttl_at = Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);

        let envelope = CacheEnvelope::new(response.clone(), ttl_at);
        if let Err(e) = self.fast.set(&hash.cache_key, &envelope, ttl_seconds).await {
            warn!(key = %hash.cache_key, error = %e, "fast tier write failed");
        }

        if let Some(durable) = self.durable.as_ref() {
            let record = NewCacheRecord {
                tenant_id: tenant_id.to_string(),
                request_hash: hash.digest_hex.clone(),
                schema_version: schema_version.to_string(),
                request: request.clone(),
                response: response.clone(),
                ttl_at,
                size_bytes: response.to_string().len() as i64,
            };
            if let Err(e) = durable.upsert(&record).await {
                warn!(key = %hash.cache_key, error = %e, "durable tier write failed");
            }
        }

        info!(key = %hash.cache_key, ttl_seconds, "pricing cache fill");
    }

    /// Bounded set-if-absent retry loop. Store errors count as failed
    /// attempts, so a dead lock store degrades instead of hanging.
    async fn acquire_lock(&self, lock_key: &str, token: &str) -> bool {
        let ttl = Duration::from_secs(self.settings.lock_ttl_seconds);
        let started = Instant::now();

        for attempt in 0..self.settings.lock_acquire_attempts {
            match self.fast.try_acquire_lock(lock_key, token, ttl).await {
                Ok(true) => {
                    if attempt > 0 {
                        info!(
                            key = %lock_key,
                            attempts = attempt + 1,
                            waited_ms = started.elapsed().as_millis() as u64,
                            "cache lock acquired after wait"
                        );
                    }
                    return true;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(key = %lock_key, error = %e, "lock acquisition attempt failed");
                }
            }
            self.retry_sleep().await;
        }

        warn!(key = %lock_key, "cache lock acquisition timed out");
        false
    }

    async fn release_lock(&self, lock_key: &str, token: &str) {
        if let Err(e) = self.fast.release_lock(lock_key, token).await {
            // The lock's own TTL bounds the blast radius.
            warn!(key = %lock_key, error = %e, "failed to release cache lock");
        }
    }

    /// Polls the lookup path waiting for the lock holder's fill.
    async fn wait_for_fill(
        &self,
        tenant_id: &str,
        schema_version: &str,
        hash: &StableHash,
    ) -> Option<CacheResult> {
        for _ in 0..self.settings.fill_wait_attempts {
            self.retry_sleep().await;
            if let Some(hit) = self.lookup(tenant_id, schema_version, hash).await {
                return Some(hit);
            }
        }
        None
    }

    async fn retry_sleep(&self) {
        let ms = rand::thread_rng()
            .gen_range(self.settings.retry_delay_min_ms..=self.settings.retry_delay_max_ms);
        sleep(Duration::from_millis(ms)).await;
    }
}

/// Explicit override wins, then the hot-path TTL, then the default.
/// A zero override is ignored.
fn resolve_ttl(settings: &CacheSettings, control: &CacheControl) -> u64 {
    if let Some(ttl) = control.ttl_seconds.filter(|v| *v > 0) {
        return ttl;
    }
    if control.hot_path {
        settings.hot_ttl_seconds
    } else {
        settings.default_ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ttl_precedence() {
        let settings = CacheSettings {
            default_ttl_seconds: 1000,
            hot_ttl_seconds: 100,
            ..CacheSettings::default()
        };

        let default = CacheControl::default();
        assert_eq!(resolve_ttl(&settings, &default), 1000);

        let hot = CacheControl {
            hot_path: true,
            ..CacheControl::default()
        };
        assert_eq!(resolve_ttl(&settings, &hot), 100);

        // An explicit override beats the hot-path shortcut.
        let both = CacheControl {
            hot_path: true,
            ttl_seconds: Some(42),
            ..CacheControl::default()
        };
        assert_eq!(resolve_ttl(&settings, &both), 42);

        let zero = CacheControl {
            ttl_seconds: Some(0),
            ..CacheControl::default()
        };
        assert_eq!(resolve_ttl(&settings, &zero), 1000);
    }
}
