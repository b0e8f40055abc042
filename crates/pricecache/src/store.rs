//! Tier abstractions consumed by the coordinator.
//!
//! The coordinator talks to both tiers through trait objects so tests can
//! substitute in-memory doubles and deployments can swap implementations.
//! The production implementations live in `pricecache-redis` and
//! `pricecache-postgres`; the impls here just delegate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use pricecache_postgres::{CacheRecord, DurableStoreError, NewCacheRecord, PostgresDurableStore};
use pricecache_redis::{CacheEnvelope, FastHit, FastStoreError, RedisFastStore};

/// Fast network key-value tier, which also hosts the lock records.
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Fetches the envelope stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<FastHit>, FastStoreError>;

    /// Stores an envelope under `key` with the given TTL.
    async fn set(
        &self,
        key: &str,
        envelope: &CacheEnvelope,
        ttl_seconds: u64,
    ) -> Result<(), FastStoreError>;

    /// One atomic set-if-absent attempt on the lock record.
    async fn try_acquire_lock(
        &self,
        lock_key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, FastStoreError>;

    /// Atomic compare-token-then-delete of the lock record.
    async fn release_lock(&self, lock_key: &str, token: &str) -> Result<bool, FastStoreError>;
}

/// Durable relational tier.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Finds the row for a (tenant, digest, schema version) triple.
    async fn find(
        &self,
        tenant_id: &str,
        request_hash: &str,
        schema_version: &str,
    ) -> Result<Option<CacheRecord>, DurableStoreError>;

    /// Inserts or refreshes a row.
    async fn upsert(&self, record: &NewCacheRecord) -> Result<(), DurableStoreError>;

    /// Increments a row's hit counter.
    async fn record_hit(&self, id: Uuid) -> Result<(), DurableStoreError>;
}

/// Shareable fast tier handle.
pub type DynFastStore = Arc<dyn FastStore>;

/// Shareable durable tier handle.
pub type DynDurableStore = Arc<dyn DurableStore>;

#[async_trait]
impl FastStore for RedisFastStore {
    async fn get(&self, key: &str) -> Result<Option<FastHit>, FastStoreError> {
        RedisFastStore::get(self, key).await
    }

    async fn set(
        &self,
        key: &str,
        envelope: &CacheEnvelope,
        ttl_seconds: u64,
    ) -> Result<(), FastStoreError> {
        RedisFastStore::set(self, key, envelope, ttl_seconds).await
    }

    async fn try_acquire_lock(
        &self,
        lock_key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, FastStoreError> {
        RedisFastStore::try_acquire_lock(self, lock_key, token, ttl).await
    }

    async fn release_lock(&self, lock_key: &str, token: &str) -> Result<bool, FastStoreError> {
        RedisFastStore::release_lock(self, lock_key, token).await
    }
}

#[async_trait]
impl DurableStore for PostgresDurableStore {
    async fn find(
        &self,
        tenant_id: &str,
        request_hash: &str,
        schema_version: &str,
    ) -> Result<Option<CacheRecord>, DurableStoreError> {
        PostgresDurableStore::find(self, tenant_id, request_hash, schema_version).await
    }

    async fn upsert(&self, record: &NewCacheRecord) -> Result<(), DurableStoreError> {
        PostgresDurableStore::upsert(self, record).await
    }

    async fn record_hit(&self, id: Uuid) -> Result<(), DurableStoreError> {
        PostgresDurableStore::record_hit(self, id).await
    }
}
