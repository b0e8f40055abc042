//! Durable cache record storage.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::Result;

/// A cache row read back from the durable tier.
#[derive(Debug, Clone)]
pub struct CacheRecord {
    pub id: Uuid,
    pub response: Value,
    pub ttl_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub hit_count: i64,
}

impl CacheRecord {
    /// Whether the record's TTL has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ttl_at <= now
    }
}

/// A cache row to insert or refresh.
#[derive(Debug, Clone)]
pub struct NewCacheRecord {
    pub tenant_id: String,
    pub request_hash: String,
    pub schema_version: String,
    pub request: Value,
    pub response: Value,
    pub ttl_at: DateTime<Utc>,
    pub size_bytes: i64,
}

/// PostgreSQL-backed durable tier.
///
/// The backing table is created lazily on first use, so the cache can point
/// at any database without a separate migration step.
#[derive(Clone)]
pub struct PostgresDurableStore {
    pool: PgPool,
    table_created: std::sync::Arc<AtomicBool>,
}

impl PostgresDurableStore {
    /// Creates a durable store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_created: std::sync::Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ensure the cache table exists.
    #[instrument(skip(self))]
    async fn ensure_table(&self) -> Result<()> {
        if self.table_created.load(Ordering::Relaxed) {
            return Ok(());
        }

        sqlx_core::query::query(
            r#"
            CREATE TABLE IF NOT EXISTS pricing_cache_entries (
                id UUID PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                request_hash TEXT NOT NULL,
                schema_version TEXT NOT NULL,
                request JSONB NOT NULL,
                response JSONB NOT NULL,
                ttl_at TIMESTAMPTZ NOT NULL,
                size_bytes BIGINT NOT NULL DEFAULT 0,
                hit_count BIGINT NOT NULL DEFAULT 0,
                last_hit_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (tenant_id, request_hash, schema_version)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx_core::query::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_pricing_cache_ttl
                ON pricing_cache_entries(ttl_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Created pricing cache table");
        self.table_created.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Finds the cache row for a (tenant, digest, schema version) triple.
    pub async fn find(
        &self,
        tenant_id: &str,
        request_hash: &str,
        schema_version: &str,
    ) -> Result<Option<CacheRecord>> {
        self.ensure_table().await?;

        let row: Option<(Uuid, Value, DateTime<Utc>, DateTime<Utc>, i64)> =
            sqlx_core::query_as::query_as(
                r#"
                SELECT id, response, ttl_at, created_at, hit_count
                FROM pricing_cache_entries
                WHERE tenant_id = $1 AND request_hash = $2 AND schema_version = $3
                "#,
            )
            .bind(tenant_id)
            .bind(request_hash)
            .bind(schema_version)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, response, ttl_at, created_at, hit_count)| CacheRecord {
            id,
            response,
            ttl_at,
            created_at,
            hit_count,
        }))
    }

    /// Inserts a cache row, or refreshes it if the unique key already exists.
    pub async fn upsert(&self, record: &NewCacheRecord) -> Result<()> {
        self.ensure_table().await?;

        sqlx_core::query::query(
            r#"
            INSERT INTO pricing_cache_entries
                (id, tenant_id, request_hash, schema_version,
                 request, response, ttl_at, size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (tenant_id, request_hash, schema_version)
            DO UPDATE SET
                request = EXCLUDED.request,
                response = EXCLUDED.response,
                ttl_at = EXCLUDED.ttl_at,
                size_bytes = EXCLUDED.size_bytes,
                updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.tenant_id)
        .bind(&record.request_hash)
        .bind(&record.schema_version)
        .bind(&record.request)
        .bind(&record.response)
        .bind(record.ttl_at)
        .bind(record.size_bytes)
        .execute(&self.pool)
        .await?;

        debug!(
            tenant_id = %record.tenant_id,
            request_hash = %record.request_hash,
            "durable tier upsert"
        );
        Ok(())
    }

    /// Increments the hit counter for a row.
    pub async fn record_hit(&self, id: Uuid) -> Result<()> {
        self.ensure_table().await?;

        sqlx_core::query::query(
            r#"
            UPDATE pricing_cache_entries
            SET hit_count = hit_count + 1, last_hit_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Closes the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
