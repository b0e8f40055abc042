//! Cache-aside coordinator for pricing computations.
//!
//! Pricing a manufacturing request is expensive and deterministic, which
//! makes it a natural fit for semantic caching: requests are canonicalized
//! and hashed (`pricecache-hash`), results live in a fast Redis tier
//! (`pricecache-redis`) with a durable PostgreSQL fallback
//! (`pricecache-postgres`), and a distributed lock collapses concurrent
//! cache-miss storms into a single computation.
//!
//! Both tiers are accelerators only. Any tier failure degrades to a cache
//! miss; total lock-store failure degrades to redundant computation. The
//! caller always receives either a well-formed [`CacheResult`] or the exact
//! error its own compute callback returned.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pricecache::{CacheControl, CacheSettings, PricingCache};
//! use pricecache_redis::{RedisConfig, RedisFastStore};
//! use pricecache_postgres::{PostgresConfig, PostgresDurableStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let redis = RedisFastStore::new(pricecache_redis::create_pool(&RedisConfig::default())?);
//! let pg = PostgresDurableStore::new(
//!     pricecache_postgres::create_pool(&PostgresConfig::default()).await?,
//! );
//!
//! let cache = PricingCache::new(
//!     CacheSettings::from_env(),
//!     Arc::new(redis),
//!     Some(Arc::new(pg)),
//! );
//!
//! let quote = cache
//!     .with_cache("acme", "v3", &request, &CacheControl::default(), || async {
//!         price_request(&request).await
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod settings;
mod store;
mod types;

pub use coordinator::PricingCache;
pub use settings::CacheSettings;
pub use store::{DurableStore, DynDurableStore, DynFastStore, FastStore};
pub use types::{CacheControl, CacheMetadata, CacheResult, CacheSource, CacheStatus};

// The hash pipeline is part of the public contract; callers may want to
// derive keys without going through the coordinator.
pub use pricecache_hash::{CanonicalizeOptions, HashOptions, StableHash, stable_hash};
