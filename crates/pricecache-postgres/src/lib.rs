//! PostgreSQL durable tier for the pricing cache.
//!
//! The durable tier outlives Redis restarts and doubles as an audit surface:
//! each row keeps the original request, the computed response, a TTL, and a
//! hit counter. Rows are keyed unique on
//! `(tenant_id, request_hash, schema_version)`.
//!
//! Like the fast tier, this is an accelerator: callers treat every error
//! here as a cache miss.

mod config;
mod error;
mod pool;
mod store;

pub use config::PostgresConfig;
pub use error::{DurableStoreError, Result};
pub use pool::create_pool;
pub use store::{CacheRecord, NewCacheRecord, PostgresDurableStore};
