//! Redis fast tier for the pricing cache.
//!
//! Cached responses are stored as a gzip-compressed JSON envelope keyed by
//! the stable cache key. The same connection pool also carries the
//! distributed anti-stampede lock: `SET NX PX` for acquisition and an atomic
//! Lua compare-token-then-delete for release.
//!
//! The tier is an accelerator, never a source of truth: every operation
//! surfaces its error to the caller, which is expected to treat failures as
//! cache misses.

mod config;
mod envelope;
mod error;
mod lock;
mod store;

pub use config::{RedisConfig, create_pool};
pub use envelope::CacheEnvelope;
pub use error::{FastStoreError, Result};
pub use lock::lock_key;
pub use store::{FastHit, RedisFastStore};
