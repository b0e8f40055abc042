//! Canonicalization and stable hashing for pricing cache keys.
//!
//! Pricing requests arrive as arbitrary JSON trees whose surface form varies
//! between callers: key order, array order, and the casing of domain
//! identifier fields all differ without changing the meaning of the request.
//! This crate collapses those variations into a single canonical form and
//! derives a short, namespaced cache key from it.
//!
//! The pipeline is pure and synchronous:
//!
//! ```text
//! serde_json::Value → canonicalize → CanonicalValue → canonical JSON
//!                   → SHA-256 → base32 compact id → cache key
//! ```
//!
//! # Example
//!
//! ```
//! use pricecache_hash::{stable_hash, HashOptions};
//!
//! let request = serde_json::json!({
//!     "process": "CNC_MILLING",
//!     "material_code": "AL6061",
//!     "quantity": 25,
//! });
//!
//! let hash = stable_hash("acme", "v3", &request, &HashOptions::default());
//! assert_eq!(hash.compact_id.len(), 12);
//! assert!(hash.cache_key.starts_with("pc:acme:v3:"));
//! ```

mod canonical;
mod hash;

pub use canonical::{CanonicalValue, CanonicalizeOptions, canonicalize, to_canonical_json};
pub use hash::{HashOptions, StableHash, base32_encode, stable_hash};
