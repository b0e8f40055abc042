//! Stable hash and cache key derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::{CanonicalizeOptions, to_canonical_json};

const DEFAULT_HASH_LENGTH: usize = 12;
const DEFAULT_KEY_PREFIX: &str = "pc";

/// Lowercase RFC 4648 alphabet; compact ids stay shell- and URL-safe.
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Options for hash and key derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashOptions {
    /// Cache key prefix segment.
    pub prefix: String,

    /// Length of the base32 compact id embedded in the cache key.
    pub hash_length: usize,

    /// Canonicalization field sets.
    pub canonicalize: CanonicalizeOptions,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            hash_length: DEFAULT_HASH_LENGTH,
            canonicalize: CanonicalizeOptions::default(),
        }
    }
}

/// Deterministic fingerprint of a (tenant, schema version, request) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableHash {
    /// Compact canonical JSON the digest was computed over.
    pub canonical_json: String,

    /// Hex-encoded SHA-256 of the canonical JSON.
    pub digest_hex: String,

    /// Truncated base32 rendering of the digest.
    pub compact_id: String,

    /// Wire-stable key: `{prefix}:{tenant}:{version}:{compact_id}`.
    pub cache_key: String,
}

/// Computes the stable hash for a request.
///
/// Pure: identical `(tenant_id, schema_version, request)` triples always
/// produce byte-identical output, across processes and hosts. Namespacing by
/// `schema_version` routes version bumps to a disjoint key space without
/// explicit invalidation.
pub fn stable_hash(
    tenant_id: &str,
    schema_version: &str,
    request: &Value,
    options: &HashOptions,
) -> StableHash {
    let canonical_json = to_canonical_json(request, &options.canonicalize);
    let digest = Sha256::digest(canonical_json.as_bytes());
    let digest_hex = hex::encode(digest);

    let mut compact_id = base32_encode(&digest);
    compact_id.truncate(options.hash_length);

    let cache_key = format!(
        "{}:{}:{}:{}",
        options.prefix, tenant_id, schema_version, compact_id
    );

    StableHash {
        canonical_json,
        digest_hex,
        compact_id,
        cache_key,
    }
}

/// Base32-encodes bytes, consuming 5 bits at a time and zero-padding the
/// final partial group.
pub fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in bytes {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;

        while bits >= 5 {
            let index = ((acc >> (bits - 5)) & 0x1f) as usize;
            out.push(BASE32_ALPHABET[index] as char);
            bits -= 5;
        }
    }

    if bits > 0 {
        let index = ((acc << (5 - bits)) & 0x1f) as usize;
        out.push(BASE32_ALPHABET[index] as char);
    }

    out
}
