//! Caller-facing control flags and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pricecache_hash::StableHash;

/// Per-call cache control flags.
///
/// Evaluated in priority order: `cacheable == false` wins over `bust`,
/// which wins over `bypass`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheControl {
    /// Recompute and overwrite both tiers, even on a prior hit.
    pub bust: bool,

    /// Compute without reading or writing either tier for this call only.
    pub bypass: bool,

    /// When false, this request is never cached (equivalent to the cache
    /// being disabled for this call).
    pub cacheable: bool,

    /// Explicit TTL override in seconds; takes precedence over `hot_path`.
    /// Zero is ignored.
    pub ttl_seconds: Option<u64>,

    /// Persist with the shorter hot-path TTL.
    pub hot_path: bool,
}

impl Default for CacheControl {
    fn default() -> Self {
        Self {
            bust: false,
            bypass: false,
            cacheable: true,
            ttl_seconds: None,
            hot_path: false,
        }
    }
}

impl CacheControl {
    /// Control that recomputes and overwrites both tiers.
    #[must_use]
    pub fn bust() -> Self {
        Self {
            bust: true,
            ..Self::default()
        }
    }

    /// Control that skips both tiers for this call.
    #[must_use]
    pub fn bypass() -> Self {
        Self {
            bypass: true,
            ..Self::default()
        }
    }
}

/// How the result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a cache tier.
    Hit,
    /// Freshly computed and persisted.
    Miss,
    /// Computed without touching either tier.
    Bypass,
}

/// Which tier served a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheSource {
    FastTier,
    DurableTier,
}

/// Entry metadata returned alongside a hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Remaining fast-tier TTL in seconds, when known.
    pub ttl_remaining_seconds: Option<u64>,

    /// When the entry was originally computed.
    pub created_at: Option<DateTime<Utc>>,
}

/// Outcome of a `with_cache` call; never partially populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheResult {
    pub status: CacheStatus,

    /// Populated on hits only.
    pub source: Option<CacheSource>,

    /// The pricing response, from cache or fresh computation.
    pub response: Value,

    /// The stable hash the lookup was keyed on.
    pub hash: StableHash,

    pub metadata: CacheMetadata,
}

impl CacheResult {
    pub(crate) fn hit(
        source: CacheSource,
        response: Value,
        hash: StableHash,
        metadata: CacheMetadata,
    ) -> Self {
        Self {
            status: CacheStatus::Hit,
            source: Some(source),
            response,
            hash,
            metadata,
        }
    }

    pub(crate) fn miss(response: Value, hash: StableHash) -> Self {
        Self {
            status: CacheStatus::Miss,
            source: None,
            response,
            hash,
            metadata: CacheMetadata::default(),
        }
    }

    pub(crate) fn bypass(response: Value, hash: StableHash) -> Self {
        Self {
            status: CacheStatus::Bypass,
            source: None,
            response,
            hash,
            metadata: CacheMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_control_is_cacheable() {
        let control = CacheControl::default();
        assert!(control.cacheable);
        assert!(!control.bust);
        assert!(!control.bypass);
        assert!(control.ttl_seconds.is_none());
    }

    #[test]
    fn test_source_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&CacheSource::FastTier).expect("serialize"),
            r#""fast-tier""#
        );
        assert_eq!(
            serde_json::to_string(&CacheSource::DurableTier).expect("serialize"),
            r#""durable-tier""#
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CacheStatus::Hit).expect("serialize"),
            r#""hit""#
        );
        assert_eq!(
            serde_json::to_string(&CacheStatus::Bypass).expect("serialize"),
            r#""bypass""#
        );
    }
}
