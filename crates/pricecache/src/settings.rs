//! Environment-driven coordinator settings.
//!
//! Every knob has a safe default; malformed environment values silently fall
//! back to the default rather than failing startup.

use serde::{Deserialize, Serialize};

/// Coordinator settings.
///
/// The `PRICING_CACHE_*` environment variables feed [`CacheSettings::from_env`];
/// the retry tunables are code-level knobs with fixed defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Master switch; when off every call bypasses both tiers.
    pub enabled: bool,

    /// Whether lookups fall back to the durable tier on a fast-tier miss.
    pub db_fallback_enabled: bool,

    /// Default entry TTL in seconds (7 days).
    pub default_ttl_seconds: u64,

    /// Shorter TTL for hot-path entries (2 days).
    pub hot_ttl_seconds: u64,

    /// Lock TTL in seconds; bounds the blast radius of a crashed holder.
    pub lock_ttl_seconds: u64,

    /// Length of the base32 compact id in cache keys.
    pub hash_length: usize,

    /// Cache key prefix segment.
    pub key_prefix: String,

    /// Bounded attempt count for lock acquisition.
    pub lock_acquire_attempts: u32,

    /// Bounded attempt count when polling for another holder's fill.
    pub fill_wait_attempts: u32,

    /// Randomized retry delay bounds, in milliseconds.
    pub retry_delay_min_ms: u64,
    pub retry_delay_max_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            db_fallback_enabled: true,
            default_ttl_seconds: 604_800,
            hot_ttl_seconds: 172_800,
            lock_ttl_seconds: 30,
            hash_length: 12,
            key_prefix: "pc".into(),
            lock_acquire_attempts: 30,
            fill_wait_attempts: 30,
            retry_delay_min_ms: 25,
            retry_delay_max_ms: 75,
        }
    }
}

impl CacheSettings {
    /// Builds settings from `PRICING_CACHE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: parse_flag(env_var("PRICING_CACHE_ENABLED"), defaults.enabled),
            db_fallback_enabled: parse_flag(
                env_var("PRICING_CACHE_DB_FALLBACK_ENABLED"),
                defaults.db_fallback_enabled,
            ),
            default_ttl_seconds: parse_number(
                env_var("PRICING_CACHE_TTL_SECONDS"),
                defaults.default_ttl_seconds,
            ),
            hot_ttl_seconds: parse_number(
                env_var("PRICING_CACHE_HOT_TTL_SECONDS"),
                defaults.hot_ttl_seconds,
            ),
            lock_ttl_seconds: parse_number(
                env_var("PRICING_CACHE_LOCK_TTL_SECONDS"),
                defaults.lock_ttl_seconds,
            ),
            hash_length: parse_number(
                env_var("PRICING_CACHE_HASH_LENGTH"),
                defaults.hash_length,
            ),
            key_prefix: env_var("PRICING_CACHE_KEY_PREFIX")
                .unwrap_or_else(|| defaults.key_prefix.clone()),
            ..defaults
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Anything except an explicit `false`, `0`, or `off` counts as true.
fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(value) => !matches!(value.to_lowercase().as_str(), "false" | "0" | "off"),
        None => default,
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();
        assert!(settings.enabled);
        assert!(settings.db_fallback_enabled);
        assert_eq!(settings.default_ttl_seconds, 604_800);
        assert_eq!(settings.hot_ttl_seconds, 172_800);
        assert_eq!(settings.lock_ttl_seconds, 30);
        assert_eq!(settings.hash_length, 12);
        assert_eq!(settings.key_prefix, "pc");
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag(Some("false".into()), true));
        assert!(!parse_flag(Some("0".into()), true));
        assert!(!parse_flag(Some("OFF".into()), true));
        assert!(parse_flag(Some("true".into()), false));
        assert!(parse_flag(Some("1".into()), false));
        assert!(parse_flag(Some("yes".into()), false));
        assert!(parse_flag(None, true));
        assert!(!parse_flag(None, false));
    }

    #[test]
    fn test_parse_number_falls_back_on_garbage() {
        assert_eq!(parse_number(Some("120".into()), 60_u64), 120);
        assert_eq!(parse_number(Some(" 120 ".into()), 60_u64), 120);
        assert_eq!(parse_number(Some("not-a-number".into()), 60_u64), 60);
        assert_eq!(parse_number(None, 60_u64), 60);
    }
}
