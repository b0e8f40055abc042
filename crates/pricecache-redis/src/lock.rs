//! Distributed lock key derivation and release script.
//!
//! Release must be atomic: a plain GET-then-DEL races with lock expiry and
//! could delete a lock some other caller has since acquired. The Lua script
//! compares the stored token and deletes in a single Redis operation, so a
//! stale token is always a no-op.

/// Atomic compare-token-then-delete, evaluated server-side.
pub(crate) const LOCK_RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
  return redis.call("del", KEYS[1])
end
return 0
"#;

/// Derives the lock key for a cache key by inserting a `lock` segment after
/// the prefix: `pc:acme:v3:abc` → `pc:lock:acme:v3:abc`.
///
/// The mapping is wire-stable; operational tooling depends on it.
#[must_use]
pub fn lock_key(cache_key: &str) -> String {
    match cache_key.split_once(':') {
        Some((prefix, rest)) => format!("{prefix}:lock:{rest}"),
        None => format!("lock:{cache_key}"),
    }
}
