//! Configuration and pool construction for the Redis fast tier.

use std::time::Duration;

use deadpool_redis::{Pool, PoolConfig, Runtime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FastStoreError, Result};

/// Configuration for the Redis fast tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL: `redis://host:port`
    pub url: String,

    /// Maximum number of pooled connections.
    pub pool_size: usize,

    /// Timeout for creating and checking out connections, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".into(),
            pool_size: 16,
            connect_timeout_ms: 5000,
        }
    }
}

impl RedisConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the pool size.
    #[must_use]
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.connect_timeout_ms = timeout;
        self
    }
}

/// Creates a Redis connection pool from the given configuration.
///
/// The pool is cheap to clone and safe to share across tasks; construct it
/// once at startup and inject it where needed.
pub fn create_pool(config: &RedisConfig) -> Result<Pool> {
    info!(
        url = %config.url,
        pool_size = config.pool_size,
        "Creating Redis connection pool"
    );

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);

    let mut pool_config = PoolConfig::new(config.pool_size);
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    redis_config.pool = Some(pool_config);

    redis_config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| FastStoreError::Pool(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 16);
        assert_eq!(config.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_config_builder() {
        let config = RedisConfig::new("redis://cache:6380")
            .with_pool_size(4)
            .with_connect_timeout_ms(250);

        assert_eq!(config.url, "redis://cache:6380");
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.connect_timeout_ms, 250);
    }

    #[test]
    fn test_create_pool_from_valid_url() {
        // Pool creation does not connect; only the URL is validated here.
        let pool = create_pool(&RedisConfig::default());
        assert!(pool.is_ok());
    }
}
