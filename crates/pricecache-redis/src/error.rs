//! Error types for the Redis fast tier.

/// Errors from the Redis fast tier.
#[derive(Debug, thiserror::Error)]
pub enum FastStoreError {
    /// Failed to create or check out a pooled connection.
    #[error("Redis pool error: {0}")]
    Pool(String),

    /// A Redis command failed.
    #[error("Redis command error: {0}")]
    Command(#[from] redis::RedisError),

    /// A cached envelope could not be encoded or decoded.
    #[error("Envelope codec error: {0}")]
    Codec(String),
}

impl FastStoreError {
    /// Creates a new codec error.
    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }
}

/// Result type alias for fast tier operations.
pub type Result<T> = std::result::Result<T, FastStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FastStoreError::Pool("timed out".into());
        assert!(err.to_string().contains("pool error"));

        let err = FastStoreError::codec("truncated gzip stream");
        assert!(err.to_string().contains("codec"));
    }
}
