//! Error types for the PostgreSQL durable tier.

/// Errors from the PostgreSQL durable tier.
#[derive(Debug, thiserror::Error)]
pub enum DurableStoreError {
    /// Database query or connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::error::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl DurableStoreError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for durable tier operations.
pub type Result<T> = std::result::Result<T, DurableStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DurableStoreError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));
    }
}
