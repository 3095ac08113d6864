//! Error types for the zebrahook service
//!
//! Custom error enum that wraps all possible error types produced across the
//! queue, domain, and API layers.

use thiserror::Error;

/// Main error type for zebrahook operations
#[derive(Debug, Error)]
pub enum Error {
    /// Database errors (Postgres via sqlx)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (bearer token missing/invalid)
    #[error("authentication error: {0}")]
    Auth(String),

    /// Cryptographic failures: secret encryption/decryption, signing
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Queue leasing/scheduling failures
    #[error("queue error: {0}")]
    Queue(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation errors
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Outbound HTTP errors unrelated to a classified delivery outcome
    #[error("external service error: {0}")]
    External(String),

    /// Generic errors
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for zebrahook operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("url is required".to_string());
        assert_eq!(err.to_string(), "validation error: url is required");
    }

    #[test]
    fn test_error_conversion() {
        let sql_err = sqlx::Error::RowNotFound;
        let our_err: Error = sql_err.into();
        assert!(matches!(our_err, Error::Database(_)));
    }
}
