//! Error types for cache and usage operations
//!
//! Most cache failures never surface as errors to the caller: the query
//! result cache logs and swallows them. These variants are what the
//! backends, the usage ledger and the pipeline report internally.

use thiserror::Error;

/// Main error type for querycache operations
#[derive(Error, Debug)]
pub enum QueryCacheError {
    /// Connection error - key-value backend unreachable
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Backend command failed after a connection was established
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No usage record exists for the user
    #[error("Unknown user: {user_id}")]
    UnknownUser { user_id: String },

    /// Usage ledger failure
    #[error("Ledger error: {0}")]
    LedgerError(String),

    /// The expensive analysis step failed
    #[error("Analysis failed: {0}")]
    Analysis(#[source] anyhow::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for querycache operations
pub type Result<T> = std::result::Result<T, QueryCacheError>;

impl From<String> for QueryCacheError {
    fn from(s: String) -> Self {
        QueryCacheError::Other(s)
    }
}

impl From<&str> for QueryCacheError {
    fn from(s: &str) -> Self {
        QueryCacheError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for QueryCacheError {
    fn from(e: serde_json::Error) -> Self {
        QueryCacheError::SerializationError(e.to_string())
    }
}

impl From<redis::RedisError> for QueryCacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
            QueryCacheError::ConnectionError(e.to_string())
        } else {
            QueryCacheError::BackendError(e.to_string())
        }
    }
}
