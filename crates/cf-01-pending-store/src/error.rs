//! Error types for the pending store

use thiserror::Error;

/// Errors raised by a key-value backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    Io { message: String },

    /// Persisted data could not be decoded.
    #[error("KV store corruption: {message}")]
    Corruption { message: String },
}

/// Pending store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entry could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend read/write failed
    #[error("Backend error: {0}")]
    Backend(#[from] KVStoreError),
}

/// Result type for pending store operations
pub type StoreResult<T> = Result<T, StoreError>;
