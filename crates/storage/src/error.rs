//! Storage and transfer error types.

use thiserror::Error;

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Outcome of a failed verified transfer.
///
/// Only the error from the final attempt is reported.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer failed: {0}")]
    Backend(#[source] StorageError),

    #[error("object did not become visible: {0}")]
    ExistenceWait(#[source] StorageError),

    #[error("metadata lookup failed: {0}")]
    MetadataLookup(#[source] StorageError),

    #[error("integrity check failed: {0}")]
    Integrity(#[from] vouch_core::Error),

    #[error("etag mismatch for {key}: store has {expected}, local file hashes to {actual}")]
    ETagMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("transfer cancelled")]
    Cancelled,
}

/// Result type for controller operations.
pub type TransferResult<T> = std::result::Result<T, TransferError>;
