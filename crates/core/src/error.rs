//! Error types for tag parsing, part sizing and hash reconstruction.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("empty etag")]
    EmptyTag,

    #[error("malformed part count {field:?} in etag")]
    MalformedPartCount {
        field: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid part count: {0} (multipart objects have at least 2 parts)")]
    InvalidPartCount(u64),

    #[error("invalid part size: must be greater than zero")]
    InvalidPartSize,

    #[error("invalid retry budget: {0}")]
    InvalidRetryBudget(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
