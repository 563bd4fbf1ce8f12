//! Core integrity logic for verified object-storage transfers.
//!
//! This crate reproduces an object store's ETag from a file on disk:
//! - ETag parsing into a hash and part count
//! - Multipart part size recovery from object size and part count
//! - Single-part and multipart MD5 reconstruction
//! - Retry budget and storage configuration shared across crates

pub mod config;
pub mod error;
pub mod etag;
pub mod hash;
pub mod multipart;

pub use config::{AppConfig, RetryBudget, RetryConfig, StorageConfig};
pub use error::{Error, Result};
pub use etag::ParsedTag;
pub use hash::{ContentDigest, multi_part_hash, single_part_hash};
pub use multipart::part_size;

/// One mebibyte. Multipart part sizes are always a multiple of this.
pub const MEGABYTE: u64 = 1024 * 1024;
