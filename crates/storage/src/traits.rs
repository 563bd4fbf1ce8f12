//! Capability traits consumed by the transfer controller.
//!
//! Each collaborator is a small trait so production backends and scripted
//! test doubles can be swapped independently.

use crate::error::StorageResult;
use async_trait::async_trait;
use std::path::Path;

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Raw ETag as returned by the store, quotes included.
    pub e_tag: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}

/// Moves whole files between local disk and the store.
///
/// Implementations may retry or parallelize internally; callers treat each
/// call as atomic-or-failed.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Upload `local` as `key`, returning the number of bytes sent.
    async fn put(&self, local: &Path, key: &str) -> StorageResult<u64>;

    /// Download `key` into `local`, returning the number of bytes written.
    async fn get(&self, key: &str, local: &Path) -> StorageResult<u64>;

    /// Static identifier for the backend type (e.g., "s3", "filesystem").
    fn backend_name(&self) -> &'static str;
}

/// Fetches object metadata without the content.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Get the ETag and size of `key`.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;
}

/// Confirms a freshly written object is visible to subsequent reads.
#[async_trait]
pub trait ExistenceWait: Send + Sync {
    /// Block until `key` exists or the backend's wait limit is reached.
    async fn wait_until_exists(&self, key: &str) -> StorageResult<()>;
}

/// Reproduces the store's content hash from a local file.
///
/// Methods are synchronous and are run on the blocking thread pool.
pub trait HashReconstructor: Send + Sync {
    /// Whole-file hex digest.
    fn single_part(&self, path: &Path) -> vouch_core::Result<String>;

    /// Hex digest over per-part digests using `part_size` byte parts.
    fn multi_part(&self, path: &Path, part_size: u64) -> vouch_core::Result<String>;
}

/// A store that provides every collaborator the controller needs.
pub trait ObjectStore: TransferBackend + MetadataLookup + ExistenceWait + 'static {}

impl<T: TransferBackend + MetadataLookup + ExistenceWait + 'static> ObjectStore for T {}
