//! Local filesystem storage backend.
//!
//! Objects are plain files under a root directory. The ETag is the quoted MD5
//! of the stored bytes, the same form a single-part S3 upload reports.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ExistenceWait, MetadataLookup, ObjectMeta, TransferBackend};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem object store.
#[derive(Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the full path for a key, rejecting keys that would escape the root.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "key must be a non-empty relative path: {key:?}"
            )));
        }

        for component in Path::new(key).components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "contains unsafe path component: {key}"
                    )));
                }
            }
        }

        Ok(self.root.join(key))
    }

    fn not_found(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
        move |e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        }
    }
}

#[async_trait]
impl TransferBackend for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn put(&self, local: &Path, key: &str) -> StorageResult<u64> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file and rename so readers never see a partial object.
        let temp = path.with_file_name(format!(".vouch-{}.tmp", Uuid::new_v4()));
        let written = match fs::copy(local, &temp).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io(e));
            }
        };
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Io(e));
        }

        Ok(written)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str, local: &Path) -> StorageResult<u64> {
        let path = self.key_path(key)?;
        let metadata = fs::metadata(&path).await.map_err(Self::not_found(key))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        // The object exists, so any copy failure is a local I/O problem.
        match fs::copy(&path, local).await {
            Ok(n) => Ok(n),
            Err(e) => {
                let _ = fs::remove_file(local).await;
                Err(StorageError::Io(e))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[async_trait]
impl MetadataLookup for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key)?;
        let metadata = fs::metadata(&path).await.map_err(Self::not_found(key))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let hash_path = path.clone();
        let digest = tokio::task::spawn_blocking(move || vouch_core::single_part_hash(&hash_path))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
            .map_err(|e| match e {
                vouch_core::Error::Io(io) => Self::not_found(key)(io),
                other => StorageError::Io(std::io::Error::other(other.to_string())),
            })?;

        Ok(ObjectMeta {
            e_tag: format!("\"{digest}\""),
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(|t| t.into()),
        })
    }
}

#[async_trait]
impl ExistenceWait for FilesystemBackend {
    async fn wait_until_exists(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        if fs::try_exists(&path).await? {
            Ok(())
        } else {
            Err(StorageError::NotFound(key.to_string()))
        }
    }
}
