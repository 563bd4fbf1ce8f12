//! Local file vs. stored object integrity check.

use crate::traits::{HashReconstructor, ObjectMeta};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vouch_core::{Error, ParsedTag, Result};

/// MD5-based reconstruction matching S3-compatible ETags.
#[derive(Clone, Copy, Debug, Default)]
pub struct Md5Reconstructor;

impl HashReconstructor for Md5Reconstructor {
    fn single_part(&self, path: &Path) -> Result<String> {
        vouch_core::single_part_hash(path)
    }

    fn multi_part(&self, path: &Path, part_size: u64) -> Result<String> {
        vouch_core::multi_part_hash(path, part_size)
    }
}

/// Result of comparing a local file against an object's ETag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    /// Digest portion of the stored ETag.
    pub expected: String,
    /// Digest reconstructed from the local file.
    pub actual: String,
    /// Part count from the ETag.
    pub part_count: u64,
}

impl Verification {
    /// Whether the local file matches the stored object.
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// Decides whether a local file matches a stored object.
///
/// Holds no per-call state; every call parses and hashes from scratch.
#[derive(Clone)]
pub struct IntegrityChecker {
    hasher: Arc<dyn HashReconstructor>,
}

impl std::fmt::Debug for IntegrityChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityChecker").finish_non_exhaustive()
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new(Arc::new(Md5Reconstructor))
    }
}

impl IntegrityChecker {
    /// Create a checker using the given hash reconstructor.
    pub fn new(hasher: Arc<dyn HashReconstructor>) -> Self {
        Self { hasher }
    }

    /// Whether `path` matches the object described by `meta`.
    ///
    /// Parse and hashing errors are returned as errors, never as `false`.
    pub async fn verify(&self, path: &Path, meta: &ObjectMeta) -> Result<bool> {
        Ok(self.check(path, meta).await?.matches())
    }

    /// Compare `path` against `meta`, returning both digests.
    #[tracing::instrument(skip(self, meta), fields(e_tag = %meta.e_tag, size = meta.size))]
    pub async fn check(&self, path: &Path, meta: &ObjectMeta) -> Result<Verification> {
        let tag = ParsedTag::parse(&meta.e_tag)?;
        tracing::debug!(hash = %tag.hash, part_count = tag.part_count, "Parsed etag");

        let hasher = self.hasher.clone();
        let owned: PathBuf = path.to_path_buf();
        let actual = if tag.is_multipart() {
            let part_size = vouch_core::part_size(meta.size, tag.part_count)?;
            tracing::debug!(part_size, "Replaying multipart chunking");
            tokio::task::spawn_blocking(move || hasher.multi_part(&owned, part_size))
                .await
                .map_err(join_error)??
        } else {
            tokio::task::spawn_blocking(move || hasher.single_part(&owned))
                .await
                .map_err(join_error)??
        };
        tracing::debug!(local_hash = %actual, "Reconstructed local hash");

        Ok(Verification {
            expected: tag.hash,
            actual,
            part_count: tag.part_count,
        })
    }
}

fn join_error(err: tokio::task::JoinError) -> Error {
    Error::Io(std::io::Error::other(format!("hash task failed: {err}")))
}
