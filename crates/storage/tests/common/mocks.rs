//! Scripted collaborators for controller tests.
//!
//! Each double answers its N-th call with the N-th scripted entry. Once the
//! script is exhausted the last entry repeats, so `vec![Err(..)]` means
//! "always fail". Call counts are exposed for assertions.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vouch_storage::error::{StorageError, StorageResult};
use vouch_storage::traits::{
    ExistenceWait, HashReconstructor, MetadataLookup, ObjectMeta, TransferBackend,
};

fn scripted<T: Clone>(script: &[T], counter: &AtomicUsize) -> T {
    let index = counter.fetch_add(1, Ordering::SeqCst);
    script[index.min(script.len() - 1)].clone()
}

fn storage_error(message: &'static str) -> StorageError {
    StorageError::Io(std::io::Error::other(message))
}

/// Transfer backend whose `put` and `get` follow separate scripts.
#[allow(dead_code)]
pub struct ScriptedBackend {
    puts: Vec<Result<u64, &'static str>>,
    gets: Vec<Result<u64, &'static str>>,
    pub put_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn uploads(puts: Vec<Result<u64, &'static str>>) -> Arc<Self> {
        Self::new(puts, vec![Err("get not scripted")])
    }

    pub fn downloads(gets: Vec<Result<u64, &'static str>>) -> Arc<Self> {
        Self::new(vec![Err("put not scripted")], gets)
    }

    pub fn new(
        puts: Vec<Result<u64, &'static str>>,
        gets: Vec<Result<u64, &'static str>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            puts,
            gets,
            put_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        })
    }

    pub fn puts(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferBackend for ScriptedBackend {
    async fn put(&self, _local: &Path, _key: &str) -> StorageResult<u64> {
        scripted(&self.puts, &self.put_calls).map_err(storage_error)
    }

    async fn get(&self, _key: &str, _local: &Path) -> StorageResult<u64> {
        scripted(&self.gets, &self.get_calls).map_err(storage_error)
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// Metadata lookup returning scripted ETags.
#[allow(dead_code)]
pub struct ScriptedLookup {
    script: Vec<Result<(&'static str, u64), &'static str>>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedLookup {
    pub fn new(script: Vec<Result<(&'static str, u64), &'static str>>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    /// Lookup that always reports `e_tag` with `size`.
    pub fn fixed(e_tag: &'static str, size: u64) -> Arc<Self> {
        Self::new(vec![Ok((e_tag, size))])
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataLookup for ScriptedLookup {
    async fn head(&self, _key: &str) -> StorageResult<ObjectMeta> {
        let (e_tag, size) = scripted(&self.script, &self.calls).map_err(storage_error)?;
        Ok(ObjectMeta {
            e_tag: e_tag.to_string(),
            size,
            last_modified: None,
        })
    }
}

/// Hash reconstructor returning scripted digests for either mode.
#[allow(dead_code)]
pub struct ScriptedHasher {
    script: Vec<Result<&'static str, &'static str>>,
    pub calls: AtomicUsize,
    pub multi_part_calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedHasher {
    pub fn new(script: Vec<Result<&'static str, &'static str>>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            multi_part_calls: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> vouch_core::Result<String> {
        scripted(&self.script, &self.calls)
            .map(str::to_string)
            .map_err(|message| vouch_core::Error::Io(std::io::Error::other(message)))
    }
}

impl HashReconstructor for ScriptedHasher {
    fn single_part(&self, _path: &Path) -> vouch_core::Result<String> {
        self.next()
    }

    fn multi_part(&self, _path: &Path, _part_size: u64) -> vouch_core::Result<String> {
        self.multi_part_calls.fetch_add(1, Ordering::SeqCst);
        self.next()
    }
}

/// Existence wait following a script.
#[allow(dead_code)]
pub struct ScriptedExistence {
    script: Vec<Result<(), &'static str>>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedExistence {
    pub fn new(script: Vec<Result<(), &'static str>>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExistenceWait for ScriptedExistence {
    async fn wait_until_exists(&self, _key: &str) -> StorageResult<()> {
        scripted(&self.script, &self.calls).map_err(storage_error)
    }
}

/// Transfer backend whose calls never complete, like a stuck connection.
#[allow(dead_code)]
#[derive(Default)]
pub struct StalledBackend {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TransferBackend for StalledBackend {
    async fn put(&self, _local: &Path, _key: &str) -> StorageResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn get(&self, _key: &str, _local: &Path) -> StorageResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn backend_name(&self) -> &'static str {
        "stalled"
    }
}

/// Wraps a real backend and truncates every downloaded file to `keep` bytes,
/// simulating a transfer that silently loses data.
#[allow(dead_code)]
pub struct TruncatingBackend<B> {
    pub inner: B,
    pub keep: u64,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl<B> TruncatingBackend<B> {
    pub fn new(inner: B, keep: u64) -> Arc<Self> {
        Arc::new(Self {
            inner,
            keep,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl<B: TransferBackend> TransferBackend for TruncatingBackend<B> {
    async fn put(&self, local: &Path, key: &str) -> StorageResult<u64> {
        self.inner.put(local, key).await
    }

    async fn get(&self, key: &str, local: &Path) -> StorageResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let written = self.inner.get(key, local).await?;
        let file = std::fs::OpenOptions::new().write(true).open(local)?;
        file.set_len(self.keep.min(written))?;
        Ok(written)
    }

    fn backend_name(&self) -> &'static str {
        "truncating"
    }
}
