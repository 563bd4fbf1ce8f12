// End-to-end verified transfers against a filesystem store.

mod common;

use async_trait::async_trait;
use common::{TruncatingBackend, multipart_etag, seeded_bytes, write_file};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;
use vouch_core::{MEGABYTE, RetryConfig, StorageConfig};
use vouch_storage::error::StorageResult;
use vouch_storage::traits::{MetadataLookup, ObjectMeta, TransferBackend};
use vouch_storage::{FilesystemBackend, TransferController, TransferError, from_config};

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        wait_secs: 0,
    }
}

async fn store(temp: &TempDir) -> Arc<dyn vouch_storage::ObjectStore> {
    let config = StorageConfig::Filesystem {
        path: temp.path().join("store"),
    };
    from_config(&config).await.unwrap()
}

/// Reports a fixed ETag regardless of what is stored.
struct FixedTag {
    e_tag: String,
    size: u64,
}

#[async_trait]
impl MetadataLookup for FixedTag {
    async fn head(&self, _key: &str) -> StorageResult<ObjectMeta> {
        Ok(ObjectMeta {
            e_tag: self.e_tag.clone(),
            size: self.size,
            last_modified: None,
        })
    }
}

#[tokio::test]
async fn test_upload_then_download_verifies() {
    let temp = TempDir::new().unwrap();
    let data = seeded_bytes(7, 64 * 1024 + 3);
    let source = write_file(temp.path(), "source.bin", &data);

    let controller = TransferController::from_store(store(&temp).await, &fast_retry()).unwrap();
    assert_eq!(controller.budget().max_attempts(), 3);
    assert_eq!(controller.budget().wait(), Duration::ZERO);
    controller.upload(&source, "backups/source.bin").await.unwrap();
    assert_eq!(
        std::fs::read(temp.path().join("store/backups/source.bin")).unwrap(),
        data
    );

    let target = temp.path().join("restored.bin");
    let bytes = controller
        .download("backups/source.bin", &target)
        .await
        .unwrap();
    assert_eq!(bytes, data.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), data);
}

#[tokio::test]
async fn test_truncated_download_is_rejected() {
    let temp = TempDir::new().unwrap();
    let data = seeded_bytes(11, 4096);
    let source = write_file(temp.path(), "source.bin", &data);

    let store_root = temp.path().join("store");
    let plain = FilesystemBackend::new(&store_root).await.unwrap();
    plain.put(&source, "obj").await.unwrap();

    let inner = FilesystemBackend::new(&store_root).await.unwrap();
    let truncating = TruncatingBackend::new(inner, 100);
    let controller = TransferController::builder(truncating.clone(), Arc::new(plain))
        .wait(Duration::ZERO)
        .build()
        .unwrap();

    let err = controller
        .download("obj", &temp.path().join("out.bin"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::ETagMismatch { .. }), "{err:?}");
    assert_eq!(truncating.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_multipart_tag_verifies_local_file() {
    let temp = TempDir::new().unwrap();
    let data = seeded_bytes(3, (3 * MEGABYTE + 100) as usize);
    let source = write_file(temp.path(), "source.bin", &data);

    let lookup = Arc::new(FixedTag {
        e_tag: multipart_etag(&data, MEGABYTE as usize),
        size: data.len() as u64,
    });
    let backend = Arc::new(FilesystemBackend::new(temp.path().join("store")).await.unwrap());
    let controller = TransferController::builder(backend, lookup)
        .max_attempts(1)
        .build()
        .unwrap();

    controller.upload(&source, "big.bin").await.unwrap();
}

#[tokio::test]
async fn test_multipart_tag_detects_changed_byte() {
    let temp = TempDir::new().unwrap();
    let data = seeded_bytes(3, (2 * MEGABYTE + 1) as usize);
    let mut changed = data.clone();
    changed[MEGABYTE as usize + 5] ^= 0xff;
    let source = write_file(temp.path(), "source.bin", &changed);

    let lookup = Arc::new(FixedTag {
        e_tag: multipart_etag(&data, MEGABYTE as usize),
        size: data.len() as u64,
    });
    let backend = Arc::new(FilesystemBackend::new(temp.path().join("store")).await.unwrap());
    let controller = TransferController::builder(backend, lookup)
        .max_attempts(1)
        .build()
        .unwrap();

    let err = controller.upload(&source, "big.bin").await.unwrap_err();
    assert!(matches!(err, TransferError::ETagMismatch { .. }), "{err:?}");
}

#[tokio::test]
async fn test_download_of_missing_key_fails_after_budget() {
    let temp = TempDir::new().unwrap();
    let controller = TransferController::from_store(store(&temp).await, &fast_retry()).unwrap();

    let err = controller
        .download("missing", &temp.path().join("out.bin"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            TransferError::Backend(vouch_storage::StorageError::NotFound(_))
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_upload_of_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let controller = TransferController::from_store(store(&temp).await, &fast_retry()).unwrap();

    let err = controller
        .upload(&temp.path().join("nope.bin"), "obj")
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Backend(_)), "{err:?}");
}

#[tokio::test]
async fn test_download_into_missing_directory_is_local_io_error() {
    let temp = TempDir::new().unwrap();
    let source = write_file(temp.path(), "source.bin", b"payload");
    let controller = TransferController::from_store(store(&temp).await, &fast_retry()).unwrap();
    controller.upload(&source, "obj").await.unwrap();

    let err = controller
        .download("obj", &temp.path().join("missing-dir").join("out.bin"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            TransferError::Backend(vouch_storage::StorageError::Io(_))
        ),
        "{err:?}"
    );
}
