//! Object storage backends and verified transfers for vouch.
//!
//! This crate provides:
//! - Capability traits for transfer, metadata lookup and existence wait
//! - An integrity checker comparing local files against stored ETags
//! - A retrying transfer controller that only succeeds on verified copies
//! - Backends: local filesystem and S3-compatible

pub mod backends;
pub mod controller;
pub mod error;
pub mod traits;
pub mod verify;

pub use backends::filesystem::FilesystemBackend;
pub use backends::s3::{S3Backend, StaticCredentials};
pub use controller::{TransferController, TransferControllerBuilder};
pub use error::{StorageError, StorageResult, TransferError, TransferResult};
pub use traits::{
    ExistenceWait, HashReconstructor, MetadataLookup, ObjectMeta, ObjectStore, TransferBackend,
};
pub use verify::{IntegrityChecker, Md5Reconstructor, Verification};

use std::sync::Arc;
use std::time::Duration;
use vouch_core::config::StorageConfig;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            session_token,
            force_path_style,
            existence_timeout_secs,
        } => {
            let credentials = StaticCredentials::from_parts(
                access_key_id.clone(),
                secret_access_key.clone(),
                session_token.clone(),
            )?;
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                credentials,
                *force_path_style,
            )
            .await?
            .with_existence_timeout(Duration::from_secs(*existence_timeout_secs));
            Ok(Arc::new(backend))
        }
    }
}
