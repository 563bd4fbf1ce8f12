//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ExistenceWait, MetadataLookup, ObjectMeta, TransferBackend};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::client::Waiters;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_http_client::Builder as SmithyHttpClientBuilder;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use vouch_core::MEGABYTE;
use vouch_core::config::DEFAULT_EXISTENCE_TIMEOUT_SECS;

/// Default multipart part size in mebibytes. S3 requires all parts except the
/// last to be at least 5 MiB.
const DEFAULT_PART_MIB: u64 = 5;

/// Maximum number of parts S3 accepts in one multipart upload.
const MAX_UPLOAD_PARTS: u64 = 10_000;

/// Choose the multipart part size for an upload of `size` bytes, or `None`
/// when the object should be sent with a single `PutObject`.
///
/// Parts are whole mebibytes. Multipart is only used when the part count is at
/// least the part size in MiB; in that range the part size recovered from the
/// resulting ETag (`ceil(size / parts MiB)` MiB) is exactly the one used here.
fn upload_part_size(size: u64) -> Option<u64> {
    let part_mib = DEFAULT_PART_MIB.max(size.div_ceil(MAX_UPLOAD_PARTS * MEGABYTE));
    let part_size = part_mib * MEGABYTE;
    let parts = size.div_ceil(part_size);
    (parts >= part_mib).then_some(part_size)
}

fn map_s3_operation_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::S3(Box::new(err))
}

fn map_byte_stream_error(err: aws_sdk_s3::primitives::ByteStreamError) -> StorageError {
    StorageError::S3(Box::new(err))
}

/// Explicitly configured S3 credentials.
#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Session token for temporary (STS) credentials.
    pub session_token: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl StaticCredentials {
    /// Build credentials from optional config fields.
    ///
    /// Returns `Ok(None)` when nothing is set, so the ambient AWS credential
    /// chain is used. The key pair must be given together, and a session token
    /// requires the key pair.
    pub fn from_parts(
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        session_token: Option<String>,
    ) -> StorageResult<Option<Self>> {
        match (access_key_id, secret_access_key, session_token) {
            (Some(access_key_id), Some(secret_access_key), session_token) => Ok(Some(Self {
                access_key_id,
                secret_access_key,
                session_token,
            })),
            (None, None, None) => Ok(None),
            (None, None, Some(_)) => Err(StorageError::Config(
                "s3 session_token requires access_key_id and secret_access_key".to_string(),
            )),
            _ => Err(StorageError::Config(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            )),
        }
    }

    fn into_sdk(self) -> aws_sdk_s3::config::Credentials {
        aws_sdk_s3::config::Credentials::new(
            self.access_key_id,
            self.secret_access_key,
            self.session_token,
            None, // expiration
            "vouch-config",
        )
    }
}

/// S3-compatible object store using AWS SDK.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Normalized endpoint, kept for diagnostics.
    endpoint: String,
    region: String,
    existence_timeout: Duration,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("existence_timeout", &self.existence_timeout)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// # Arguments
    /// * `credentials` - Explicit credentials, or `None` for the ambient AWS chain.
    /// * `force_path_style` - Use path-style URLs (`endpoint/bucket/key`) instead of
    ///   virtual-hosted style (`bucket.endpoint/key`). Required for MinIO and some
    ///   S3-compatible services.
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        prefix: Option<String>,
        credentials: Option<StaticCredentials>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        let resolved_region = region.unwrap_or_else(|| "us-east-1".to_string());
        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(resolved_region.clone()));

        match credentials {
            Some(credentials) => {
                s3_config_builder = s3_config_builder.credentials_provider(credentials.into_sdk());
            }
            None => {
                let chain = DefaultCredentialsChain::builder()
                    .region(aws_config::Region::new(resolved_region.clone()))
                    .build()
                    .await;
                s3_config_builder = s3_config_builder.credentials_provider(chain);
            }
        }

        let normalized_endpoint = endpoint.as_ref().map(|endpoint_url| {
            // Bare host:port endpoints (e.g., "minio:9000") default to http://
            let endpoint_lower = endpoint_url.to_lowercase();
            if endpoint_lower.starts_with("http://") || endpoint_lower.starts_with("https://") {
                endpoint_url.clone()
            } else {
                format!("http://{}", endpoint_url)
            }
        });

        if let Some(endpoint_url) = &normalized_endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);

            // Plain HTTP endpoints don't need native trust roots.
            if endpoint_url.to_ascii_lowercase().starts_with("http://") {
                s3_config_builder =
                    s3_config_builder.http_client(SmithyHttpClientBuilder::new().build_http());
            }
        }

        if force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let stored_endpoint = match &normalized_endpoint {
            Some(url) => url.clone(),
            None => format!("s3.{}.amazonaws.com", resolved_region),
        };

        // Strip trailing slashes to avoid double-slash keys like "prefix//key"
        let normalized_prefix = prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            prefix: normalized_prefix,
            endpoint: stored_endpoint,
            region: resolved_region,
            existence_timeout: Duration::from_secs(DEFAULT_EXISTENCE_TIMEOUT_SECS),
        })
    }

    /// Set the maximum time [`ExistenceWait::wait_until_exists`] polls for.
    pub fn with_existence_timeout(mut self, timeout: Duration) -> Self {
        self.existence_timeout = timeout;
        self
    }

    /// Get the full object key for a key (applies prefix if configured).
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Convert an AWS SDK error to StorageError, mapping 404 to NotFound.
    fn map_sdk_error<E>(err: aws_sdk_s3::error::SdkError<E>, key: &str) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err
            && service_err.raw().status().as_u16() == 404
        {
            return StorageError::NotFound(key.to_string());
        }
        map_s3_operation_error(err)
    }

    async fn put_single(&self, local: &Path, full_key: &str, size: u64) -> StorageResult<()> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(map_byte_stream_error)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(full_key)
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(map_s3_operation_error)?;
        Ok(())
    }

    async fn put_multipart(
        &self,
        local: &Path,
        full_key: &str,
        size: u64,
        part_size: u64,
    ) -> StorageResult<()> {
        let create_output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(full_key)
            .send()
            .await
            .map_err(map_s3_operation_error)?;

        let upload_id = create_output
            .upload_id()
            .ok_or_else(|| StorageError::Config("S3 did not return upload_id".to_string()))?
            .to_string();

        let result = match self
            .upload_parts(local, full_key, &upload_id, size, part_size)
            .await
        {
            Ok(parts) => self
                .client
                .complete_multipart_upload()
                .bucket(&self.bucket)
                .key(full_key)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .map(|_| ())
                .map_err(map_s3_operation_error),
            Err(e) => Err(e),
        };

        if result.is_err()
            && let Err(abort_err) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(full_key)
                .upload_id(&upload_id)
                .send()
                .await
        {
            tracing::warn!(
                key = %full_key,
                upload_id = %upload_id,
                error = %abort_err,
                "Failed to abort multipart upload"
            );
        }

        result
    }

    async fn upload_parts(
        &self,
        local: &Path,
        full_key: &str,
        upload_id: &str,
        size: u64,
        part_size: u64,
    ) -> StorageResult<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        let mut offset = 0u64;
        let mut part_number = 1i32;

        while offset < size {
            let length = part_size.min(size - offset);
            let body = ByteStream::read_from()
                .path(local)
                .offset(offset)
                .length(Length::Exact(length))
                .build()
                .await
                .map_err(map_byte_stream_error)?;

            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(full_key)
                .upload_id(upload_id)
                .part_number(part_number)
                .content_length(length as i64)
                .body(body)
                .send()
                .await
                .map_err(map_s3_operation_error)?;

            tracing::debug!(part_number, length, "Uploaded part");
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(output.e_tag().map(|s| s.to_string()))
                    .build(),
            );

            offset += length;
            part_number += 1;
        }

        Ok(parts)
    }
}

#[async_trait]
impl TransferBackend for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn put(&self, local: &Path, key: &str) -> StorageResult<u64> {
        let full_key = self.full_key(key);
        let size = tokio::fs::metadata(local).await?.len();

        match upload_part_size(size) {
            Some(part_size) => {
                tracing::debug!(size, part_size, "Using multipart upload");
                self.put_multipart(local, &full_key, size, part_size)
                    .await?
            }
            None => self.put_single(local, &full_key, size).await?,
        }

        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, key: &str, local: &Path) -> StorageResult<u64> {
        let full_key = self.full_key(key);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        let mut file = tokio::fs::File::create(local).await?;
        let mut reader = output.body.into_async_read();
        let copied = async {
            let n = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            Ok::<u64, std::io::Error>(n)
        }
        .await;

        match copied {
            Ok(n) => Ok(n),
            Err(e) => {
                drop(file);
                if let Err(remove_err) = tokio::fs::remove_file(local).await {
                    tracing::warn!(
                        path = %local.display(),
                        error = %remove_err,
                        "Failed to remove partial download"
                    );
                }
                Err(StorageError::Io(e))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[async_trait]
impl MetadataLookup for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let full_key = self.full_key(key);
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        let last_modified = output.last_modified().and_then(|dt| {
            time::OffsetDateTime::from_unix_timestamp(dt.secs())
                .inspect_err(|e| {
                    tracing::warn!(
                        key = %key,
                        timestamp = dt.secs(),
                        error = %e,
                        "Failed to convert S3 timestamp"
                    );
                })
                .ok()
        });

        Ok(ObjectMeta {
            // A missing ETag surfaces as an empty tag, which verification rejects.
            e_tag: output.e_tag().unwrap_or_default().to_string(),
            size: u64::try_from(output.content_length().unwrap_or(0)).unwrap_or(0),
            last_modified,
        })
    }
}

#[async_trait]
impl ExistenceWait for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn wait_until_exists(&self, key: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        self.client
            .wait_until_object_exists()
            .bucket(&self.bucket)
            .key(&full_key)
            .wait(self.existence_timeout)
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?;
        Ok(())
    }
}
