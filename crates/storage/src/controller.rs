//! Verified transfer controller.
//!
//! Every attempt runs the full transfer followed by a fresh metadata lookup
//! and integrity check. A failed attempt is retried after a fixed wait until
//! the retry budget is exhausted; the final attempt's error is returned.
//! Cancellation abandons the in-flight attempt or the retry wait.

use crate::error::{TransferError, TransferResult};
use crate::traits::{
    ExistenceWait, HashReconstructor, MetadataLookup, ObjectStore, TransferBackend,
};
use crate::verify::IntegrityChecker;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use vouch_core::config::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WAIT};
use vouch_core::{RetryBudget, RetryConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Upload,
    Download,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Upload => "upload",
            Direction::Download => "download",
        }
    }
}

/// Drives upload-then-verify and download-then-verify with bounded retries.
///
/// Holds no per-call mutable state, so one controller can serve concurrent
/// transfers of different files.
pub struct TransferController {
    backend: Arc<dyn TransferBackend>,
    lookup: Arc<dyn MetadataLookup>,
    existence: Option<Arc<dyn ExistenceWait>>,
    checker: IntegrityChecker,
    budget: RetryBudget,
}

impl std::fmt::Debug for TransferController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferController")
            .field("backend", &self.backend.backend_name())
            .field("existence_wait", &self.existence.is_some())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TransferController`]. Unset fields take the defaults from
/// [`vouch_core::config`].
pub struct TransferControllerBuilder {
    backend: Arc<dyn TransferBackend>,
    lookup: Arc<dyn MetadataLookup>,
    existence: Option<Arc<dyn ExistenceWait>>,
    hasher: Option<Arc<dyn HashReconstructor>>,
    max_attempts: Option<u32>,
    wait: Option<Duration>,
}

impl TransferControllerBuilder {
    /// Total number of attempts (default 3).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Fixed delay between attempts (default 3s).
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Apply the attempt count and wait from a retry configuration.
    pub fn retry(self, retry: &RetryConfig) -> Self {
        self.max_attempts(retry.max_attempts).wait(retry.wait())
    }

    /// Hash reconstructor used during verification (default MD5).
    pub fn hasher(mut self, hasher: Arc<dyn HashReconstructor>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Visibility check run after an upload and before the metadata lookup.
    pub fn existence_wait(mut self, existence: Arc<dyn ExistenceWait>) -> Self {
        self.existence = Some(existence);
        self
    }

    /// Build the controller. Fails if the retry budget allows no attempts.
    pub fn build(self) -> vouch_core::Result<TransferController> {
        let budget = RetryBudget::new(
            self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            self.wait.unwrap_or(DEFAULT_WAIT),
        )?;
        let checker = match self.hasher {
            Some(hasher) => IntegrityChecker::new(hasher),
            None => IntegrityChecker::default(),
        };
        Ok(TransferController {
            backend: self.backend,
            lookup: self.lookup,
            existence: self.existence,
            checker,
            budget,
        })
    }
}

impl TransferController {
    /// Start building a controller from a transfer backend and metadata lookup.
    pub fn builder(
        backend: Arc<dyn TransferBackend>,
        lookup: Arc<dyn MetadataLookup>,
    ) -> TransferControllerBuilder {
        TransferControllerBuilder {
            backend,
            lookup,
            existence: None,
            hasher: None,
            max_attempts: None,
            wait: None,
        }
    }

    /// Create a controller that uses one store for transfer, lookup and
    /// existence wait.
    pub fn from_store(
        store: Arc<dyn ObjectStore>,
        retry: &RetryConfig,
    ) -> vouch_core::Result<Self> {
        let backend: Arc<dyn TransferBackend> = store.clone();
        let lookup: Arc<dyn MetadataLookup> = store.clone();
        let existence: Arc<dyn ExistenceWait> = store;
        Self::builder(backend, lookup)
            .existence_wait(existence)
            .retry(retry)
            .build()
    }

    /// The retry budget this controller was built with.
    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Upload `path` to `key` and verify the stored object matches it.
    pub async fn upload(&self, path: &Path, key: &str) -> TransferResult<()> {
        self.upload_with_cancel(path, key, &CancellationToken::new()).await
    }

    /// Like [`upload`](Self::upload), but returns [`TransferError::Cancelled`]
    /// as soon as `cancel` fires, abandoning any attempt in progress.
    pub async fn upload_with_cancel(
        &self,
        path: &Path,
        key: &str,
        cancel: &CancellationToken,
    ) -> TransferResult<()> {
        self.run(Direction::Upload, path, key, cancel)
            .await
            .map(|_| ())
    }

    /// Download `key` to `path` and verify the local copy matches the store.
    ///
    /// Returns the byte count reported by the backend.
    pub async fn download(&self, key: &str, path: &Path) -> TransferResult<u64> {
        self.download_with_cancel(key, path, &CancellationToken::new()).await
    }

    /// Like [`download`](Self::download), cancellable through `cancel`.
    pub async fn download_with_cancel(
        &self,
        key: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> TransferResult<u64> {
        self.run(Direction::Download, path, key, cancel).await
    }

    #[instrument(
        skip(self, direction, cancel),
        fields(direction = direction.as_str(), backend = self.backend.backend_name())
    )]
    async fn run(
        &self,
        direction: Direction,
        path: &Path,
        key: &str,
        cancel: &CancellationToken,
    ) -> TransferResult<u64> {
        let max_attempts = self.budget.max_attempts();
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!(attempt, "Transfer cancelled during attempt");
                    return Err(TransferError::Cancelled);
                }
                outcome = self.attempt(direction, path, key) => outcome,
            };

            match outcome {
                Ok(bytes) => {
                    tracing::info!(attempt, bytes, "Transfer verified");
                    return Ok(bytes);
                }
                Err(err) if attempt >= max_attempts => {
                    tracing::error!(attempt, error = %err, "Transfer failed, retry budget exhausted");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        wait_ms = self.budget.wait().as_millis() as u64,
                        error = %err,
                        "Transfer attempt failed, retrying"
                    );
                    self.pause(cancel).await?;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, direction: Direction, path: &Path, key: &str) -> TransferResult<u64> {
        let bytes = match direction {
            Direction::Upload => self.backend.put(path, key).await,
            Direction::Download => self.backend.get(key, path).await,
        }
        .map_err(TransferError::Backend)?;

        if direction == Direction::Upload
            && let Some(existence) = &self.existence
        {
            existence
                .wait_until_exists(key)
                .await
                .map_err(TransferError::ExistenceWait)?;
        }

        let meta = self
            .lookup
            .head(key)
            .await
            .map_err(TransferError::MetadataLookup)?;

        let verification = self.checker.check(path, &meta).await?;
        if !verification.matches() {
            return Err(TransferError::ETagMismatch {
                key: key.to_string(),
                expected: verification.expected,
                actual: verification.actual,
            });
        }

        Ok(bytes)
    }

    async fn pause(&self, cancel: &CancellationToken) -> TransferResult<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(TransferError::Cancelled),
            _ = tokio::time::sleep(self.budget.wait()) => Ok(()),
        }
    }
}
