//! Configuration types shared across crates.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of transfer attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait between attempts, in seconds.
pub const DEFAULT_WAIT_SECS: u64 = 3;

/// Default wait between attempts.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(DEFAULT_WAIT_SECS);

/// Default time to wait for an uploaded object to become visible (20 polls of 5s).
pub const DEFAULT_EXISTENCE_TIMEOUT_SECS: u64 = 100;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Retry policy for transfers.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Object store to transfer to and from.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Validate configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.retry.validate()?;
        self.storage.validate()
    }
}

/// Retry policy configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of transfer attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts in seconds.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_wait_secs() -> u64 {
    DEFAULT_WAIT_SECS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            wait_secs: default_wait_secs(),
        }
    }
}

impl RetryConfig {
    /// Get the inter-attempt wait as a Duration.
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    /// Validate retry configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        Ok(())
    }

    /// Convert to a retry budget.
    pub fn budget(&self) -> Result<RetryBudget> {
        RetryBudget::new(self.max_attempts, self.wait())
    }
}

/// Immutable attempt limit and fixed wait used by a transfer controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    wait: Duration,
}

impl RetryBudget {
    /// Create a budget. At least one attempt is required.
    pub fn new(max_attempts: u32, wait: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidRetryBudget(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_attempts, wait })
    }

    /// Total number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    pub fn wait(&self) -> Duration {
        self.wait
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait: DEFAULT_WAIT,
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// A local directory used as an object store.
    Filesystem {
        /// Root directory for stored objects.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient AWS credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the ambient AWS credential chain if not set.
        secret_access_key: Option<String>,
        /// Session token for temporary credentials. Requires the key pair.
        #[serde(default)]
        session_token: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
        /// Maximum time to wait for an uploaded object to become visible.
        #[serde(default = "default_existence_timeout_secs")]
        existence_timeout_secs: u64,
    },
}

fn default_existence_timeout_secs() -> u64 {
    DEFAULT_EXISTENCE_TIMEOUT_SECS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/objects"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                session_token,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 config requires a bucket".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) => Ok(()),
                    (None, None) if session_token.is_some() => Err(
                        "s3 session_token requires access_key_id and secret_access_key".to_string(),
                    ),
                    (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}
