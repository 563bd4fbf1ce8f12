//! Command-line client for verified object-storage transfers.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vouch_core::{AppConfig, ParsedTag};
use vouch_storage::{IntegrityChecker, ObjectStore, TransferController};

/// Exit status after Ctrl-C (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "vouchctl")]
#[command(about = "Upload and download files with ETag verification")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(long, env = "VOUCH_CONFIG", default_value = "vouch.toml", global = true)]
    config: PathBuf,

    #[command(flatten)]
    retry: RetryArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct RetryArgs {
    /// Total transfer attempts (overrides config)
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Seconds to wait between attempts (overrides config)
    #[arg(long, global = true)]
    wait_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file and verify the stored object
    Upload {
        /// Local file to upload
        file: PathBuf,
        /// Destination object key
        key: String,
    },
    /// Download an object and verify the local copy
    Download {
        /// Object key to download
        key: String,
        /// Local destination file
        file: PathBuf,
    },
    /// Compare a local file against a stored object without transferring
    Verify {
        /// Local file to check
        file: PathBuf,
        /// Object key to compare against
        key: String,
    },
    /// Show an object's ETag and the part layout derived from it
    Stat {
        /// Object key
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli {
        config,
        retry,
        command,
    } = Cli::parse();

    let config = load_config(&config, &retry)?;
    let store = vouch_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage backend")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling transfer");
            interrupt.cancel();
        }
    });

    let run = async {
        match command {
            Commands::Upload { file, key } => {
                handle_upload(store, &config, &file, &key, &cancel).await
            }
            Commands::Download { key, file } => {
                handle_download(store, &config, &key, &file, &cancel).await
            }
            Commands::Verify { file, key } => handle_verify(store, &file, &key).await,
            Commands::Stat { key } => handle_stat(store, &key).await,
        }
    };

    let result = tokio::select! {
        result = run => result,
        _ = cancel.cancelled() => Err(anyhow::anyhow!("interrupted")),
    };

    if cancel.is_cancelled() {
        // Blocking file I/O may still be running; exit without waiting for it.
        if let Err(err) = &result {
            eprintln!("Error: {err:?}");
        }
        std::process::exit(EXIT_INTERRUPTED);
    }
    result
}

/// Load configuration from the TOML file (if present) and `VOUCH_` environment
/// variables, then apply command-line overrides.
fn load_config(path: &Path, overrides: &RetryArgs) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if path.exists() {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("VOUCH_").split("__"));

    let mut config: AppConfig = figment
        .extract()
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    if let Some(max_attempts) = overrides.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(wait_secs) = overrides.wait_secs {
        config.retry.wait_secs = wait_secs;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

fn controller(
    store: std::sync::Arc<dyn ObjectStore>,
    config: &AppConfig,
) -> Result<TransferController> {
    TransferController::from_store(store, &config.retry).context("invalid retry configuration")
}

async fn handle_upload(
    store: std::sync::Arc<dyn ObjectStore>,
    config: &AppConfig,
    file: &Path,
    key: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    controller(store, config)?
        .upload_with_cancel(file, key, cancel)
        .await
        .with_context(|| format!("upload of {} to {key} failed", file.display()))?;
    println!("uploaded {} -> {key} (verified)", file.display());
    Ok(())
}

async fn handle_download(
    store: std::sync::Arc<dyn ObjectStore>,
    config: &AppConfig,
    key: &str,
    file: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let bytes = controller(store, config)?
        .download_with_cancel(key, file, cancel)
        .await
        .with_context(|| format!("download of {key} to {} failed", file.display()))?;
    println!("downloaded {key} -> {} ({bytes} bytes, verified)", file.display());
    Ok(())
}

async fn handle_verify(
    store: std::sync::Arc<dyn ObjectStore>,
    file: &Path,
    key: &str,
) -> Result<()> {
    let meta = store
        .head(key)
        .await
        .with_context(|| format!("failed to look up {key}"))?;
    let verification = IntegrityChecker::default()
        .check(file, &meta)
        .await
        .with_context(|| format!("failed to check {} against {key}", file.display()))?;

    if !verification.matches() {
        bail!(
            "{} does not match {key}: store has {}, local file hashes to {}",
            file.display(),
            verification.expected,
            verification.actual
        );
    }
    println!("{} matches {key}", file.display());
    Ok(())
}

async fn handle_stat(store: std::sync::Arc<dyn ObjectStore>, key: &str) -> Result<()> {
    let meta = store
        .head(key)
        .await
        .with_context(|| format!("failed to look up {key}"))?;
    print!("{}", format_stat(key, &meta)?);
    Ok(())
}

fn format_stat(key: &str, meta: &vouch_storage::ObjectMeta) -> Result<String> {
    let tag = ParsedTag::parse(&meta.e_tag).context("object has an unusable etag")?;

    let mut out = format!(
        "key:        {key}\netag:       {}\nhash:       {}\nparts:      {}\nsize:       {}\n",
        meta.e_tag, tag.hash, tag.part_count, meta.size
    );
    if tag.is_multipart() {
        let part_size = vouch_core::part_size(meta.size, tag.part_count)?;
        out.push_str(&format!("part_size:  {part_size}\n"));
    }
    if let Some(modified) = meta.last_modified {
        out.push_str(&format!("modified:   {modified}\n"));
    }
    Ok(out)
}
