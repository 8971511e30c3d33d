//! # Save Subcommand
//!
//! Uploads a file under a key: reserve, chunked upload, commit. Chunk size
//! and worker count come from `ARTCACHE_UPLOAD_CHUNK_SIZE` and
//! `ARTCACHE_UPLOAD_CONCURRENCY`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use artcache_client::{CacheClient, CancellationToken, UploadConfig};

/// Arguments for the `artcache save` subcommand.
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Key to store the entry under.
    #[arg(long, value_name = "KEY")]
    pub key: String,

    /// File to upload.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Execute the save subcommand.
pub async fn run_save(
    args: &SaveArgs,
    client: &CacheClient,
    cancel: &CancellationToken,
) -> Result<u8> {
    let file = std::fs::File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let size = file
        .metadata()
        .with_context(|| format!("failed to stat {}", args.file.display()))?
        .len();

    let upload = UploadConfig::from_env().context("invalid upload configuration")?;
    let client = client.clone().with_upload_config(upload);

    client
        .save(&args.key, Arc::new(file), size, cancel)
        .await
        .with_context(|| format!("failed to save cache entry {}", args.key))?;

    println!("OK: saved key={} size={size}", args.key);
    Ok(0)
}
