//! # Load Subcommand
//!
//! Looks up the first entry matching any of the given keys (in priority
//! order) and, when `--output` is given, streams its archive to that file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use artcache_client::{CacheClient, CancellationToken};

/// Arguments for the `artcache load` subcommand.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Cache key to look up. Repeat in priority order; later keys act as
    /// restore prefixes.
    #[arg(long = "key", value_name = "KEY", required = true)]
    pub keys: Vec<String>,

    /// Write the archive to this file. Without it only the entry is printed.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute the load subcommand. Returns 1 on a cache miss.
pub async fn run_load(
    args: &LoadArgs,
    client: &CacheClient,
    cancel: &CancellationToken,
) -> Result<u8> {
    let keys: Vec<&str> = args.keys.iter().map(String::as_str).collect();
    let Some(entry) = client.load(&keys, cancel).await.context("cache lookup failed")? else {
        println!("MISS: {}", args.keys.join(","));
        return Ok(1);
    };

    println!("HIT: key={} scope={}", entry.key, entry.scope);

    let Some(output) = &args.output else {
        println!("{}", entry.archive_url);
        return Ok(0);
    };

    let mut file = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("failed to create {}", output.display()))?;
    let written = client
        .download(&entry, &mut file, cancel)
        .await
        .context("archive download failed")?;

    println!("OK: wrote {written} bytes to {}", output.display());
    Ok(0)
}
