//! # Scopes Subcommand
//!
//! Prints the scopes decoded from the runtime token, one per line.

use anyhow::Result;
use clap::Args;

use artcache_client::{CacheClient, Permission};

/// Arguments for the `artcache scopes` subcommand.
#[derive(Args, Debug)]
pub struct ScopesArgs {
    /// Only list scopes that grant write access.
    #[arg(long)]
    pub writable: bool,
}

/// Execute the scopes subcommand.
pub fn run_scopes(args: &ScopesArgs, client: &CacheClient) -> Result<u8> {
    let lines = scope_lines(args, client);
    if lines.is_empty() {
        println!("no scopes granted");
        return Ok(1);
    }
    for line in lines {
        println!("{line}");
    }
    Ok(0)
}

fn scope_lines(args: &ScopesArgs, client: &CacheClient) -> Vec<String> {
    client
        .scopes()
        .iter()
        .filter(|s| !args.writable || s.permission.contains(Permission::WRITE))
        .map(ToString::to_string)
        .collect()
}
