//! # artcache CLI entry point
//!
//! Parses command-line arguments, builds a client from the environment, and
//! dispatches to subcommand handlers. Ctrl-C cancels the running operation.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use artcache_cli::client_from_env;
use artcache_cli::load::{run_load, LoadArgs};
use artcache_cli::save::{run_save, SaveArgs};
use artcache_cli::scopes::{run_scopes, ScopesArgs};
use artcache_client::CancellationToken;

/// Artifact cache client.
///
/// Restores and saves cache entries against the service named by
/// `ACTIONS_CACHE_URL`, authenticated with `ACTIONS_RUNTIME_TOKEN`.
#[derive(Parser, Debug)]
#[command(name = "artcache", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the scopes granted by the runtime token.
    Scopes(ScopesArgs),

    /// Look up a cache entry and optionally download its archive.
    Load(LoadArgs),

    /// Upload a file as a new cache entry.
    Save(SaveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "artcache CLI starting");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<u8> {
    let client = client_from_env()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match command {
        Commands::Scopes(args) => run_scopes(&args, &client),
        Commands::Load(args) => run_load(&args, &client, &cancel).await,
        Commands::Save(args) => run_save(&args, &client, &cancel).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_accepts_repeated_keys() {
        let cli = Cli::try_parse_from([
            "artcache", "load", "--key", "linux-abc", "--key", "linux-", "--output", "out.tar",
        ])
        .unwrap();
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.keys, vec!["linux-abc", "linux-"]);
                assert_eq!(args.output.unwrap().to_str(), Some("out.tar"));
            }
            other => panic!("expected load, got {other:?}"),
        }
    }

    #[test]
    fn load_requires_a_key() {
        assert!(Cli::try_parse_from(["artcache", "load"]).is_err());
    }

    #[test]
    fn save_takes_key_and_file() {
        let cli = Cli::try_parse_from(["artcache", "-vv", "save", "--key", "k", "deps.tar"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Save(args) => {
                assert_eq!(args.key, "k");
                assert_eq!(args.file.to_str(), Some("deps.tar"));
            }
            other => panic!("expected save, got {other:?}"),
        }
    }
}
