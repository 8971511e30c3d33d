//! # artcache-cli
//!
//! Provides the `artcache` command-line interface over `artcache-client`.
//!
//! ## Subcommands
//!
//! - `artcache scopes`: Print the scopes granted by the runtime token.
//! - `artcache load`: Look up an entry by keys and restore its archive.
//! - `artcache save`: Upload a file under a key.
//!
//! The cache endpoint and token come from the environment, see
//! [`CacheConfig::from_env`](artcache_client::CacheConfig::from_env):
//!
//! ```bash
//! export ACTIONS_CACHE_URL=https://artifactcache.example.com/abc/
//! export ACTIONS_RUNTIME_TOKEN=eyJ...
//! artcache load --key linux-deps-abc --key linux-deps- --output deps.tar
//! artcache save --key linux-deps-abc deps.tar
//! ```

pub mod load;
pub mod save;
pub mod scopes;

use anyhow::{Context, Result};
use artcache_client::{CacheClient, CacheConfig};

/// Build a client from the environment, failing when no cache is configured.
pub fn client_from_env() -> Result<CacheClient> {
    let config = CacheConfig::from_env()
        .context("invalid cache configuration")?
        .context("no cache configured: set ACTIONS_CACHE_URL and ACTIONS_RUNTIME_TOKEN")?;
    CacheClient::new(config).context("failed to build cache client")
}
