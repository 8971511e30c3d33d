//! # artcache-client -- Typed Rust client for the artifact cache service
//!
//! A key-addressed artifact cache reached over HTTP with bearer-token
//! authorization. Provides:
//! - **Lookup** of an existing entry by an ordered key list (`GET cache`)
//! - **Save**: reserve a transaction (`POST caches`), upload the content in
//!   parallel chunks (`PATCH caches/{id}`), then commit (`POST caches/{id}`)
//! - **Download** of an entry's archive to any async sink
//!
//! ## API Path Convention
//!
//! Every authenticated call goes to `{base_url}_apis/artifactcache/{resource}`
//! with `Authorization: Bearer <token>` and
//! `Accept: application/json;api-version=6.0-preview.1`. Archive downloads go
//! to the pre-authorized absolute URL returned by a lookup.
//!
//! ## Cancellation
//!
//! Every networked operation takes a [`CancellationToken`]. There are no
//! internal timeouts and no internal retries; both are caller policy.

pub mod config;
pub(crate) mod decrypt;
pub mod download;
pub mod error;
pub mod lookup;
pub mod response;
pub mod scope;
pub mod session;
pub mod source;
pub(crate) mod token;
pub mod transaction;
pub mod upload;
pub mod version;

pub use config::CacheConfig;
pub use error::{CacheError, ConfigError};
pub use lookup::CacheEntry;
pub use response::RemoteApiError;
pub use scope::{Permission, Scope};
pub use session::Session;
pub use source::ReadAt;
pub use tokio_util::sync::CancellationToken;
pub use upload::UploadConfig;
pub use version::cache_version;

use std::future::Future;
use std::sync::Arc;

/// Top-level artifact cache client.
///
/// Cheap to clone; clones share the HTTP connection pool and the session.
#[derive(Debug, Clone)]
pub struct CacheClient {
    http: reqwest::Client,
    session: Arc<Session>,
    upload: UploadConfig,
}

impl CacheClient {
    /// Create a client from configuration.
    ///
    /// Parses the token's access-control claim; fails with
    /// [`CacheError::Config`] if it is absent or malformed.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let session = Session::new(config.token.as_str(), config.base_url)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CacheError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            session: Arc::new(session),
            upload: UploadConfig::default(),
        })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Override chunk size and worker count for [`save`](Self::save).
    #[must_use]
    pub fn with_upload_config(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }

    /// The authenticated session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Scopes granted by the token.
    pub fn scopes(&self) -> &[Scope] {
        self.session.scopes()
    }

    /// Upload tunables in effect.
    pub fn upload_config(&self) -> &UploadConfig {
        &self.upload
    }

    /// Store `size` bytes of `source` under `key`.
    ///
    /// Reserve, upload every chunk, then commit, strictly in that order. Any
    /// failure skips the remaining stages and is returned as-is; a reservation
    /// that was opened but not committed is left for the service to collect.
    pub async fn save<S>(
        &self,
        key: &str,
        source: Arc<S>,
        size: u64,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError>
    where
        S: ReadAt + ?Sized + 'static,
    {
        tracing::info!(key, size, "saving cache entry");
        let id = self.reserve(key, cancel).await?;
        let chunks = self.upload(id, source, size, cancel).await?;
        self.commit(id, size, cancel).await?;
        tracing::info!(key, cache_id = id, size, chunks, "cache entry saved");
        Ok(())
    }
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CacheError::Cancelled),
        res = fut => res,
    }
}
