//! # Chunked Upload Coordinator
//!
//! Streams `[0, size)` of a [`ReadAt`] source into a reserved transaction as
//! fixed-size, contiguous, non-overlapping ranges (`PATCH caches/{id}` with
//! `Content-Range: bytes start-end/*`), using a fixed pool of worker tasks.
//!
//! ## Work distribution
//!
//! A single cursor behind a mutex hands out ranges in strictly increasing
//! order. The lock covers only the cursor read-modify-write, never a read of
//! the source or a network call. Chunks may complete out of order.
//!
//! Chunk bodies are streamed from the source in [`STREAM_BLOCK`] steps, so
//! memory per worker is bounded by the block size, not the chunk size.
//!
//! ## Failure
//!
//! The first failing worker cancels a child of the caller's token. Siblings
//! stop claiming ranges; their in-flight chunk requests finish or fail on
//! their own. The first error is the result, and the caller must not commit.
//! Chunks are never retried here.

use std::io;
use std::ops::Range;
use std::sync::Arc;

use futures::TryStreamExt;
use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::config::env_tunable;
use crate::error::{CacheError, ConfigError};
use crate::response::{check_response, read_capped};
use crate::source::{range_stream, ReadAt, STREAM_BLOCK};
use crate::transaction::CacheId;
use crate::{with_cancel, CacheClient, CancellationToken};

/// Default bytes per chunk request.
pub const DEFAULT_CHUNK_SIZE: u64 = 32 * 1024 * 1024;

/// Default number of concurrent upload workers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Overrides [`DEFAULT_CHUNK_SIZE`].
pub const ENV_CHUNK_SIZE: &str = "ARTCACHE_UPLOAD_CHUNK_SIZE";

/// Overrides [`DEFAULT_CONCURRENCY`].
pub const ENV_CONCURRENCY: &str = "ARTCACHE_UPLOAD_CONCURRENCY";

/// Upload tunables. Only range boundaries change with these; the wire
/// protocol does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    chunk_size: u64,
    concurrency: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl UploadConfig {
    /// Both values are raised to at least 1.
    #[must_use]
    pub fn new(chunk_size: u64, concurrency: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Defaults, overridden by `ARTCACHE_UPLOAD_CHUNK_SIZE` and
    /// `ARTCACHE_UPLOAD_CONCURRENCY` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// [`from_env`](Self::from_env) with an injectable variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self::new(
            env_tunable(&lookup, ENV_CHUNK_SIZE)?.unwrap_or(defaults.chunk_size),
            env_tunable(&lookup, ENV_CONCURRENCY)?.unwrap_or(defaults.concurrency),
        ))
    }
}

/// Shared assignment cursor over `[0, size)`.
#[derive(Debug)]
struct RangeCursor {
    next: Mutex<u64>,
    size: u64,
    chunk_size: u64,
}

impl RangeCursor {
    fn new(size: u64, chunk_size: u64) -> Self {
        Self {
            next: Mutex::new(0),
            size,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Claim the next range, or `None` once the cursor has reached `size`.
    fn claim(&self) -> Option<Range<u64>> {
        let mut next = self.next.lock();
        let start = *next;
        if start >= self.size {
            return None;
        }
        let end = start.saturating_add(self.chunk_size).min(self.size);
        *next = end;
        Some(start..end)
    }
}

impl CacheClient {
    /// Upload `[0, size)` of `source` into transaction `id`.
    ///
    /// Returns the number of chunks uploaded. `size == 0` uploads nothing and
    /// succeeds.
    pub(crate) async fn upload<S>(
        &self,
        id: CacheId,
        source: Arc<S>,
        size: u64,
        cancel: &CancellationToken,
    ) -> Result<usize, CacheError>
    where
        S: ReadAt + ?Sized + 'static,
    {
        let cursor = Arc::new(RangeCursor::new(size, self.upload.chunk_size));
        let abort = cancel.child_token();

        let mut workers = JoinSet::new();
        for worker in 0..self.upload.concurrency {
            let client = self.clone();
            let source = Arc::clone(&source);
            let cursor = Arc::clone(&cursor);
            let abort = abort.clone();
            let cancel = cancel.clone();
            workers.spawn(async move {
                client
                    .upload_worker(worker, id, source, &cursor, &abort, &cancel)
                    .await
            });
        }

        let mut chunks = 0;
        let mut first_err = None;
        while let Some(joined) = workers.join_next().await {
            match joined.map_err(CacheError::from).and_then(|r| r) {
                Ok(n) => chunks += n,
                Err(e) => {
                    abort.cancel();
                    if first_err.is_none() {
                        tracing::warn!(
                            cache_id = id,
                            error = %e,
                            "chunk upload failed, stopping workers"
                        );
                        first_err = Some(e);
                    }
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(chunks),
        }
    }

    async fn upload_worker<S>(
        &self,
        worker: usize,
        id: CacheId,
        source: Arc<S>,
        cursor: &RangeCursor,
        abort: &CancellationToken,
        cancel: &CancellationToken,
    ) -> Result<usize, CacheError>
    where
        S: ReadAt + ?Sized + 'static,
    {
        let mut uploaded = 0;
        loop {
            if abort.is_cancelled() {
                if cancel.is_cancelled() {
                    return Err(CacheError::Cancelled);
                }
                tracing::debug!(worker, uploaded, "upload worker stopped by sibling failure");
                return Ok(uploaded);
            }
            let Some(range) = cursor.claim() else {
                return Ok(uploaded);
            };
            self.upload_chunk(id, &source, range, cancel).await?;
            uploaded += 1;
        }
    }

    async fn upload_chunk<S>(
        &self,
        id: CacheId,
        source: &Arc<S>,
        range: Range<u64>,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError>
    where
        S: ReadAt + ?Sized + 'static,
    {
        let endpoint = format!("PATCH caches/{id}");
        let url = self.session.url(&format!("caches/{id}"))?;
        let content_range = format!("bytes {}-{}/*", range.start, range.end - 1);
        tracing::debug!(url = %url, range = %content_range, "upload cache chunk");

        let range_context = format!("reading source range {}..{}", range.start, range.end);

        // The stream error reaching reqwest is opaque; keep a copy to report as Io.
        let read_failure: Arc<Mutex<Option<io::Error>>> = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&read_failure);
        let body = range_stream(Arc::clone(source), range.clone(), STREAM_BLOCK).inspect_err(
            move |e| {
                recorder
                    .lock()
                    .get_or_insert_with(|| io::Error::new(e.kind(), e.to_string()));
            },
        );
        let source_error = || {
            read_failure.lock().take().map(|e| CacheError::Io {
                context: range_context.clone(),
                source: e,
            })
        };

        with_cancel(cancel, async {
            let sent = self
                .session
                .authorize(self.http.patch(url))
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .header(reqwest::header::CONTENT_RANGE, content_range)
                .header(reqwest::header::CONTENT_LENGTH, range.end - range.start)
                .body(reqwest::Body::wrap_stream(body))
                .send()
                .await;
            if let Some(err) = source_error() {
                return Err(err);
            }
            let resp = sent.map_err(|e| CacheError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;
            let resp = check_response(&endpoint, resp).await?;
            let body = read_capped(&endpoint, resp).await?;
            if !body.is_empty() {
                tracing::debug!(body = %String::from_utf8_lossy(&body), "upload chunk response");
            }
            Ok(())
        })
        .await
    }
}
