//! Archive download for a [`CacheEntry`].
//!
//! The archive URL is pre-authorized by the service, so no bearer header is
//! attached. The body is streamed chunk by chunk into the sink; the payload is
//! never buffered whole.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::CacheError;
use crate::lookup::CacheEntry;
use crate::response::check_response;
use crate::{with_cancel, CacheClient, CancellationToken};

impl CacheClient {
    /// Stream the archive of `entry` into `sink`, returning the bytes written.
    ///
    /// Non-2xx responses go through the same translation as every other call.
    pub async fn download<W>(
        &self,
        entry: &CacheEntry,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<u64, CacheError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let endpoint = "GET archive";
        tracing::debug!(key = %entry.key, "download cache entry");

        with_cancel(cancel, async {
            let resp = self
                .http
                .get(&entry.archive_url)
                .send()
                .await
                .map_err(|e| CacheError::Http {
                    endpoint: endpoint.into(),
                    source: e,
                })?;
            let mut resp = check_response(endpoint, resp).await?;

            let mut written = 0u64;
            while let Some(chunk) = resp.chunk().await.map_err(|e| CacheError::Http {
                endpoint: endpoint.into(),
                source: e,
            })? {
                sink.write_all(&chunk).await.map_err(|e| CacheError::Io {
                    context: "writing download sink".into(),
                    source: e,
                })?;
                written += chunk.len() as u64;
            }
            sink.flush().await.map_err(|e| CacheError::Io {
                context: "flushing download sink".into(),
                source: e,
            })?;

            tracing::debug!(key = %entry.key, bytes = written, "download complete");
            Ok(written)
        })
        .await
    }
}
