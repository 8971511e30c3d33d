//! Reserve and commit of a cache write transaction.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | POST   | `caches` | `{"key", "version"}` -> `{"cacheId"}` |
//! | POST   | `caches/{id}` | `{"size"}` |
//!
//! A reservation is committed exactly once, after every chunk has been
//! uploaded. Commit is the only point where the service learns the total size.

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::response::{check_response, read_capped};
use crate::version::cache_version;
use crate::{with_cancel, CacheClient, CancellationToken};

/// Server-side transaction handle. Never zero.
pub type CacheId = i64;

#[derive(Debug, Serialize)]
struct ReserveCacheRequest<'a> {
    key: &'a str,
    version: String,
}

#[derive(Debug, Deserialize)]
struct ReserveCacheResponse {
    #[serde(rename = "cacheId", alias = "cacheID", default)]
    cache_id: CacheId,
}

#[derive(Debug, Serialize)]
struct CommitCacheRequest {
    size: u64,
}

impl CacheClient {
    /// Open a write transaction for `key`.
    ///
    /// Calls `POST {base_url}_apis/artifactcache/caches`. A 2xx response
    /// without a non-zero id is rejected as [`CacheError::InvalidResponse`].
    pub(crate) async fn reserve(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<CacheId, CacheError> {
        let endpoint = "POST caches";
        let url = self.session.url("caches")?;
        let req = ReserveCacheRequest {
            key,
            version: cache_version(key),
        };
        tracing::debug!(url = %url, key, version = %req.version, "reserve cache");

        let body = with_cancel(cancel, async {
            let resp = self
                .session
                .authorize(self.http.post(url))
                .json(&req)
                .send()
                .await
                .map_err(|e| CacheError::Http {
                    endpoint: endpoint.into(),
                    source: e,
                })?;
            let resp = check_response(endpoint, resp).await?;
            read_capped(endpoint, resp).await
        })
        .await?;

        let id = parse_reservation(endpoint, &body)?;
        tracing::debug!(cache_id = id, "reserve cache response");
        Ok(id)
    }

    /// Finalize transaction `id` with the authoritative total `size`.
    ///
    /// Calls `POST {base_url}_apis/artifactcache/caches/{id}`.
    pub(crate) async fn commit(
        &self,
        id: CacheId,
        size: u64,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError> {
        let endpoint = format!("POST caches/{id}");
        let url = self.session.url(&format!("caches/{id}"))?;
        tracing::debug!(url = %url, size, "commit cache");

        let body = with_cancel(cancel, async {
            let resp = self
                .session
                .authorize(self.http.post(url))
                .json(&CommitCacheRequest { size })
                .send()
                .await
                .map_err(|e| CacheError::Http {
                    endpoint: endpoint.clone(),
                    source: e,
                })?;
            let resp = check_response(&endpoint, resp).await?;
            read_capped(&endpoint, resp).await
        })
        .await?;

        if !body.is_empty() {
            tracing::debug!(body = %String::from_utf8_lossy(&body), "commit response");
        }
        Ok(())
    }
}

fn parse_reservation(endpoint: &str, body: &[u8]) -> Result<CacheId, CacheError> {
    let invalid = || CacheError::InvalidResponse {
        endpoint: endpoint.to_owned(),
        body: String::from_utf8_lossy(body).into_owned(),
    };
    let resp: ReserveCacheResponse = serde_json::from_slice(body).map_err(|_| invalid())?;
    if resp.cache_id == 0 {
        return Err(invalid());
    }
    Ok(resp.cache_id)
}
