//! Lookup of an existing cache entry (`GET cache`).
//!
//! The service matches the key list in order, most specific first, and returns
//! the first hit. An empty body, or a hit with an empty key, means no entry.

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::response::{check_response, null_as_default, read_capped};
use crate::version::cache_version;
use crate::{with_cancel, CacheClient, CancellationToken};

/// A cache hit. Returned fresh per lookup; never cached locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "cacheKey", default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scope: String,
    /// Pre-authorized absolute URL of the archive.
    #[serde(rename = "archiveLocation", default, deserialize_with = "null_as_default")]
    pub archive_url: String,
}

impl CacheClient {
    /// Find an entry matching any of `keys`.
    ///
    /// Calls `GET {base_url}_apis/artifactcache/cache?keys=k1,k2&version=v`.
    /// Returns `Ok(None)` when nothing matches.
    pub async fn load(
        &self,
        keys: &[&str],
        cancel: &CancellationToken,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let Some(primary) = keys.first() else {
            return Err(CacheError::NoKeys);
        };
        let endpoint = "GET cache";
        let mut url = self.session.url("cache")?;
        url.query_pairs_mut()
            .append_pair("keys", &keys.join(","))
            .append_pair("version", &cache_version(primary));
        tracing::debug!(url = %url, "load cache");

        let body = with_cancel(cancel, async {
            let resp = self
                .session
                .authorize(self.http.get(url))
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

        parse_entry(endpoint, &body)
    }
}

fn parse_entry(endpoint: &str, body: &[u8]) -> Result<Option<CacheEntry>, CacheError> {
    if body.is_empty() {
        return Ok(None);
    }
    let entry: CacheEntry =
        serde_json::from_slice(body).map_err(|e| CacheError::InvalidResponse {
            endpoint: endpoint.to_owned(),
            body: format!("{e}: {}", String::from_utf8_lossy(body)),
        })?;
    if entry.key.is_empty() {
        return Ok(None);
    }
    Ok(Some(entry))
}
