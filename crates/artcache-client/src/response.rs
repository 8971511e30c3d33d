//! # Response Translator
//!
//! The single place where status-code policy lives. Every networked call in
//! this crate passes its response through [`check_response`].
//!
//! - `200..300` is success.
//! - Otherwise up to [`MAX_CONTROL_BODY`] bytes of the body are read and parsed
//!   as a structured service error. A non-empty `message` yields
//!   [`CacheError::Remote`]; anything else yields [`CacheError::Protocol`]
//!   carrying the raw status and the (truncated) body.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CacheError;

/// Cap on response bodies used for control decisions and diagnostics.
pub const MAX_CONTROL_BODY: usize = 32 * 1024;

/// Structured error object returned by the cache service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteApiError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub type_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub type_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_code: i64,
    /// HTTP status the error arrived with. Not part of the wire object.
    #[serde(skip)]
    pub status: u16,
}

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl std::fmt::Display for RemoteApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RemoteApiError {}

/// Returns the response unchanged on 2xx, otherwise the translated error.
pub(crate) async fn check_response(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, CacheError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = read_capped(endpoint, resp).await?;
    Err(translate_error(endpoint, status, &body))
}

/// Classify a non-2xx status and its (already capped) body.
pub(crate) fn translate_error(endpoint: &str, status: u16, body: &[u8]) -> CacheError {
    match serde_json::from_slice::<RemoteApiError>(body) {
        Ok(remote) if !remote.message.is_empty() => CacheError::Remote(RemoteApiError {
            status,
            ..remote
        }),
        _ => CacheError::Protocol {
            endpoint: endpoint.to_owned(),
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

/// Read at most [`MAX_CONTROL_BODY`] bytes of a response body.
pub(crate) async fn read_capped(
    endpoint: &str,
    mut resp: reqwest::Response,
) -> Result<Vec<u8>, CacheError> {
    let mut buf = Vec::new();
    while buf.len() < MAX_CONTROL_BODY {
        let chunk = resp.chunk().await.map_err(|e| CacheError::Http {
            endpoint: endpoint.to_owned(),
            source: e,
        })?;
        let Some(chunk) = chunk else { break };
        let take = chunk.len().min(MAX_CONTROL_BODY - buf.len());
        buf.extend_from_slice(&chunk[..take]);
    }
    Ok(buf)
}
