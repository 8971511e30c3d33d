//! # Session
//!
//! The authenticated, scope-bearing handle used to build every request to
//! the cache service. Immutable once constructed, so it is shared freely
//! across concurrent operations.

use url::Url;
use zeroize::Zeroizing;

use crate::error::ConfigError;
use crate::scope::{self, Permission, Scope};
use crate::token;

/// Fixed path prefix of the cache API under the service base URL.
pub(crate) const API_PREFIX: &str = "_apis/artifactcache/";

/// API version negotiated through the `Accept` header.
pub(crate) const ACCEPT_HEADER: &str = "application/json;api-version=6.0-preview.1";

/// Parsed bearer token, its scopes and the service base URL.
///
/// Custom `Debug` implementation redacts the token.
#[derive(Clone)]
pub struct Session {
    base_url: Url,
    raw_token: Zeroizing<String>,
    scopes: Vec<Scope>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("raw_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Session {
    /// Build a session from a bearer token and the service base URL.
    ///
    /// The token's claims are read without verifying its signature. Fails if
    /// the access-control claim is absent, not a string, or not a JSON scope
    /// list. A token granting zero scopes is accepted.
    pub fn new(token: &str, base_url: Url) -> Result<Self, ConfigError> {
        let claim = token::access_control_claim(token)?;
        let scopes = scope::parse_scopes(&claim).map_err(ConfigError::InvalidAccessControl)?;
        tracing::info!(
            scopes = %scopes.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
            "parsed cache token"
        );

        Ok(Self {
            base_url: normalize_base(base_url),
            raw_token: Zeroizing::new(token.to_owned()),
            scopes,
        })
    }

    /// Service base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Scopes granted by the token, in token order.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// True if any scope grants every bit of `permission`.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.scopes
            .iter()
            .any(|s| s.permission.contains(permission))
    }

    /// Absolute URL of an API resource, e.g. `caches/12`.
    pub(crate) fn url(&self, resource: &str) -> Result<Url, ConfigError> {
        self.base_url
            .join(&format!("{API_PREFIX}{resource}"))
            .map_err(|e| ConfigError::InvalidUrl(resource.to_owned(), e.to_string()))
    }

    /// Attach the bearer credential and API version header.
    pub(crate) fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(self.raw_token.as_str())
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
    }
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
