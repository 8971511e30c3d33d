//! Artifact cache client configuration.
//!
//! Discovers the service base URL and bearer token from the hosting process's
//! environment. Explicit construction is always available for tests and for
//! hosts that provide credentials some other way.

use url::Url;
use zeroize::Zeroizing;

use crate::decrypt;
use crate::error::ConfigError;

/// Encrypted `url:::token` fixture, used by test environments.
pub const ENV_TOKEN_ENC: &str = "ARTCACHE_TOKEN_ENC";
/// Password for [`ENV_TOKEN_ENC`].
pub const ENV_TOKEN_PW: &str = "ARTCACHE_TOKEN_PW";
/// Bearer token provided by the CI runtime.
pub const ENV_RUNTIME_TOKEN: &str = "ACTIONS_RUNTIME_TOKEN";
/// Cache service base URL provided by the CI runtime.
pub const ENV_CACHE_URL: &str = "ACTIONS_CACHE_URL";

/// Connection settings for the cache service.
///
/// Custom `Debug` implementation redacts the `token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct CacheConfig {
    /// Service base URL, e.g. `https://artifactcache.example.com/<run>/`.
    pub base_url: Url,
    /// Signed bearer token carrying the access-control claim.
    pub token: Zeroizing<String>,
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl CacheConfig {
    /// Create a configuration from explicit values.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            token: Zeroizing::new(token.into()),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables, in order of precedence:
    /// - `ARTCACHE_TOKEN_ENC` + `ARTCACHE_TOKEN_PW`: encrypted `url:::token`,
    ///   decrypted with the external `openssl` tool
    /// - `ACTIONS_RUNTIME_TOKEN` + `ACTIONS_CACHE_URL`
    ///
    /// Returns `Ok(None)` when the environment offers no cache.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// [`from_env`](Self::from_env) with an injectable variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(encrypted) = lookup(ENV_TOKEN_ENC) {
            let password = lookup(ENV_TOKEN_PW).unwrap_or_default();
            let (url, token) = decrypt::decrypt_token(&encrypted, &password)?;
            return Self::new(&url, token).map(Some);
        }

        let Some(token) = lookup(ENV_RUNTIME_TOKEN) else {
            return Ok(None);
        };
        let Some(url) = lookup(ENV_CACHE_URL) else {
            return Ok(None);
        };
        Ok(Some(Self {
            base_url: parse_url(ENV_CACHE_URL, &url)?,
            token: Zeroizing::new(token),
        }))
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

/// Read an optional positive integer tunable from the environment.
pub(crate) fn env_tunable<F, T>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(Some(v)),
        _ => Err(ConfigError::InvalidTunable(var.to_string(), raw)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn runtime_variables_build_config() {
        let cfg = CacheConfig::from_env_with(env(&[
            (ENV_RUNTIME_TOKEN, "tok"),
            (ENV_CACHE_URL, "https://cache.example.com/run42/"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(cfg.base_url.as_str(), "https://cache.example.com/run42/");
        assert_eq!(cfg.token.as_str(), "tok");
    }

    #[test]
    fn missing_variables_mean_no_cache() {
        assert!(CacheConfig::from_env_with(env(&[])).unwrap().is_none());
        assert!(CacheConfig::from_env_with(env(&[(ENV_RUNTIME_TOKEN, "tok")]))
            .unwrap()
            .is_none());
        assert!(
            CacheConfig::from_env_with(env(&[(ENV_CACHE_URL, "https://x.example.com/")]))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = CacheConfig::from_env_with(env(&[
            (ENV_RUNTIME_TOKEN, "tok"),
            (ENV_CACHE_URL, "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(var, _) if var == ENV_CACHE_URL));
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = CacheConfig::new("https://cache.example.com/", "secret-token").unwrap();
        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn tunables_must_be_positive_integers() {
        let lookup = env(&[("A", "8"), ("B", "0"), ("C", "lots")]);
        assert_eq!(env_tunable::<_, u64>(&lookup, "A").unwrap(), Some(8));
        assert!(env_tunable::<_, u64>(&lookup, "B").is_err());
        assert!(env_tunable::<_, usize>(&lookup, "C").is_err());
        assert_eq!(env_tunable::<_, usize>(&lookup, "D").unwrap(), None);
    }
}
