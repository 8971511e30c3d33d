//! Artifact cache client error types.
//!
//! Every networked call either succeeds or returns exactly one [`CacheError`].
//! Nothing is retried internally; callers retry a whole `save`, never a chunk.

use crate::response::RemoteApiError;

/// Errors from artifact cache calls.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Token or environment configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The service returned a structured error. Displays the remote message verbatim.
    #[error("{0}")]
    Remote(RemoteApiError),

    /// The service returned a non-2xx status without a structured error body.
    #[error("artifact cache {endpoint} returned {status}: {body}")]
    Protocol {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The service reported success but the body cannot be used.
    #[error("invalid response from {endpoint}: {body}")]
    InvalidResponse { endpoint: String, body: String },

    /// Reading the upload source or writing the download sink failed.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    /// A lookup needs at least one key.
    #[error("lookup requires at least one key")]
    NoKeys,

    /// The operation's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// An upload worker task panicked or was aborted.
    #[error("upload worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl CacheError {
    /// Remote error details, if the service returned a structured error.
    pub fn remote(&self) -> Option<&RemoteApiError> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

/// Configuration errors. Fatal, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("invalid token without access controls")]
    MissingAccessControl,
    #[error("invalid token: access controls claim is not a string")]
    AccessControlType,
    #[error("failed to parse token access controls: {0}")]
    InvalidAccessControl(#[source] serde_json::Error),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("failed to decrypt token: {0}")]
    Decrypt(String),
    #[error("invalid value for {0}: {1}")]
    InvalidTunable(String, String),
}
