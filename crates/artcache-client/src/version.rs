//! # Cache Version Tag
//!
//! The service namespaces entries by `(key, version)`. This client derives a
//! single version tag from its own name and version, not from the key, so every
//! key written or read by this client lives in the same version space.
//!
//! Wire format: lowercase hex SHA-256 of `"|<client-name>-<client-version>"`.

use sha2::{Digest, Sha256};

/// Name component of the version tag.
pub const CLIENT_NAME: &str = "artcache";

/// Version component of the version tag. Changing it orphans every existing entry.
pub const CLIENT_VERSION: &str = "1.0";

/// Version tag sent with every lookup and reservation.
///
/// The key is accepted for call-site symmetry with the service protocol but
/// does not influence the result.
#[must_use]
pub fn cache_version(_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("|{CLIENT_NAME}-{CLIENT_VERSION}").as_bytes());
    hex::encode(hasher.finalize())
}
