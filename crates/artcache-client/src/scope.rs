//! # Scope Model
//!
//! The bearer token carries an access-control claim: a JSON array of
//! `(resource pattern, permission bitmask)` pairs. Scopes are parsed once,
//! when the [`Session`](crate::session::Session) is built, and never mutated.

use serde::{Deserialize, Serialize};

/// Permission bitmask granted by a [`Scope`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(1 << 1);
    pub const READ_WRITE: Self = Self(Self::READ.0 | Self::WRITE.0);

    /// Wrap raw bits as sent by the service. Unknown bits are kept.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Permission {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 > Self::READ_WRITE.0 {
            return write!(f, "{}", self.0);
        }
        let mut names = Vec::with_capacity(2);
        if self.contains(Self::READ) {
            names.push("Read");
        }
        if self.contains(Self::WRITE) {
            names.push("Write");
        }
        f.write_str(&names.join("|"))
    }
}

/// One `(resource pattern, permission)` pair from the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "Scope", alias = "scope")]
    pub pattern: String,
    #[serde(rename = "Permission", alias = "permission", default)]
    pub permission: Permission,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.pattern, self.permission)
    }
}

/// Parse the access-control claim value into scopes.
///
/// An empty array is valid and yields no scopes.
pub(crate) fn parse_scopes(claim: &str) -> Result<Vec<Scope>, serde_json::Error> {
    serde_json::from_str(claim)
}
