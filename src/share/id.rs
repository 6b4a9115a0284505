//! Share identifiers.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Number of random bytes in a share identifier (128 bits).
pub const ID_BYTES: usize = 16;

/// Opaque, unguessable identifier for a share record.
///
/// Rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareId(String);

impl ShareId {
    /// Generate a new identifier from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShareId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ShareId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ShareId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ShareId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
