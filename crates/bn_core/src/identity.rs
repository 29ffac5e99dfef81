use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of an article's canonical link, as 64 lowercase hex characters.
///
/// The link is hashed byte for byte with no normalization, so two links
/// are the same article only when they are identical strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleIdentity(String);

impl ArticleIdentity {
    pub fn from_link(link: &str) -> Self {
        Self(hash_link(link))
    }

    /// Wraps a digest read back from storage.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArticleIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn hash_link(link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(link.as_bytes());
    format!("{:x}", hasher.finalize())
}
