//! Content hashing for snapshots and restore verification
//!
//! A [`ContentHash`] is the BLAKE3 digest of a document's exact bytes. It is
//! persisted as 64 lowercase hex characters in snapshot records and checked
//! again after every write that must reproduce known content.

use crate::error::{Error, Result};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const DIGEST_LEN: usize = 32;
const SHORT_LEN: usize = 6;

/// BLAKE3 digest of document content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; DIGEST_LEN]);

impl ContentHash {
    /// Hash raw bytes
    #[must_use]
    pub fn compute(data: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }

    /// True when `data` hashes to this value
    #[must_use]
    pub fn matches(&self, data: impl AsRef<[u8]>) -> bool {
        Self::compute(data) == *self
    }

    /// Compare `content` against this hash
    ///
    /// # Errors
    /// `Error::Integrity` naming `check`, with both digests, on mismatch.
    pub fn verify(
        &self,
        check: &'static str,
        namespace: &str,
        name: &str,
        content: &str,
    ) -> Result<()> {
        let actual = Self::compute(content);
        if actual == *self {
            return Ok(());
        }
        Err(Error::Integrity {
            namespace: namespace.to_string(),
            name: name.to_string(),
            check,
            expected: self.to_string(),
            actual: actual.to_string(),
        })
    }

    /// Leading 12 hex characters, for logs and CLI output
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..SHORT_LEN])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != DIGEST_LEN * 2 {
            return Err(HashError::Length(s.len()));
        }
        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut digest)?;
        Ok(Self(digest))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A stored hash string that cannot be decoded
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Not 64 hex characters
    #[error("content hash must be {expected} hex characters, got {0}", expected = DIGEST_LEN * 2)]
    Length(usize),

    /// Non-hex characters
    #[error("content hash is not hex: {0}")]
    Hex(#[from] hex::FromHexError),
}
