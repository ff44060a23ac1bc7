//! Snapshot names and persisted metadata records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specsafe_artifact::{ContentHash, Error, Result};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Prefix shared by every snapshot name
pub const SNAPSHOT_PREFIX: &str = "snapshot-";

/// Extension of the content artifact
pub const CONTENT_EXT: &str = "md";

/// Extension of the metadata artifact
pub const RECORD_EXT: &str = "json";

/// Sequential snapshot name (`snapshot-001`, `snapshot-002`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotName(u32);

impl SnapshotName {
    /// Name for sequence number `seq`
    #[inline]
    #[must_use]
    pub const fn new(seq: u32) -> Self {
        Self(seq)
    }

    /// Sequence number
    #[inline]
    #[must_use]
    pub const fn seq(self) -> u32 {
        self.0
    }

    /// Following name in the sequence
    ///
    /// # Errors
    /// `Error::Validation` once the sequence is exhausted.
    pub fn next(self) -> Result<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| Error::invalid("snapshot name", self.to_string(), "sequence exhausted"))
    }

    /// File name of the content artifact
    #[must_use]
    pub fn content_file(self) -> String {
        format!("{self}.{CONTENT_EXT}")
    }

    /// File name of the metadata artifact
    #[must_use]
    pub fn record_file(self) -> String {
        format!("{self}.{RECORD_EXT}")
    }

    /// Recognize a snapshot artifact file name (either extension)
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        if ext != CONTENT_EXT && ext != RECORD_EXT {
            return None;
        }
        stem.parse().ok()
    }
}

impl Display for SnapshotName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{SNAPSHOT_PREFIX}{:03}", self.0)
    }
}

impl FromStr for SnapshotName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix(SNAPSHOT_PREFIX).ok_or_else(|| {
            Error::invalid("snapshot name", s, format!("must start with '{SNAPSHOT_PREFIX}'"))
        })?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid(
                "snapshot name",
                s,
                "must end with a decimal sequence number",
            ));
        }
        digits
            .parse()
            .map(Self)
            .map_err(|e| Error::invalid("snapshot name", s, e.to_string()))
    }
}

impl Serialize for SnapshotName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SnapshotName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Persisted metadata of one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Snapshot name
    pub name: SnapshotName,
    /// Capture time
    pub created_at: DateTime<Utc>,
    /// Human-supplied description
    pub description: String,
    /// File name of the document that was captured
    pub source_document: String,
    /// Tier label from the document's metadata block
    pub tier: String,
    /// Progress fraction (`0.0..=1.0`) from the document's metadata block
    pub progress: f64,
    /// Hash of the stored content
    pub content_hash: ContentHash,
    /// Stored content length in bytes
    pub size_bytes: u64,
}

impl SnapshotRecord {
    /// Progress as a percentage
    #[inline]
    #[must_use]
    pub fn completion_percent(&self) -> f64 {
        self.progress * 100.0
    }
}

/// A snapshot's content together with its record
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Metadata record
    pub record: SnapshotRecord,
    /// Document content at capture time
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use specsafe_artifact::ErrorKind;

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(SnapshotName::new(1).to_string(), "snapshot-001");
        assert_eq!(SnapshotName::new(42).content_file(), "snapshot-042.md");
        assert_eq!(SnapshotName::new(1234).record_file(), "snapshot-1234.json");
        assert_eq!(SnapshotName::new(9).next().unwrap(), SnapshotName::new(10));
        let err = SnapshotName::new(u32::MAX).next().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn names_parse_strictly() {
        assert_eq!("snapshot-007".parse::<SnapshotName>().unwrap().seq(), 7);
        assert_eq!("snapshot-1000".parse::<SnapshotName>().unwrap().seq(), 1000);
        for bad in ["snapshot-", "snap-001", "snapshot-1a", "snapshot--1", "../snapshot-001"] {
            let err = bad.parse::<SnapshotName>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad}");
        }
    }

    #[test]
    fn file_names_are_recognized() {
        assert_eq!(
            SnapshotName::from_file_name("snapshot-003.json"),
            Some(SnapshotName::new(3))
        );
        assert_eq!(
            SnapshotName::from_file_name("snapshot-003.md"),
            Some(SnapshotName::new(3))
        );
        assert_eq!(SnapshotName::from_file_name("snapshot-003.txt"), None);
        assert_eq!(SnapshotName::from_file_name(".lock"), None);
    }

    #[test]
    fn record_json_shape() {
        let record = SnapshotRecord {
            name: SnapshotName::new(2),
            created_at: "2026-01-02T03:04:05Z".parse().unwrap(),
            description: "before auto-fix".into(),
            source_document: "spec-1.md".into(),
            tier: "standard".into(),
            progress: 0.25,
            content_hash: ContentHash::compute(b"x"),
            size_bytes: 1,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "snapshot-002");
        assert_eq!(json["created_at"], "2026-01-02T03:04:05Z");
        assert_eq!(json["content_hash"], record.content_hash.to_string());

        let back: SnapshotRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert!((back.completion_percent() - 25.0).abs() < f64::EPSILON);
    }
}
