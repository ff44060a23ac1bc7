//! In-memory safety backup for document mutations

use crate::engine::remove_if_present;
use chrono::{DateTime, Utc};
use specsafe_artifact::{atomic_write, DocumentIo, Error, Result};
use std::path::{Path, PathBuf};

/// Suffix of a materialized safety backup (`<document>.safety-<timestamp>`)
pub const SAFETY_SUFFIX: &str = "safety";

/// Timestamp layout used in backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Pre-mutation copy of a live document
///
/// Held only while a restore or auto-fix runs. It touches the disk only if
/// putting the original back fails, in which case it is written next to the
/// document so nothing is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyBackup {
    path: PathBuf,
    original: Option<String>,
}

impl SafetyBackup {
    /// Capture the current content of `path` (`None` if the file is absent)
    ///
    /// # Errors
    /// `Error::Io` if the file exists but cannot be read.
    pub fn capture(io: &dyn DocumentIo, path: &Path) -> Result<Self> {
        let original = if path.exists() {
            Some(io.read(path)?)
        } else {
            None
        };
        Ok(Self::from_content(path, original))
    }

    /// Backup from content the caller already holds
    #[must_use]
    pub fn from_content(path: &Path, original: Option<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            original,
        }
    }

    /// Document this backup belongs to
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Captured content, `None` if the document did not exist
    #[inline]
    #[must_use]
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// Put the original content back after `cause`, returning the error to
    /// propagate
    ///
    /// Rollback bypasses any injected writer and uses [`atomic_write`]
    /// directly. If that fails too, the original is materialized to
    /// `<document>.safety-<timestamp>` and `Error::RollbackFailed` is
    /// returned.
    #[must_use]
    pub fn rollback(&self, cause: Error, now: DateTime<Utc>) -> Error {
        let restored = match &self.original {
            Some(original) => atomic_write(&self.path, original.as_bytes()),
            None => remove_if_present(&self.path),
        };

        match restored {
            Ok(()) => {
                tracing::error!(
                    document = %self.path.display(),
                    error = %cause,
                    "mutation failed, original content restored"
                );
                cause
            }
            Err(rollback_err) => {
                let preserved = self.materialize(now);
                tracing::error!(
                    document = %self.path.display(),
                    error = %cause,
                    rollback_error = %rollback_err,
                    preserved = ?preserved,
                    "rollback failed"
                );
                Error::RollbackFailed {
                    path: self.path.clone(),
                    preserved,
                    cause: Box::new(cause),
                }
            }
        }
    }

    /// Write the original content beside the document
    fn materialize(&self, now: DateTime<Utc>) -> Option<PathBuf> {
        let original = self.original.as_ref()?;
        let target = sibling_path(&self.path, SAFETY_SUFFIX, now);
        match atomic_write(&target, original.as_bytes()) {
            Ok(()) => Some(target),
            Err(e) => {
                tracing::error!(error = %e, "could not materialize safety backup");
                None
            }
        }
    }
}

/// `<path>.<suffix>-<YYYYMMDDHHMMSS>`
#[must_use]
pub fn sibling_path(path: &Path, suffix: &str, now: DateTime<Utc>) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{suffix}-{}", now.format(BACKUP_TIMESTAMP_FORMAT)));
    PathBuf::from(name)
}
