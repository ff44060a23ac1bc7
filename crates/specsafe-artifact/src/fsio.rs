//! Crash-safe file I/O
//!
//! All persisted writes go through [`atomic_write`]: the bytes land in a
//! temporary file in the destination directory, are fsynced, and the file is
//! renamed over the destination. Readers observe either the old or the new
//! content, never a prefix.

use crate::error::{Error, Result};
use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `bytes` to `path` via temp file + rename
///
/// The parent directory is created if missing.
///
/// # Errors
/// Returns `Error::Io` naming the failing step.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::io("create_dir", parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::io("create_temp", parent, e))?;
    tmp.write_all(bytes)
        .map_err(|e| Error::io("write_temp", tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io("sync_temp", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::io("rename", path, e.error))?;
    Ok(())
}

/// Read a file into a string
///
/// # Errors
/// `Error::Io` with `op = "read"`.
pub fn read_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io("read", path, e))
}

/// Remove a file
///
/// # Errors
/// `Error::Io` with `op = "remove"`.
pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| Error::io("remove", path, e))
}

/// Read/write seam for live documents
///
/// The snapshot engine and the auto-fixer write documents only through this
/// trait so a failing writer can be substituted in tests.
pub trait DocumentIo: Send + Sync + Debug {
    /// Read the whole document
    ///
    /// # Errors
    /// Returns `Error::Io` on read failure.
    fn read(&self, path: &Path) -> Result<String>;

    /// Replace the whole document
    ///
    /// # Errors
    /// Returns `Error::Io` on write failure.
    fn write(&self, path: &Path, content: &str) -> Result<()>;
}

/// Default [`DocumentIo`]: plain reads, atomic-replace writes
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicFileIo;

impl DocumentIo for AtomicFileIo {
    fn read(&self, path: &Path) -> Result<String> {
        read_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        atomic_write(path, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn atomic_write_creates_parent_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("spec.md");

        atomic_write(&path, b"first").unwrap();
        assert_eq!(read_string(&path).unwrap(), "first");

        atomic_write(&path, b"second").unwrap();
        assert_eq!(read_string(&path).unwrap(), "second");

        // No temp files left behind
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_string(&dir.path().join("absent.md")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("read"));
    }

    #[test]
    fn atomic_file_io_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.md");
        let io = AtomicFileIo;
        io.write(&path, "# Title\n").unwrap();
        assert_eq!(io.read(&path).unwrap(), "# Title\n");
    }
}
