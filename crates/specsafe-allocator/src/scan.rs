//! Directory scan for the highest used identifier
//!
//! Only used to bootstrap a missing counter or to recover from a corrupt one.
//! Two processes scanning concurrently can see the same maximum, which is why
//! the steady-state path reads the persisted counter instead.

use specsafe_artifact::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Highest numeric prefix among the entries of `dir` (0 if none)
///
/// Recognized names: `007`, `007-login`, `12_payments`. Hidden entries are
/// skipped. A missing directory counts as empty.
///
/// # Errors
/// `Error::Io` when the directory exists but cannot be listed.
pub fn highest_existing_id(dir: &Path) -> Result<u64> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::io("read_dir", dir, e)),
    };

    let mut highest = 0;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("read_dir", dir, e))?;
        if let Some(id) = entry.file_name().to_str().and_then(numeric_prefix) {
            highest = highest.max(id);
        }
    }
    Ok(highest)
}

/// Parse the leading decimal identifier of an item name
pub(crate) fn numeric_prefix(name: &str) -> Option<u64> {
    if name.starts_with('.') {
        return None;
    }
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &name[digits..];
    if !(rest.is_empty() || rest.starts_with(['-', '_'])) {
        return None;
    }
    name[..digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_prefix_forms() {
        assert_eq!(numeric_prefix("007"), Some(7));
        assert_eq!(numeric_prefix("007-login"), Some(7));
        assert_eq!(numeric_prefix("12_payments"), Some(12));
        assert_eq!(numeric_prefix("3d-models"), None);
        assert_eq!(numeric_prefix("login"), None);
        assert_eq!(numeric_prefix(".005-hidden"), None);
    }

    #[test]
    fn scan_takes_maximum() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["001-a", "004-b", "002-c", "notes"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("009-file.md"), "").unwrap();
        assert_eq!(highest_existing_id(dir.path()).unwrap(), 9);
    }

    #[test]
    fn scan_of_missing_dir_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(highest_existing_id(&dir.path().join("absent")).unwrap(), 0);
    }
}
