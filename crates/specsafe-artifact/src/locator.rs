//! Finding the current document of a namespace

use crate::error::{Error, Result};
use crate::namespace::Namespace;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

/// File name prefix of spec documents
pub const DOCUMENT_PREFIX: &str = "spec";

/// Resolves the live document for a namespace
pub trait DocumentLocator: Send + Sync + Debug {
    /// Path of the current document
    ///
    /// # Errors
    /// `Error::NotFound` when the namespace has no document.
    fn locate(&self, namespace: &Namespace) -> Result<PathBuf>;
}

/// Directory convention: `<root>/<namespace>/spec-N.*`, highest `N` wins
///
/// A bare `spec.*` counts as revision 0. Names whose suffix is not numeric
/// (`spec-draft.md`) are ignored.
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    root: PathBuf,
}

impl DirectoryLocator {
    /// Locator rooted at the specs directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Specs root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentLocator for DirectoryLocator {
    fn locate(&self, namespace: &Namespace) -> Result<PathBuf> {
        let dir = namespace.dir(&self.root);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(
                    "namespace",
                    namespace.as_str(),
                    dir.display().to_string(),
                ));
            }
            Err(e) => return Err(Error::io("read_dir", &dir, e)),
        };

        let mut best: Option<(u64, String, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("read_dir", &dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let Some(revision) = document_revision(&name) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((rev, best_name, _)) => (revision, &name) > (*rev, best_name),
            };
            if better {
                best = Some((revision, name, path));
            }
        }

        best.map(|(_, _, path)| path).ok_or_else(|| {
            Error::not_found("document", namespace.as_str(), format!("{DOCUMENT_PREFIX}-*"))
        })
    }
}

/// Revision number encoded in a document file name
fn document_revision(file_name: &str) -> Option<u64> {
    let stem = file_name.split_once('.').map_or(file_name, |(stem, _)| stem);
    let rest = stem.strip_prefix(DOCUMENT_PREFIX)?;
    if rest.is_empty() {
        return Some(0);
    }
    rest.strip_prefix('-')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn revision_parsing() {
        assert_eq!(document_revision("spec.md"), Some(0));
        assert_eq!(document_revision("spec-2.md"), Some(2));
        assert_eq!(document_revision("spec-010.md"), Some(10));
        assert_eq!(document_revision("spec-draft.md"), None);
        assert_eq!(document_revision("specification.md"), None);
        assert_eq!(document_revision("plan.md"), None);
    }

    #[test]
    fn highest_revision_wins() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("auth");
        fs::create_dir_all(dir.join("spec-99.d")).unwrap();
        for name in ["spec.md", "spec-2.md", "spec-10.md", "spec-draft.md", "notes.md"] {
            fs::write(dir.join(name), "# x\n").unwrap();
        }

        let locator = DirectoryLocator::new(root.path());
        let found = locator.locate(&Namespace::new("auth").unwrap()).unwrap();
        assert_eq!(found, dir.join("spec-10.md"));
    }

    #[test]
    fn missing_namespace_and_document_are_not_found() {
        let root = tempfile::tempdir().unwrap();
        let locator = DirectoryLocator::new(root.path());
        let ns = Namespace::new("auth").unwrap();

        let err = locator.locate(&ns).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        fs::create_dir_all(root.path().join("auth")).unwrap();
        let err = locator.locate(&ns).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("document"));
    }
}
