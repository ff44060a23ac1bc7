//! Validated namespace keys
//!
//! A namespace names one directory under the specs root. Everything that is
//! scoped per namespace (identifier counter, documents, snapshots) lives
//! beneath that directory.

use crate::error::{Error, Result};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Maximum namespace length in bytes
pub const MAX_NAMESPACE_LEN: usize = 128;

/// Validated namespace key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace key
    ///
    /// # Errors
    /// Returns `Error::Validation` if the key is empty, too long, starts with
    /// a dot, or contains characters outside `[A-Za-z0-9._-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::invalid("namespace", raw, "must not be empty"));
        }
        if raw.len() > MAX_NAMESPACE_LEN {
            return Err(Error::invalid(
                "namespace",
                raw,
                format!("must be at most {MAX_NAMESPACE_LEN} bytes"),
            ));
        }
        if raw.starts_with('.') {
            return Err(Error::invalid("namespace", raw, "must not start with '.'"));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(Error::invalid(
                "namespace",
                raw.clone(),
                format!("unexpected character {bad:?}"),
            ));
        }
        Ok(Self(raw))
    }

    /// Namespace key as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory owned by this namespace under `root`
    #[inline]
    #[must_use]
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_feature_style_names() {
        for raw in ["specs", "001-login", "auth_v2", "team.alpha"] {
            let ns = Namespace::new(raw).unwrap();
            assert_eq!(ns.as_str(), raw);
        }
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for raw in ["", "..", ".hidden", "a/b", "a\\b", "sp ace", "ünï"] {
            let err = Namespace::new(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{raw:?}");
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let raw = "a".repeat(MAX_NAMESPACE_LEN + 1);
        assert!(Namespace::new(raw).is_err());
    }

    #[test]
    fn dir_joins_root() {
        let ns: Namespace = "auth".parse().unwrap();
        assert_eq!(ns.dir(Path::new("/specs")), PathBuf::from("/specs/auth"));
    }

    proptest::proptest! {
        #[test]
        fn accepted_keys_stay_single_components(raw in "\\PC{0,40}") {
            if let Ok(ns) = Namespace::new(raw.as_str()) {
                let dir = ns.dir(Path::new("root"));
                proptest::prop_assert_eq!(dir.parent(), Some(Path::new("root")));
                proptest::prop_assert_eq!(ns.as_str(), raw.as_str());
            }
        }
    }
}
