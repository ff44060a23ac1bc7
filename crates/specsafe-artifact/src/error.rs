//! Error types shared by every specsafe component
//!
//! Every variant carries enough context (namespace, artifact name, path and
//! the check that failed) to reproduce the condition without extra logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Coarse error classification used for exit codes and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No document, snapshot or namespace matches the request
    NotFound,
    /// Hash mismatch before or after a write
    Integrity,
    /// Malformed identifier, namespace or configuration input
    Validation,
    /// A namespace lock could not be acquired in time
    Concurrency,
    /// Underlying read/write/rename failure
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::Integrity => "integrity",
            Self::Validation => "validation",
            Self::Concurrency => "concurrency",
            Self::Io => "io",
        };
        f.write_str(label)
    }
}

/// Main specsafe error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested item does not exist
    #[error("{what} '{name}' not found in namespace '{namespace}'")]
    NotFound {
        /// Kind of item ("document", "snapshot", ...)
        what: &'static str,
        /// Owning namespace
        namespace: String,
        /// Item name that was looked up
        name: String,
    },

    /// Content hash disagreement
    #[error(
        "integrity check '{check}' failed for '{name}' in namespace '{namespace}': expected {expected}, got {actual}"
    )]
    Integrity {
        /// Owning namespace
        namespace: String,
        /// Snapshot or document name
        name: String,
        /// The specific check that failed
        check: &'static str,
        /// Expected hash
        expected: String,
        /// Observed hash
        actual: String,
    },

    /// Rejected input
    #[error("invalid {field} '{value}': {reason}")]
    Validation {
        /// Input field name
        field: &'static str,
        /// Offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Lock acquisition timed out
    #[error("could not lock {} for namespace '{namespace}' within {waited_ms}ms", path.display())]
    Concurrency {
        /// Namespace being locked
        namespace: String,
        /// Lock file path
        path: PathBuf,
        /// Time spent waiting
        waited_ms: u64,
    },

    /// Filesystem failure
    #[error("io error during {op} on {}: {source}", path.display())]
    Io {
        /// Operation that failed ("read", "rename", ...)
        op: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A mutation failed and putting the original content back failed too
    #[error(
        "rollback of {} failed after: {cause}; original content preserved at {}",
        path.display(),
        preserved.as_ref().map_or_else(|| "<nowhere>".to_string(), |p| p.display().to_string())
    )]
    RollbackFailed {
        /// Document that could not be rolled back
        path: PathBuf,
        /// Where the safety backup was materialized, if anywhere
        preserved: Option<PathBuf>,
        /// The error that triggered the rollback
        cause: Box<Error>,
    },
}

impl Error {
    /// Create IO error for path
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Create not-found error
    pub fn not_found(
        what: &'static str,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            what,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create validation error
    pub fn invalid(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Concurrency { .. } => ErrorKind::Concurrency,
            Self::Io { .. } => ErrorKind::Io,
            Self::RollbackFailed { cause, .. } => cause.kind(),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Concurrency { .. })
    }
}

/// Result type alias for specsafe operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("snapshot", "auth", "snapshot-004");
        assert_eq!(
            err.to_string(),
            "snapshot 'snapshot-004' not found in namespace 'auth'"
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn integrity_display_names_check() {
        let err = Error::Integrity {
            namespace: "auth".into(),
            name: "snapshot-001".into(),
            check: "stored content hash",
            expected: "aa".into(),
            actual: "bb".into(),
        };
        let text = err.to_string();
        assert!(text.contains("stored content hash"));
        assert!(text.contains("snapshot-001"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn rollback_failure_keeps_cause_kind() {
        let cause = Error::io(
            "write",
            "/tmp/spec.md",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        let err = Error::RollbackFailed {
            path: "/tmp/spec.md".into(),
            preserved: Some("/tmp/spec.md.safety".into()),
            cause: Box::new(cause),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/tmp/spec.md.safety"));
    }

    #[test]
    fn concurrency_is_retryable() {
        let err = Error::Concurrency {
            namespace: "specs".into(),
            path: "/tmp/.id-counter.lock".into(),
            waited_ms: 5000,
        };
        assert!(err.is_retryable());
        assert_eq!(err.kind().to_string(), "concurrency");
    }
}
