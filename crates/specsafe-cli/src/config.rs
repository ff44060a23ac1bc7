//! `specsafe.toml` configuration
//!
//! Every key is optional:
//!
//! ```toml
//! [paths]
//! specs_root = "specs"
//!
//! [allocator]
//! lock_timeout_ms = 5000
//! max_retries = 3
//! backoff_ms = 50
//!
//! [snapshots]
//! retention_days = 30
//!
//! [[scoring.sections]]
//! name = "Executive Summary"
//! weight = 100
//! min_chars = 100
//! ```

use serde::Deserialize;
use specsafe_allocator::AllocatorConfig;
use specsafe_artifact::{read_string, Error, LockOptions, Result};
use specsafe_completeness::{Rubric, SectionRule};
use specsafe_snapshot::DEFAULT_RETENTION_DAYS;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name looked up from the working directory upward
pub const CONFIG_FILE: &str = "specsafe.toml";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[paths]`
    pub paths: PathsConfig,
    /// `[allocator]`
    pub allocator: AllocatorSection,
    /// `[snapshots]`
    pub snapshots: SnapshotSection,
    /// `[scoring]`
    pub scoring: ScoringSection,
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory holding one subdirectory per namespace, relative to the
    /// config file
    pub specs_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            specs_root: PathBuf::from("specs"),
        }
    }
}

/// `[allocator]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorSection {
    /// Bounded wait for one lock attempt
    pub lock_timeout_ms: u64,
    /// Extra attempts after a lock timeout
    pub max_retries: u32,
    /// Base retry delay, doubled per attempt
    pub backoff_ms: u64,
}

impl Default for AllocatorSection {
    fn default() -> Self {
        let defaults = AllocatorConfig::default();
        Self {
            lock_timeout_ms: u64::try_from(defaults.lock.timeout.as_millis()).unwrap_or(u64::MAX),
            max_retries: defaults.max_retries,
            backoff_ms: u64::try_from(defaults.backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `[snapshots]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotSection {
    /// Default age for `checkpoint cleanup`
    pub retention_days: u32,
}

impl Default for SnapshotSection {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// `[scoring]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringSection {
    /// Rubric override in canonical order; empty means the built-in rubric
    pub sections: Vec<SectionRule>,
}

impl Config {
    /// Parse configuration text
    ///
    /// # Errors
    /// `Error::Validation` naming `origin` for malformed TOML or unknown keys.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            Error::invalid("config", origin.display().to_string(), e.message().to_string())
        })
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    /// `Error::Io` if the file cannot be read, otherwise as [`Config::parse`].
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::parse(&read_string(path)?, path)?;
        config.rubric()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Nearest `specsafe.toml` in `start` or its ancestors
    #[must_use]
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Allocator tuning
    #[must_use]
    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig {
            lock: LockOptions {
                timeout: Duration::from_millis(self.allocator.lock_timeout_ms),
                ..LockOptions::default()
            },
            max_retries: self.allocator.max_retries,
            backoff: Duration::from_millis(self.allocator.backoff_ms),
        }
    }

    /// Configured rubric, or the built-in one
    ///
    /// # Errors
    /// `Error::Validation` if the override is not a valid rubric.
    pub fn rubric(&self) -> Result<Rubric> {
        if self.scoring.sections.is_empty() {
            return Ok(Rubric::default());
        }
        Rubric::new(self.scoring.sections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use specsafe_artifact::ErrorKind;

    fn parse(text: &str) -> Result<Config> {
        Config::parse(text, Path::new("specsafe.toml"))
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.paths.specs_root, PathBuf::from("specs"));
        assert_eq!(config.snapshots.retention_days, 30);
        assert_eq!(config.allocator_config(), AllocatorConfig::default());
        assert_eq!(config.rubric().unwrap(), Rubric::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
            [paths]
            specs_root = "docs/specs"

            [allocator]
            lock_timeout_ms = 250
            max_retries = 1

            [snapshots]
            retention_days = 7

            [[scoring.sections]]
            name = "Overview"
            weight = 60
            min_chars = 10

            [[scoring.sections]]
            name = "Plan"
            weight = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.specs_root, PathBuf::from("docs/specs"));
        let allocator = config.allocator_config();
        assert_eq!(allocator.lock.timeout, Duration::from_millis(250));
        assert_eq!(allocator.max_retries, 1);
        assert_eq!(allocator.backoff, Duration::from_millis(50));
        assert_eq!(config.snapshots.retention_days, 7);
        assert_eq!(config.rubric().unwrap().rules().len(), 2);
    }

    #[test]
    fn bad_input_is_a_validation_error() {
        for text in ["[paths\n", "[unknown]\nkey = 1\n", "[snapshots]\nretention_days = -1\n"] {
            assert_eq!(parse(text).unwrap_err().kind(), ErrorKind::Validation, "{text}");
        }

        let bad_weights = parse("[[scoring.sections]]\nname = \"A\"\nweight = 50\n").unwrap();
        assert_eq!(bad_weights.rubric().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn discover_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(Config::discover(&nested), None);

        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        assert_eq!(Config::discover(&nested), Some(dir.path().join(CONFIG_FILE)));
    }
}
