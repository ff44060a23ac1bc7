//! Explicit project context
//!
//! Built once per invocation from the working directory (or an explicit
//! config path) and handed to every command. Nothing is cached globally;
//! [`ProjectContext::refresh`] re-reads the configuration.

use crate::config::Config;
use specsafe_allocator::IdAllocator;
use specsafe_artifact::{Namespace, Result};
use specsafe_completeness::{AutoFixer, Scorer};
use specsafe_snapshot::SnapshotEngine;
use std::path::{Path, PathBuf};

/// Specs root and configuration for one invocation
#[derive(Debug, Clone)]
pub struct ProjectContext {
    base_dir: PathBuf,
    config_path: Option<PathBuf>,
    config: Config,
}

impl ProjectContext {
    /// Load from `explicit`, or from the nearest `specsafe.toml` above `cwd`
    ///
    /// Without a config file, defaults apply relative to `cwd`.
    ///
    /// # Errors
    /// `Error::Io` / `Error::Validation` from loading the config file.
    pub fn discover(cwd: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Config::discover(cwd),
        };
        let (config, base_dir) = match &config_path {
            Some(path) => (
                Config::load(path)?,
                path.parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| cwd.to_path_buf(), Path::to_path_buf),
            ),
            None => (Config::default(), cwd.to_path_buf()),
        };

        tracing::debug!(
            base = %base_dir.display(),
            config = ?config_path,
            "project context resolved"
        );
        Ok(Self {
            base_dir,
            config_path,
            config,
        })
    }

    /// Context over explicit values
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            base_dir: base_dir.into(),
            config_path: None,
            config,
        }
    }

    /// Re-read the config file, if there is one
    ///
    /// # Errors
    /// Same as [`ProjectContext::discover`]; the old state is kept on error.
    pub fn refresh(&mut self) -> Result<()> {
        if let Some(path) = &self.config_path {
            self.config = Config::load(path)?;
        }
        Ok(())
    }

    /// Loaded configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Config file in use, if any
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Absolute specs root
    #[must_use]
    pub fn specs_root(&self) -> PathBuf {
        self.base_dir.join(&self.config.paths.specs_root)
    }

    /// Identifier allocator over the specs root
    #[must_use]
    pub fn allocator(&self) -> IdAllocator {
        IdAllocator::with_config(self.specs_root(), self.config.allocator_config())
    }

    /// Snapshot engine over the specs root
    #[must_use]
    pub fn snapshots(&self) -> SnapshotEngine {
        SnapshotEngine::new(self.specs_root())
    }

    /// Scorer with the configured rubric
    ///
    /// # Errors
    /// `Error::Validation` for an invalid rubric override.
    pub fn scorer(&self) -> Result<Scorer> {
        Ok(Scorer::new(self.config.rubric()?))
    }

    /// Auto-fixer with the configured rubric, snapshotting into `namespace`
    /// when one is given
    ///
    /// # Errors
    /// `Error::Validation` for an invalid rubric override.
    pub fn auto_fixer(&self, namespace: Option<Namespace>) -> Result<AutoFixer> {
        let fixer = AutoFixer::new().with_rubric(self.config.rubric()?);
        Ok(match namespace {
            Some(ns) => fixer.with_safety_snapshots(self.snapshots(), ns),
            None => fixer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;
    use std::fs;

    #[test]
    fn root_is_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("work").join("deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[paths]\nspecs_root = \"docs\"\n").unwrap();

        let ctx = ProjectContext::discover(&nested, None).unwrap();
        assert_eq!(ctx.specs_root(), dir.path().join("docs"));
        assert_eq!(ctx.config_path(), Some(dir.path().join(CONFIG_FILE).as_path()));
    }

    #[test]
    fn defaults_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProjectContext::discover(dir.path(), None).unwrap();
        assert_eq!(ctx.specs_root(), dir.path().join("specs"));
        assert_eq!(ctx.config_path(), None);
    }

    #[test]
    fn refresh_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[snapshots]\nretention_days = 5\n").unwrap();

        let mut ctx = ProjectContext::discover(dir.path(), Some(&path)).unwrap();
        assert_eq!(ctx.config().snapshots.retention_days, 5);

        fs::write(&path, "[snapshots]\nretention_days = 9\n").unwrap();
        ctx.refresh().unwrap();
        assert_eq!(ctx.config().snapshots.retention_days, 9);

        fs::write(&path, "[snapshots\n").unwrap();
        assert!(ctx.refresh().is_err());
        assert_eq!(ctx.config().snapshots.retention_days, 9);
    }
}
