//! Verified restore with rollback

use crate::engine::SnapshotEngine;
use crate::record::{SnapshotName, SnapshotRecord};
use crate::safety::SafetyBackup;
use chrono::{DateTime, Utc};
use specsafe_artifact::{
    ContentHash, DocumentMetadata, Error, ErrorKind, Namespace, Result, SectionMap,
};
use std::path::{Path, PathBuf};

/// What a restore would change, shown before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreSummary {
    /// Snapshot being restored
    pub snapshot: SnapshotName,
    /// Its description
    pub description: String,
    /// Its capture time
    pub created_at: DateTime<Utc>,
    /// Document that will be overwritten
    pub target: PathBuf,
    /// Tier of the live document (`None` if it does not exist)
    pub tier_before: Option<String>,
    /// Tier recorded in the snapshot
    pub tier_after: String,
    /// Completion percentage of the live document
    pub progress_before: Option<f64>,
    /// Completion percentage recorded in the snapshot
    pub progress_after: f64,
    /// Section count of the live document
    pub sections_before: Option<usize>,
    /// Section count of the snapshot content
    pub sections_after: usize,
}

/// Interactive gate for non-forced restores
pub trait ConfirmRestore {
    /// Return `true` to proceed with the restore
    fn confirm(&self, summary: &RestoreSummary) -> bool;
}

impl<F> ConfirmRestore for F
where
    F: Fn(&RestoreSummary) -> bool,
{
    fn confirm(&self, summary: &RestoreSummary) -> bool {
        self(summary)
    }
}

/// Result of a restore request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The document now holds the snapshot content
    Restored {
        /// Snapshot that was restored
        name: SnapshotName,
        /// Document that was written
        path: PathBuf,
        /// Verified hash of the written content
        hash: ContentHash,
    },
    /// Confirmation refused; nothing was written
    Cancelled,
}

impl SnapshotEngine {
    /// Overwrite the live document with a snapshot's content
    ///
    /// Unless `force` is set, `confirm` sees a [`RestoreSummary`] first and
    /// may cancel. Any failure after the write starts puts the original
    /// content back before the error is returned.
    ///
    /// # Errors
    /// - `Error::NotFound` if the snapshot content or record is missing
    /// - `Error::Integrity` if stored content fails its hash check, or the
    ///   written document fails re-verification
    /// - `Error::Io` on read/write failure
    /// - `Error::RollbackFailed` if the original could not be put back
    pub fn restore(
        &self,
        namespace: &Namespace,
        name: SnapshotName,
        force: bool,
        confirm: &dyn ConfirmRestore,
    ) -> Result<RestoreOutcome> {
        let snapshot = self.get(namespace, name)?;
        let target = self.restore_target(namespace, &snapshot.record)?;
        let backup = SafetyBackup::capture(self.io.as_ref(), &target)?;

        if !force {
            let summary = summarize(&snapshot.record, &snapshot.content, &target, backup.original());
            if !confirm.confirm(&summary) {
                tracing::info!(namespace = %namespace, snapshot = %name, "restore cancelled");
                return Ok(RestoreOutcome::Cancelled);
            }
        }

        let expected = &snapshot.record.content_hash;
        let hash = match self.write_verified(namespace, name, &target, &snapshot.content, expected)
        {
            Ok(hash) => hash,
            Err(e) => return Err(backup.rollback(e, self.clock.now())),
        };

        tracing::info!(
            namespace = %namespace,
            snapshot = %name,
            document = %target.display(),
            hash = %hash.short(),
            "snapshot restored"
        );
        Ok(RestoreOutcome::Restored {
            name,
            path: target,
            hash,
        })
    }

    /// Restore the most recent snapshot
    ///
    /// # Errors
    /// `Error::NotFound` if the namespace has no snapshots, otherwise as
    /// [`SnapshotEngine::restore`].
    pub fn restore_latest(
        &self,
        namespace: &Namespace,
        force: bool,
        confirm: &dyn ConfirmRestore,
    ) -> Result<RestoreOutcome> {
        let latest = self
            .latest(namespace)?
            .ok_or_else(|| Error::not_found("snapshot", namespace.as_str(), "latest"))?;
        self.restore(namespace, latest.name, force, confirm)
    }

    /// Live document for the namespace, falling back to the captured file
    /// name when no document currently exists
    fn restore_target(&self, namespace: &Namespace, record: &SnapshotRecord) -> Result<PathBuf> {
        match self.locator.locate(namespace) {
            Ok(path) => Ok(path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let file_name = Path::new(&record.source_document);
                if file_name.file_name() != Some(file_name.as_os_str()) {
                    return Err(e);
                }
                Ok(namespace.dir(self.root()).join(file_name))
            }
            Err(e) => Err(e),
        }
    }

    fn write_verified(
        &self,
        namespace: &Namespace,
        name: SnapshotName,
        target: &Path,
        content: &str,
        expected: &ContentHash,
    ) -> Result<ContentHash> {
        self.io.write(target, content)?;
        let written = self.io.read(target)?;
        expected.verify("post-restore hash", namespace.as_str(), &name.to_string(), &written)?;
        Ok(*expected)
    }
}

fn summarize(
    record: &SnapshotRecord,
    content: &str,
    target: &Path,
    current: Option<&str>,
) -> RestoreSummary {
    let before = current.map(|c| (DocumentMetadata::parse(c), SectionMap::parse(c).len()));
    RestoreSummary {
        snapshot: record.name,
        description: record.description.clone(),
        created_at: record.created_at,
        target: target.to_path_buf(),
        tier_before: before
            .as_ref()
            .map(|(meta, _)| meta.tier_or_default().to_string()),
        tier_after: record.tier.clone(),
        progress_before: before.as_ref().map(|(meta, _)| meta.completion_percent()),
        progress_after: record.completion_percent(),
        sections_before: before.map(|(_, sections)| sections),
        sections_after: SectionMap::parse(content).len(),
    }
}
