//! Age-based snapshot cleanup

use crate::engine::{remove_if_present, SnapshotEngine};
use chrono::{DateTime, Duration, Utc};
use specsafe_artifact::{remove_file, Namespace, Result};

impl SnapshotEngine {
    /// Delete every snapshot captured more than `older_than_days` ago
    ///
    /// Best-effort: unreadable records and failed removals are logged and
    /// skipped. Returns the number of snapshots removed. An age reaching
    /// past the representable date range expires nothing.
    ///
    /// # Errors
    /// `Error::Io` only if the checkpoint directory cannot be listed.
    pub fn cleanup(&self, namespace: &Namespace, older_than_days: u32) -> Result<usize> {
        let cutoff = Duration::try_days(i64::from(older_than_days))
            .and_then(|age| self.clock.now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.cleanup_before(namespace, cutoff)
    }

    /// Delete every snapshot captured strictly before `cutoff`
    ///
    /// # Errors
    /// Same as [`SnapshotEngine::cleanup`].
    pub fn cleanup_before(&self, namespace: &Namespace, cutoff: DateTime<Utc>) -> Result<usize> {
        let dir = self.checkpoint_dir(namespace);
        let mut removed = 0;

        for name in self.record_names(namespace)? {
            let record = match self.read_record(namespace, name) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(namespace = %namespace, snapshot = %name, error = %e, "cleanup skipping unreadable record");
                    continue;
                }
            };
            if record.created_at >= cutoff {
                continue;
            }

            if let Err(e) = remove_if_present(&dir.join(name.content_file())) {
                tracing::warn!(snapshot = %name, error = %e, "failed to remove snapshot content");
                continue;
            }
            match remove_file(&dir.join(name.record_file())) {
                Ok(()) => {
                    tracing::debug!(namespace = %namespace, snapshot = %name, "expired snapshot removed");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(snapshot = %name, error = %e, "failed to remove snapshot record");
                }
            }
        }

        if removed > 0 {
            tracing::info!(namespace = %namespace, removed, %cutoff, "snapshot cleanup finished");
        }
        Ok(removed)
    }
}
