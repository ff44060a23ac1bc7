//! Specsafe Snapshot Engine
//!
//! Point-in-time copies of a namespace's spec document, stored as
//! `<root>/<namespace>/checkpoints/snapshot-NNN.{md,json}`.
//!
//! # Lifecycle
//!
//! - [`SnapshotEngine::create`] captures the current document (content hash,
//!   size, tier and progress go into the JSON record)
//! - [`SnapshotEngine::list`] / [`SnapshotEngine::latest`] / [`SnapshotEngine::get`]
//! - [`SnapshotEngine::restore`] verifies the stored hash, optionally asks for
//!   confirmation, writes, re-verifies and rolls back on any failure
//! - [`SnapshotEngine::cleanup`] removes snapshots past a retention age
//!
//! # Example
//!
//! ```rust,ignore
//! use specsafe_snapshot::{RestoreOutcome, SnapshotEngine};
//!
//! let engine = SnapshotEngine::new("specs");
//! let ns = "auth".parse()?;
//! let name = engine.create(&ns, "before refactor", None)?;
//! // ... edits go wrong ...
//! let outcome = engine.restore(&ns, name, true, &|_: &_| true)?;
//! assert!(matches!(outcome, RestoreOutcome::Restored { .. }));
//! ```

#![warn(unreachable_pub)]

mod engine;
mod record;
mod restore;
mod retention;
mod safety;

pub use engine::{Clock, FixedClock, SnapshotEngine, SystemClock, CHECKPOINT_DIR, CREATE_LOCK_FILE};
pub use record::{Snapshot, SnapshotName, SnapshotRecord, SNAPSHOT_PREFIX};
pub use restore::{ConfirmRestore, RestoreOutcome, RestoreSummary};
pub use safety::{sibling_path, SafetyBackup, BACKUP_TIMESTAMP_FORMAT, SAFETY_SUFFIX};

/// Default retention age for [`SnapshotEngine::cleanup`]
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
