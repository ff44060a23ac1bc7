//! Snapshot creation, listing and lookup

use crate::record::{Snapshot, SnapshotName, SnapshotRecord, RECORD_EXT};
use chrono::{DateTime, Utc};
use specsafe_artifact::{
    atomic_write, remove_file, AtomicFileIo, ContentHash, DirectoryLocator,
    DocumentIo, DocumentLocator, DocumentMetadata, Error, LockOptions, Namespace,
    NamespaceLock, Result,
};
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory (inside the namespace) holding snapshot artifacts
pub const CHECKPOINT_DIR: &str = "checkpoints";

/// Lock file serializing snapshot creation within a namespace
pub const CREATE_LOCK_FILE: &str = ".lock";

/// Time source for capture timestamps and retention cutoffs
pub trait Clock: Send + Sync + Debug {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Snapshot Engine
///
/// Owns the `checkpoints/` directory of every namespace under `root`. Each
/// snapshot is two files, `snapshot-NNN.md` (content) and
/// `snapshot-NNN.json` (record), both written by atomic replace.
///
/// # Collaborators
/// - [`DocumentLocator`]: finds the live document of a namespace
/// - [`DocumentIo`]: reads and writes the live document during restore
/// - [`Clock`]: capture timestamps and retention cutoffs
#[derive(Debug)]
pub struct SnapshotEngine {
    root: PathBuf,
    pub(crate) locator: Box<dyn DocumentLocator>,
    pub(crate) io: Box<dyn DocumentIo>,
    pub(crate) clock: Box<dyn Clock>,
    lock: LockOptions,
}

impl SnapshotEngine {
    /// Engine over `root` with the directory locator, atomic file I/O and
    /// the system clock
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            locator: Box::new(DirectoryLocator::new(root.clone())),
            io: Box::new(AtomicFileIo),
            clock: Box::new(SystemClock),
            lock: LockOptions::default(),
            root,
        }
    }

    /// Replace the document locator
    #[must_use]
    pub fn with_locator(mut self, locator: impl DocumentLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    /// Replace the live-document I/O
    #[must_use]
    pub fn with_io(mut self, io: impl DocumentIo + 'static) -> Self {
        self.io = Box::new(io);
        self
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the creation lock settings
    #[must_use]
    pub fn with_lock_options(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    /// Specs root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the namespace's snapshots
    #[must_use]
    pub fn checkpoint_dir(&self, namespace: &Namespace) -> PathBuf {
        namespace.dir(&self.root).join(CHECKPOINT_DIR)
    }

    /// Capture the current (or given) document
    ///
    /// Holds the namespace's creation lock from name selection through both
    /// writes, so concurrent creators never pick the same name.
    ///
    /// # Errors
    /// - `Error::Validation` for an empty description
    /// - `Error::NotFound` if no document exists for the namespace
    /// - `Error::Concurrency` if the creation lock times out
    /// - `Error::Io` on read/write failure
    pub fn create(
        &self,
        namespace: &Namespace,
        description: &str,
        source_document: Option<&Path>,
    ) -> Result<SnapshotName> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::invalid("description", description, "must not be empty"));
        }

        let source = match source_document {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => {
                return Err(Error::not_found(
                    "document",
                    namespace.as_str(),
                    path.display().to_string(),
                ))
            }
            None => self.locator.locate(namespace)?,
        };

        let content = self.io.read(&source)?;
        let metadata = DocumentMetadata::parse(&content);
        let dir = self.checkpoint_dir(namespace);
        let _guard = NamespaceLock::acquire(namespace, &dir.join(CREATE_LOCK_FILE), self.lock)?;

        let name = self.next_name(namespace)?;
        let record = SnapshotRecord {
            name,
            created_at: self.clock.now(),
            description: description.to_string(),
            source_document: source
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            tier: metadata.tier_or_default().to_string(),
            progress: metadata.progress.unwrap_or(0.0),
            content_hash: ContentHash::compute(content.as_bytes()),
            size_bytes: content.len() as u64,
        };

        let content_path = dir.join(name.content_file());
        atomic_write(&content_path, content.as_bytes())?;

        let record_path = dir.join(name.record_file());
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| Error::io("encode_record", &record_path, io::Error::other(e)))?;
        if let Err(e) = atomic_write(&record_path, &json) {
            if let Err(cleanup) = remove_file(&content_path) {
                tracing::warn!(error = %cleanup, "failed to remove orphaned snapshot content");
            }
            return Err(e);
        }

        tracing::info!(
            namespace = %namespace,
            snapshot = %name,
            hash = %record.content_hash.short(),
            size = record.size_bytes,
            "snapshot created"
        );
        Ok(name)
    }

    /// All readable snapshots, newest first
    ///
    /// Unreadable records are skipped with a warning.
    ///
    /// # Errors
    /// `Error::Io` if the checkpoint directory cannot be listed.
    pub fn list(&self, namespace: &Namespace) -> Result<Vec<SnapshotRecord>> {
        let mut records: Vec<SnapshotRecord> = self
            .record_names(namespace)?
            .into_iter()
            .filter_map(|name| match self.read_record(namespace, name) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(namespace = %namespace, snapshot = %name, error = %e, "skipping unreadable snapshot record");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(records)
    }

    /// Most recent snapshot, if any
    ///
    /// # Errors
    /// Same as [`SnapshotEngine::list`].
    pub fn latest(&self, namespace: &Namespace) -> Result<Option<SnapshotRecord>> {
        Ok(self.list(namespace)?.into_iter().next())
    }

    /// Load a snapshot and verify its stored hash
    ///
    /// # Errors
    /// - `Error::NotFound` if either artifact is missing
    /// - `Error::Integrity` if the record is unreadable or the content does
    ///   not match the recorded hash
    pub fn get(&self, namespace: &Namespace, name: SnapshotName) -> Result<Snapshot> {
        let record = self.read_record(namespace, name)?;
        let content_path = self.checkpoint_dir(namespace).join(name.content_file());
        let content = match fs::read_to_string(&content_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::not_found("snapshot content", namespace.as_str(), name.to_string()))
            }
            Err(e) => return Err(Error::io("read", &content_path, e)),
        };

        record.content_hash.verify(
            "stored content hash",
            namespace.as_str(),
            &name.to_string(),
            &content,
        )?;

        Ok(Snapshot { record, content })
    }

    /// Remove both artifacts of one snapshot
    ///
    /// # Errors
    /// - `Error::NotFound` if the snapshot has no record
    /// - `Error::Io` if a file cannot be removed
    pub fn delete(&self, namespace: &Namespace, name: SnapshotName) -> Result<()> {
        let dir = self.checkpoint_dir(namespace);
        let record_path = dir.join(name.record_file());
        if !record_path.exists() {
            return Err(Error::not_found("snapshot", namespace.as_str(), name.to_string()));
        }
        remove_if_present(&dir.join(name.content_file()))?;
        remove_file(&record_path)?;
        tracing::info!(namespace = %namespace, snapshot = %name, "snapshot deleted");
        Ok(())
    }

    /// Next free name: highest existing sequence + 1
    fn next_name(&self, namespace: &Namespace) -> Result<SnapshotName> {
        let highest = self
            .artifact_names(namespace)?
            .into_iter()
            .max()
            .unwrap_or(SnapshotName::new(0));
        highest.next()
    }

    /// Names that have a record file
    pub(crate) fn record_names(&self, namespace: &Namespace) -> Result<Vec<SnapshotName>> {
        self.scan(namespace, |file_name| {
            Path::new(file_name).extension().is_some_and(|ext| ext == RECORD_EXT)
        })
    }

    /// Names that have any artifact (content or record)
    fn artifact_names(&self, namespace: &Namespace) -> Result<Vec<SnapshotName>> {
        self.scan(namespace, |_| true)
    }

    fn scan(
        &self,
        namespace: &Namespace,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Vec<SnapshotName>> {
        let dir = self.checkpoint_dir(namespace);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io("read_dir", &dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("read_dir", &dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !keep(file_name) {
                continue;
            }
            if let Some(name) = SnapshotName::from_file_name(file_name) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    pub(crate) fn read_record(
        &self,
        namespace: &Namespace,
        name: SnapshotName,
    ) -> Result<SnapshotRecord> {
        let path = self.checkpoint_dir(namespace).join(name.record_file());
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::not_found("snapshot", namespace.as_str(), name.to_string()))
            }
            Err(e) => return Err(Error::io("read", &path, e)),
        };
        let record: SnapshotRecord = serde_json::from_str(&raw).map_err(|e| Error::Integrity {
            namespace: namespace.to_string(),
            name: name.to_string(),
            check: "metadata record",
            expected: "valid snapshot record".to_string(),
            actual: e.to_string(),
        })?;
        if record.name != name {
            return Err(Error::Integrity {
                namespace: namespace.to_string(),
                name: name.to_string(),
                check: "metadata record name",
                expected: name.to_string(),
                actual: record.name.to_string(),
            });
        }
        Ok(record)
    }
}

/// Remove a file, treating "already gone" as success
pub(crate) fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io("remove", path, e)),
    }
}
