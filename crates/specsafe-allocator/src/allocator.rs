//! Locked read-increment-write identifier allocation

use crate::scan::highest_existing_id;
use specsafe_artifact::{atomic_write, Error, LockOptions, Namespace, NamespaceLock, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Counter file name inside the namespace directory
pub const COUNTER_FILE: &str = ".id-counter";

/// Lock file guarding the counter
pub const COUNTER_LOCK_FILE: &str = ".id-counter.lock";

/// Allocator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Bounded wait for a single lock attempt
    pub lock: LockOptions,
    /// Extra attempts after a lock timeout
    pub max_retries: u32,
    /// Base delay between attempts, doubled each retry
    pub backoff: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            lock: LockOptions::default(),
            max_retries: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// State of the persisted counter
#[derive(Debug, Clone, PartialEq, Eq)]
enum CounterState {
    Missing,
    Valid(u64),
    Corrupt(String),
}

/// Sequential identifier allocator
///
/// # Guarantees
/// - No two calls return the same value for a namespace, across threads and
///   processes
/// - Values follow the order in which the persisted counter was updated
/// - The increment is persisted (atomic replace) before the value is returned
///
/// # Example
/// ```rust,ignore
/// let allocator = IdAllocator::new("specs");
/// let id = allocator.allocate_next("features")?;
/// let dir = format!("{}-login", format_id(id, 3)); // "001-login"
/// ```
#[derive(Debug, Clone)]
pub struct IdAllocator {
    root: PathBuf,
    config: AllocatorConfig,
}

impl IdAllocator {
    /// Allocator over `<root>/<namespace>/` directories
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, AllocatorConfig::default())
    }

    /// Allocator with explicit tuning
    #[must_use]
    pub fn with_config(root: impl Into<PathBuf>, config: AllocatorConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Allocate the next identifier for a raw namespace key
    ///
    /// # Errors
    /// - `Error::Validation` for a malformed namespace (no side effects)
    /// - `Error::Concurrency` if the lock stays contended through all retries
    /// - `Error::Io` on read/write failure
    pub fn allocate_next(&self, namespace: &str) -> Result<u64> {
        let namespace = Namespace::new(namespace)?;
        self.allocate(&namespace)
    }

    /// Allocate the next identifier for a validated namespace
    ///
    /// # Errors
    /// See [`IdAllocator::allocate_next`].
    pub fn allocate(&self, namespace: &Namespace) -> Result<u64> {
        let id = self.with_lock(namespace, || {
            let current = self.current_value(namespace)?;
            let next = current.checked_add(1).ok_or_else(|| {
                Error::invalid("counter", current.to_string(), "identifier space exhausted")
            })?;
            let path = self.counter_path(namespace);
            atomic_write(&path, format!("{next}\n").as_bytes())?;
            Ok(next)
        })?;
        tracing::info!(namespace = %namespace, id, "identifier allocated");
        Ok(id)
    }

    /// Highest identifier issued so far, without allocating
    ///
    /// # Errors
    /// Same as [`IdAllocator::allocate`].
    pub fn peek(&self, namespace: &Namespace) -> Result<u64> {
        self.with_lock(namespace, || self.current_value(namespace))
    }

    /// Path of the persisted counter
    #[must_use]
    pub fn counter_path(&self, namespace: &Namespace) -> PathBuf {
        namespace.dir(&self.root).join(COUNTER_FILE)
    }

    fn lock_path(&self, namespace: &Namespace) -> PathBuf {
        namespace.dir(&self.root).join(COUNTER_LOCK_FILE)
    }

    /// Run `op` under the namespace lock, retrying lock timeouts with backoff
    fn with_lock<T>(&self, namespace: &Namespace, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let lock_path = self.lock_path(namespace);
        let mut attempt = 0;
        loop {
            match NamespaceLock::acquire(namespace, &lock_path, self.config.lock) {
                Ok(_guard) => return op(),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.backoff.saturating_mul(1 << attempt.min(16));
                    attempt += 1;
                    tracing::warn!(
                        namespace = %namespace,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "counter lock contended, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Current highest identifier; caller must hold the lock
    fn current_value(&self, namespace: &Namespace) -> Result<u64> {
        let path = self.counter_path(namespace);
        match read_counter(&path)? {
            CounterState::Valid(value) => Ok(value),
            CounterState::Missing => {
                let scanned = highest_existing_id(&namespace.dir(&self.root))?;
                tracing::debug!(namespace = %namespace, scanned, "bootstrapping counter from directory scan");
                Ok(scanned)
            }
            CounterState::Corrupt(reason) => {
                let scanned = highest_existing_id(&namespace.dir(&self.root))?;
                tracing::warn!(
                    namespace = %namespace,
                    counter = %path.display(),
                    %reason,
                    scanned,
                    "counter unreadable, recovering from directory scan"
                );
                Ok(scanned)
            }
        }
    }
}

fn read_counter(path: &Path) -> Result<CounterState> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CounterState::Missing),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            return Ok(CounterState::Corrupt(e.to_string()))
        }
        Err(e) => return Err(Error::io("read", path, e)),
    };
    let Ok(text) = std::str::from_utf8(&raw) else {
        return Ok(CounterState::Corrupt("not utf-8".to_string()));
    };
    Ok(match text.trim().parse::<u64>() {
        Ok(value) => CounterState::Valid(value),
        Err(e) => CounterState::Corrupt(format!("{e}: {:?}", text.trim())),
    })
}

/// Zero-padded identifier (`format_id(7, 3) == "007"`)
#[must_use]
pub fn format_id(id: u64, width: usize) -> String {
    format!("{id:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use specsafe_artifact::ErrorKind;

    fn ns(raw: &str) -> Namespace {
        Namespace::new(raw).unwrap()
    }

    #[test]
    fn fresh_namespace_starts_at_one() {
        let root = tempfile::tempdir().unwrap();
        let allocator = IdAllocator::new(root.path());
        assert_eq!(allocator.allocate_next("specs").unwrap(), 1);
        assert_eq!(allocator.allocate_next("specs").unwrap(), 2);
        assert_eq!(allocator.peek(&ns("specs")).unwrap(), 2);

        let persisted = fs::read_to_string(allocator.counter_path(&ns("specs"))).unwrap();
        assert_eq!(persisted, "2\n");
    }

    #[test]
    fn namespaces_are_independent() {
        let root = tempfile::tempdir().unwrap();
        let allocator = IdAllocator::new(root.path());
        assert_eq!(allocator.allocate_next("a").unwrap(), 1);
        assert_eq!(allocator.allocate_next("b").unwrap(), 1);
        assert_eq!(allocator.allocate_next("a").unwrap(), 2);
    }

    #[test]
    fn bootstraps_from_existing_items() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("specs");
        fs::create_dir_all(dir.join("003-login")).unwrap();
        fs::create_dir_all(dir.join("011-billing")).unwrap();

        let allocator = IdAllocator::new(root.path());
        assert_eq!(allocator.allocate_next("specs").unwrap(), 12);
    }

    #[test]
    fn corrupt_counter_recovers_from_scan() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("specs");
        fs::create_dir_all(dir.join("005-search")).unwrap();
        fs::write(dir.join(COUNTER_FILE), "not a number").unwrap();

        let allocator = IdAllocator::new(root.path());
        assert_eq!(allocator.allocate_next("specs").unwrap(), 6);
        assert_eq!(allocator.allocate_next("specs").unwrap(), 7);
    }

    #[test]
    fn counter_wins_over_scan_in_steady_state() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("specs");
        fs::create_dir_all(dir.join("002-x")).unwrap();
        fs::write(dir.join(COUNTER_FILE), "40\n").unwrap();

        let allocator = IdAllocator::new(root.path());
        assert_eq!(allocator.allocate_next("specs").unwrap(), 41);
    }

    #[test]
    fn invalid_namespace_has_no_side_effects() {
        let root = tempfile::tempdir().unwrap();
        let allocator = IdAllocator::new(root.path());
        let err = allocator.allocate_next("../escape").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn contended_lock_surfaces_after_retries() {
        let root = tempfile::tempdir().unwrap();
        let config = AllocatorConfig {
            lock: LockOptions {
                timeout: Duration::from_millis(20),
                poll_interval: Duration::from_millis(5),
            },
            max_retries: 2,
            backoff: Duration::from_millis(1),
        };
        let allocator = IdAllocator::with_config(root.path(), config);
        let namespace = ns("specs");
        let _held = NamespaceLock::acquire(
            &namespace,
            &namespace.dir(root.path()).join(COUNTER_LOCK_FILE),
            LockOptions::default(),
        )
        .unwrap();

        let err = allocator.allocate(&namespace).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Concurrency);
        assert!(!allocator.counter_path(&namespace).exists());
    }

    #[test]
    fn overflow_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("specs");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(COUNTER_FILE), u64::MAX.to_string()).unwrap();

        let err = IdAllocator::new(root.path()).allocate_next("specs").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn format_id_pads() {
        assert_eq!(format_id(7, 3), "007");
        assert_eq!(format_id(1234, 3), "1234");
    }
}
