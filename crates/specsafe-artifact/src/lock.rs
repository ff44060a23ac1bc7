//! Namespace-scoped exclusive locks
//!
//! Cross-process mutual exclusion via OS advisory locks (`flock` on Unix,
//! `LockFileEx` on Windows). A lock is held on a dedicated sidecar file that
//! is never renamed or replaced, so the protected data file can itself be
//! updated by atomic rename without escaping the lock.

use crate::error::{Error, Result};
use crate::namespace::Namespace;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Bounded-wait settings for lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Give up after waiting this long
    pub timeout: Duration,
    /// Sleep between attempts
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Held exclusive lock; released on drop
#[derive(Debug)]
pub struct NamespaceLock {
    file: File,
    path: PathBuf,
}

impl NamespaceLock {
    /// Block (bounded) until the lock file at `path` is exclusively held
    ///
    /// # Errors
    /// - `Error::Concurrency` if the lock is still contended after
    ///   `options.timeout`
    /// - `Error::Io` if the lock file cannot be opened
    pub fn acquire(namespace: &Namespace, path: &Path, options: LockOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create_dir", parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io("open_lock", path, e))?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!(
                        namespace = %namespace,
                        lock = %path.display(),
                        waited_ms = started.elapsed().as_millis() as u64,
                        "lock acquired"
                    );
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= options.timeout {
                        return Err(Error::Concurrency {
                            namespace: namespace.to_string(),
                            path: path.to_path_buf(),
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    thread::sleep(options.poll_interval);
                }
                Err(e) => return Err(Error::io("lock", path, e)),
            }
        }
    }

    /// Path of the lock file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NamespaceLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ns() -> Namespace {
        Namespace::new("specs").unwrap()
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");
        let options = LockOptions {
            timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
        };

        let held = NamespaceLock::acquire(&ns(), &path, options).unwrap();
        let err = NamespaceLock::acquire(&ns(), &path, options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Concurrency);
        assert!(err.to_string().contains("specs"));

        drop(held);
        assert!(NamespaceLock::acquire(&ns(), &path, options).is_ok());
    }

    #[test]
    fn waiter_acquires_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".lock");
        let held = NamespaceLock::acquire(&ns(), &path, LockOptions::default()).unwrap();
        assert_eq!(held.path(), path.as_path());

        let waiter_path = path.clone();
        let waiter = thread::spawn(move || {
            NamespaceLock::acquire(&ns(), &waiter_path, LockOptions::default()).map(|_| ())
        });
        thread::sleep(Duration::from_millis(30));
        drop(held);
        assert!(waiter.join().unwrap().is_ok());
    }
}
