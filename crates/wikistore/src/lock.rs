//! # Named Interprocess Locks
//!
//! Writers that must not interleave (two saves committing into the same
//! repository, two account updates rewriting `users.json`) serialize through an
//! advisory lock on a zero-byte file. The lock is visible to every process and
//! thread that opens the same path, so independent server workers sharing a
//! content directory are mutually excluded.
//!
//! A [`NamedLock`] is a handle carrying the lock file path and a wait bound.
//! Stores receive it at construction time; there is no global registry.
//!
//! ## Waiting
//!
//! - `timeout: Some(d)` polls with exponential backoff and fails with
//!   [`WikiError::LockTimeout`] after `d`.
//! - `timeout: None` blocks until the lock is free. One wedged holder then
//!   stalls every writer, so prefer a bound.
//!
//! Acquisition order is not fair: whichever waiter polls first after release
//! wins.

use crate::error::{Result, WikiError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct NamedLock {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl NamedLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: Some(DEFAULT_LOCK_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        Ok(file)
    }

    /// Block until the lock is held, or the timeout expires.
    pub fn acquire(&self) -> Result<LockGuard> {
        let file = self.open()?;

        let Some(timeout) = self.timeout else {
            FileExt::lock_exclusive(&file)?;
            debug!(lock = %self.path.display(), "lock acquired");
            return Ok(LockGuard { file });
        };

        let start = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    debug!(
                        lock = %self.path.display(),
                        waited_ms = start.elapsed().as_millis() as u64,
                        "lock acquired"
                    );
                    return Ok(LockGuard { file });
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    let waited = start.elapsed();
                    if waited >= timeout {
                        return Err(WikiError::LockTimeout {
                            path: self.path.clone(),
                            waited,
                        });
                    }
                    trace!(lock = %self.path.display(), "lock busy, backing off");
                    std::thread::sleep(backoff.min(timeout - waited));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run `f` while holding the lock. The lock is released when `f` returns,
    /// whether it succeeded or not.
    pub fn with<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.acquire()?;
        f()
    }
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well.
        let _ = FileExt::unlock(&self.file);
    }
}
