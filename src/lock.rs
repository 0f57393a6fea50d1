//! Lock-file mutual exclusion and the opt-in retry wrapper.
//!
//! A lock is held while `<store>.lock` exists. Acquiring is one create-only
//! attempt; nothing waits unless you wrap the lock in a [`RetryingLock`].
//!
//! If the process dies between acquire and release the sentinel stays behind
//! and every later writer is refused until someone deletes it (see
//! [`DocStore::break_lock`](crate::DocStore::break_lock)).

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Exclusive write access to a store file.
pub trait Lock {
    /// One attempt. `Ok(true)` if we now hold the lock, `Ok(false)` if someone
    /// else does.
    fn try_acquire(&self) -> Result<bool>;

    /// Give the lock back. Releasing a lock that isn't held is an error.
    fn release(&self) -> Result<()>;
}

/// `<path>.lock`, appended to the full file name (`db.json` → `db.json.lock`).
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

// ---- FileLock ----------------------------------------------------------------

/// Zero-byte sentinel file next to the store.
#[derive(Debug)]
pub struct FileLock<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    path: PathBuf,
}

impl<'a, F: FileSystem + ?Sized> FileLock<'a, F> {
    /// Lock guarding the store at `store_path`.
    pub fn new(fs: &'a F, store_path: &Path) -> Self {
        Self {
            fs,
            path: lock_path_for(store_path),
        }
    }

    /// Path of the sentinel file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` while the sentinel exists, whoever created it.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.fs.exists(&self.path)
    }
}

impl<F: FileSystem + ?Sized> Lock for FileLock<'_, F> {
    fn try_acquire(&self) -> Result<bool> {
        let acquired = self.fs.create_new(&self.path, b"")?;
        if acquired {
            trace!(path = %self.path.display(), "lock acquired");
        } else {
            debug!(path = %self.path.display(), "lock already held");
        }
        Ok(acquired)
    }

    fn release(&self) -> Result<()> {
        self.fs.remove_file(&self.path)?;
        trace!(path = %self.path.display(), "lock released");
        Ok(())
    }
}

// ---- retry -------------------------------------------------------------------

/// How many times to try for a lock before giving up.
///
/// The default is a single attempt with no waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be at least 1.
    pub attempts: u32,
    /// Sleep between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// One attempt, no waiting.
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// `attempts` tries with a fixed `backoff` sleep in between.
    pub const fn fixed(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// `true` for the default single-attempt behavior.
    #[must_use]
    pub fn is_once(&self) -> bool {
        self.attempts == 1
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(Error::Config("retry policy needs at least one attempt".into()));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// Wraps any [`Lock`] and keeps trying according to a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryingLock<L> {
    inner: L,
    policy: RetryPolicy,
}

impl<L: Lock> RetryingLock<L> {
    /// Wrap `inner`.
    pub fn new(inner: L, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped lock.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: Lock> Lock for RetryingLock<L> {
    fn try_acquire(&self) -> Result<bool> {
        for attempt in 1..=self.policy.attempts {
            if self.inner.try_acquire()? {
                return Ok(true);
            }
            if attempt < self.policy.attempts {
                debug!(attempt, backoff = ?self.policy.backoff, "lock busy, retrying");
                std::thread::sleep(self.policy.backoff);
            }
        }
        Ok(false)
    }

    fn release(&self) -> Result<()> {
        self.inner.release()
    }
}
