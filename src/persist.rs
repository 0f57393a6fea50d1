//! Whole-file load and lock-guarded commit.
//!
//! Every read parses the entire file and every write replaces it. There is no
//! cache between calls.

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::lock::Lock;
use crate::serializer::Serializer;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Everything in one store file: key → ordered documents.
///
/// On disk this is a single JSON object whose properties are all arrays.
/// Keys and document fields keep the order they were read or added in, so a
/// write leaves untouched documents byte-for-byte as they were.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    keys: IndexMap<String, Vec<Value>>,
}

impl Store {
    /// Empty store, `{}` on disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Vec<Value>> {
        self.keys.get(key)
    }

    /// Mutable documents under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Vec<Value>> {
        self.keys.get_mut(key)
    }

    /// Documents under `key`, creating an empty sequence first if needed.
    pub fn entry_or_default(&mut self, key: &str) -> &mut Vec<Value> {
        self.keys.entry(key.to_owned()).or_default()
    }

    /// Replace the sequence under `key`.
    pub fn set(&mut self, key: &str, docs: Vec<Value>) {
        self.keys.insert(key.to_owned(), docs);
    }

    /// Drop `key` entirely, returning its documents. The other keys keep
    /// their order.
    pub fn remove(&mut self, key: &str) -> Option<Vec<Value>> {
        self.keys.shift_remove(key)
    }

    /// `true` if `key` is present (even with no documents).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// All keys, in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` when there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// How a commit lands on disk.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Truncate the store file and write it in place. A reader racing the
    /// write can see an empty or partial file.
    #[default]
    Truncate,
    /// Write `<path>.tmp` and rename it over the store file, so readers see
    /// either the old or the new contents.
    Atomic,
}

/// Read and parse the file at `path`.
///
/// A missing or unreadable file is an error. An empty or unparsable one is
/// not: it comes back as an empty store, and the next commit will overwrite
/// whatever was there.
pub fn load<F, S>(fs: &F, path: &Path, serializer: &S) -> Result<Store>
where
    F: FileSystem + ?Sized,
    S: Serializer,
{
    let text = fs.read_to_string(path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "could not read store file");
        Error::Io(e.to_string())
    })?;
    if text.trim().is_empty() {
        debug!(path = %path.display(), "store file is empty");
        return Ok(Store::new());
    }
    match serializer.deserialize(text.as_bytes()) {
        Ok(store) => Ok(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "store file is malformed, treating as empty");
            Ok(Store::new())
        }
    }
}

/// Take the lock, write `store` to `path`, release the lock.
///
/// Fails with [`Error::LockUnavailable`] if the lock is refused; nothing is
/// written in that case. If the write fails the lock is still released before
/// the error is returned.
pub fn commit<F, S>(
    fs: &F,
    lock: &dyn Lock,
    lock_path: &Path,
    path: &Path,
    store: &Store,
    serializer: &S,
    mode: CommitMode,
) -> Result<()>
where
    F: FileSystem + ?Sized,
    S: Serializer,
{
    let bytes = serializer.serialize(store)?;

    if !lock.try_acquire()? {
        return Err(Error::LockUnavailable {
            path: lock_path.to_path_buf(),
        });
    }

    let written = match mode {
        CommitMode::Truncate => fs.write(path, &bytes).map_err(Error::from),
        CommitMode::Atomic => atomic_write(fs, path, &bytes),
    };
    let released = lock.release();

    if let Err(e) = &written {
        warn!(path = %path.display(), error = %e, "could not write store file");
    }
    written?;
    released?;
    trace!(path = %path.display(), bytes = bytes.len(), keys = store.len(), "store committed");
    Ok(())
}

/// `<path>.tmp`, next to the store file.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `bytes` to `<path>.tmp` and then rename over `path`.
pub fn atomic_write<F: FileSystem + ?Sized>(fs: &F, path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path_for(path);
    fs.write(&tmp, bytes)?;
    fs.rename(&tmp, path)?;
    Ok(())
}
