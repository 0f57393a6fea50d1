//! Pluggable filesystem.
//!
//! Implement [`FileSystem`] to point a store at something other than the real
//! disk. [`MemoryFs`] is provided for tests.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The handful of file operations a [`DocStore`](crate::DocStore) needs.
///
/// Every call is a complete open/act/close cycle; implementations must not keep
/// handles around between calls.
pub trait FileSystem: Send + Sync {
    /// Read the whole file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Create the file if needed, truncate it, and write `bytes`.
    fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()>;

    /// Create the file with `bytes` only if nothing exists at `path`.
    ///
    /// Returns `Ok(false)` when the path is already taken. This is the single
    /// primitive the lock sentinel relies on, so it must be atomic.
    fn create_new(&self, path: &Path, bytes: &[u8]) -> std::io::Result<bool>;

    /// Delete the file. Missing files are an error.
    fn remove_file(&self, path: &Path) -> std::io::Result<()>;

    /// Move `from` over `to`, replacing whatever was there.
    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// `true` if something exists at `path`.
    fn exists(&self, path: &Path) -> bool;
}

// ---- OsFs --------------------------------------------------------------------

/// The real filesystem, via `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn create_new(&self, path: &Path, bytes: &[u8]) -> std::io::Result<bool> {
        use std::io::Write;

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(mut file) => {
                file.write_all(bytes)?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        std::fs::rename(from, to)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

// ---- MemoryFs ----------------------------------------------------------------

/// In-memory filesystem. Clones share the same files, so a test can keep one
/// copy around and look at what the store wrote through the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryFs {
    /// Empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw contents of `path`, if present.
    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.read().get(path.as_ref()).cloned()
    }

    /// Put a file in place directly, bypassing any store logic.
    pub fn insert(&self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) {
        self.files
            .write()
            .insert(path.as_ref().to_path_buf(), bytes.into());
    }

    /// Number of files currently present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// `true` when no files exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn not_found(path: &Path) -> std::io::Error {
    std::io::Error::new(
        ErrorKind::NotFound,
        format!("no such file: {}", path.display()),
    )
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        let bytes = self
            .files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))?;
        String::from_utf8(bytes).map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        self.files.write().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn create_new(&self, path: &Path, bytes: &[u8]) -> std::io::Result<bool> {
        let mut files = self.files.write();
        if files.contains_key(path) {
            return Ok(false);
        }
        files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(true)
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        self.files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        let mut files = self.files.write();
        let bytes = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), bytes);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }
}
