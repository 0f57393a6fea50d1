//! Store handle, builder, and the document operations.

use crate::error::{Error, Result};
use crate::fs::{FileSystem, OsFs};
use crate::lock::{lock_path_for, FileLock, Lock, RetryPolicy, RetryingLock};
use crate::persist::{commit, load, CommitMode, Store};
use crate::serializer::JsonSerializer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// What [`update`](DocStore::update) puts in place of a matching document.
pub enum Update<'a> {
    /// Every match becomes a copy of this value.
    Replace(Value),
    /// Every match becomes whatever the closure returns for it.
    Transform(Box<dyn FnMut(&Value) -> Value + 'a>),
}

impl<'a> Update<'a> {
    /// Replace matches with a constant.
    pub fn replace(value: impl Into<Value>) -> Self {
        Update::Replace(value.into())
    }

    /// Replace matches with `f(current)`.
    pub fn with<G>(f: G) -> Self
    where
        G: FnMut(&Value) -> Value + 'a,
    {
        Update::Transform(Box::new(f))
    }

    fn apply(&mut self, current: &Value) -> Value {
        match self {
            Update::Replace(value) => value.clone(),
            Update::Transform(f) => f(current),
        }
    }
}

impl From<Value> for Update<'_> {
    fn from(value: Value) -> Self {
        Update::Replace(value)
    }
}

impl std::fmt::Debug for Update<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Update::Replace(v) => f.debug_tuple("Replace").field(v).finish(),
            Update::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// A JSON file holding named, ordered lists of documents.
///
/// The handle only knows the path; every call reads the whole file, and every
/// mutating call writes it back under the lock file. Call
/// [`init_store`](Self::init_store) once before anything else.
///
/// ```rust,no_run
/// use json_docstore::DocStore;
/// use serde_json::json;
///
/// let db = DocStore::new("db.json");
/// db.init_store().unwrap();
/// db.add("users", json!({"name": "ada"})).unwrap();
/// let ada = db.first_where("users", |u| u["name"] == "ada").unwrap();
/// assert!(ada.is_some());
/// ```
pub struct DocStore<F = OsFs> {
    path: PathBuf,
    lock_path: PathBuf,
    fs: F,
    serializer: JsonSerializer,
    commit_mode: CommitMode,
    retry: RetryPolicy,
    initialized: AtomicBool,
}

impl DocStore<OsFs> {
    /// Handle for the file at `path` on the real filesystem. Does no I/O.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from_parts(
            path.as_ref().to_path_buf(),
            OsFs,
            JsonSerializer::default(),
            CommitMode::default(),
            RetryPolicy::default(),
        )
    }

    /// Start configuring a store. Call [`.build()`](DocStoreBuilder::build)
    /// or [`.open()`](DocStoreBuilder::open) when ready.
    pub fn builder(path: impl AsRef<Path>) -> DocStoreBuilder<OsFs> {
        DocStoreBuilder::new(path)
    }
}

impl<F: FileSystem> DocStore<F> {
    fn from_parts(
        path: PathBuf,
        fs: F,
        serializer: JsonSerializer,
        commit_mode: CommitMode,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            lock_path: lock_path_for(&path),
            path,
            fs,
            serializer,
            commit_mode,
            retry,
            initialized: AtomicBool::new(false),
        }
    }

    // ---- lifecycle ----

    /// Create the backing file as `{}` unless it already exists, then mark
    /// the handle ready. Calling it again is harmless: an existing file is
    /// never overwritten.
    pub fn init_store(&self) -> Result<()> {
        self.initialized.store(false, Ordering::Release);
        let created = self.fs.create_new(&self.path, b"{}")?;
        if created {
            debug!(path = %self.path.display(), "created store file");
        } else {
            debug!(path = %self.path.display(), "store file already exists");
        }
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// `true` once [`init_store`](Self::init_store) has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Path to the backing JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the lock sentinel.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// The filesystem this store talks to.
    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Delete a leftover lock sentinel. Returns `false` if there was none.
    ///
    /// Only for recovering after a writer died holding the lock. Nothing calls
    /// this automatically.
    pub fn break_lock(&self) -> Result<bool> {
        if !self.fs.exists(&self.lock_path) {
            return Ok(false);
        }
        self.fs.remove_file(&self.lock_path)?;
        warn!(path = %self.lock_path.display(), "lock sentinel removed by hand");
        Ok(true)
    }

    // ---- reads ----

    /// All documents under `key`, or `None` if the key doesn't exist.
    pub fn get(&self, key: &str) -> Result<Option<Vec<Value>>> {
        let mut store = self.read()?;
        Ok(store.remove(key))
    }

    /// Documents under `key` for which `filter` holds, in stored order.
    /// `None` if the key doesn't exist.
    pub fn get_where<P>(&self, key: &str, filter: P) -> Result<Option<Vec<Value>>>
    where
        P: Fn(&Value) -> bool,
    {
        let mut store = self.read()?;
        Ok(store
            .remove(key)
            .map(|docs| docs.into_iter().filter(|d| filter(d)).collect()))
    }

    /// First document under `key`.
    pub fn first(&self, key: &str) -> Result<Option<Value>> {
        let mut store = self.read()?;
        Ok(store.remove(key).and_then(|docs| docs.into_iter().next()))
    }

    /// First document under `key` for which `filter` holds.
    pub fn first_where<P>(&self, key: &str, filter: P) -> Result<Option<Value>>
    where
        P: Fn(&Value) -> bool,
    {
        let mut store = self.read()?;
        Ok(store
            .remove(key)
            .and_then(|docs| docs.into_iter().find(|d| filter(d))))
    }

    /// [`get`](Self::get), converting each document to `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        self.get(key)?
            .map(|docs| {
                docs.into_iter()
                    .map(|d| serde_json::from_value(d).map_err(Error::from))
                    .collect()
            })
            .transpose()
    }

    /// [`first`](Self::first), converting the document to `T`.
    pub fn first_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.first(key)?
            .map(|d| serde_json::from_value(d).map_err(Error::from))
            .transpose()
    }

    /// Every key in the store, in file order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().map(str::to_owned).collect())
    }

    /// `true` if `key` exists, even with no documents.
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    // ---- writes ----

    /// Append one document to `key`, creating the key if needed.
    pub fn add(&self, key: &str, value: Value) -> Result<()> {
        let mut store = self.read()?;
        store.entry_or_default(key).push(value);
        self.write(&store)
    }

    /// [`add`](Self::add) for anything serializable.
    pub fn add_typed<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| Error::Serialize(e.to_string()))?;
        self.add(key, value)
    }

    /// Append a batch to `key` with a single read and a single write.
    pub fn add_many<I>(&self, key: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut store = self.read()?;
        store.entry_or_default(key).extend(values);
        self.write(&store)
    }

    /// Apply `value` to every document under `key`. Returns how many were
    /// replaced. A missing key is left alone and nothing is written.
    pub fn update<'a>(&self, key: &str, value: impl Into<Update<'a>>) -> Result<usize> {
        self.update_matching(key, value.into(), None)
    }

    /// Apply `value` to the documents under `key` for which `filter` holds.
    /// The rest are kept as they are.
    pub fn update_where<'a, P>(
        &self,
        key: &str,
        value: impl Into<Update<'a>>,
        filter: P,
    ) -> Result<usize>
    where
        P: Fn(&Value) -> bool,
    {
        let filter: &dyn Fn(&Value) -> bool = &filter;
        self.update_matching(key, value.into(), Some(filter))
    }

    /// Empty `key`'s sequence. The key itself stays (or is created empty).
    /// Returns how many documents were dropped.
    pub fn remove(&self, key: &str) -> Result<usize> {
        let mut store = self.read()?;
        let removed = store.get(key).map_or(0, Vec::len);
        store.set(key, Vec::new());
        self.write(&store)?;
        Ok(removed)
    }

    /// Drop the documents under `key` for which `filter` holds.
    /// Returns how many were dropped. A missing key is left alone and nothing
    /// is written.
    pub fn remove_where<P>(&self, key: &str, filter: P) -> Result<usize>
    where
        P: Fn(&Value) -> bool,
    {
        let mut store = self.read()?;
        let Some(docs) = store.get_mut(key) else {
            debug!(key, "filtered remove on missing key");
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter(d));
        let removed = before - docs.len();
        self.write(&store)?;
        Ok(removed)
    }

    /// Delete `key` and its documents from the file. Returns whether it was
    /// there.
    pub fn remove_key(&self, key: &str) -> Result<bool> {
        let mut store = self.read()?;
        let existed = store.remove(key).is_some();
        self.write(&store)?;
        Ok(existed)
    }

    // ---- internal ----

    fn update_matching(
        &self,
        key: &str,
        mut value: Update<'_>,
        filter: Option<&dyn Fn(&Value) -> bool>,
    ) -> Result<usize> {
        let mut store = self.read()?;
        let Some(docs) = store.get_mut(key) else {
            debug!(key, "update on missing key");
            return Ok(0);
        };
        let mut replaced = 0;
        for doc in docs.iter_mut() {
            if filter.map_or(true, |f| f(&*doc)) {
                *doc = value.apply(&*doc);
                replaced += 1;
            }
        }
        self.write(&store)?;
        Ok(replaced)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::Uninitialized)
        }
    }

    fn read(&self) -> Result<Store> {
        self.ensure_initialized()?;
        load(&self.fs, &self.path, &self.serializer)
    }

    fn write(&self, store: &Store) -> Result<()> {
        self.ensure_initialized()?;
        let lock = FileLock::new(&self.fs, &self.path);
        if self.retry.is_once() {
            self.commit_with(&lock, store)
        } else {
            self.commit_with(&RetryingLock::new(lock, self.retry), store)
        }
    }

    fn commit_with(&self, lock: &dyn Lock, store: &Store) -> Result<()> {
        commit(
            &self.fs,
            lock,
            &self.lock_path,
            &self.path,
            store,
            &self.serializer,
            self.commit_mode,
        )
    }
}

impl<F> std::fmt::Debug for DocStore<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocStore")
            .field("path", &self.path)
            .field("commit_mode", &self.commit_mode)
            .field("retry", &self.retry)
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures a [`DocStore`].
///
/// ```rust,no_run
/// use json_docstore::{CommitMode, DocStore, RetryPolicy};
/// use std::time::Duration;
///
/// let db = DocStore::builder("db.json")
///     .commit_mode(CommitMode::Atomic)
///     .lock_retry(RetryPolicy::fixed(5, Duration::from_millis(20)))
///     .open()
///     .unwrap();
/// ```
pub struct DocStoreBuilder<F> {
    path: PathBuf,
    fs: F,
    pretty: bool,
    commit_mode: CommitMode,
    retry: RetryPolicy,
}

impl DocStoreBuilder<OsFs> {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fs: OsFs,
            pretty: true,
            commit_mode: CommitMode::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl<F: FileSystem> DocStoreBuilder<F> {
    /// Use a different filesystem (e.g. [`MemoryFs`](crate::fs::MemoryFs)).
    pub fn filesystem<G: FileSystem>(self, fs: G) -> DocStoreBuilder<G> {
        DocStoreBuilder {
            path: self.path,
            fs,
            pretty: self.pretty,
            commit_mode: self.commit_mode,
            retry: self.retry,
        }
    }

    /// Indent the file with two spaces (default) or write it on one line.
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Set how writes land on disk (default: [`CommitMode::Truncate`]).
    pub fn commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }

    /// Retry lock acquisition instead of failing on the first refusal
    /// (default: [`RetryPolicy::once`]).
    pub fn lock_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Create the handle without touching the filesystem.
    pub fn build(self) -> Result<DocStore<F>> {
        self.retry.validate()?;
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("store path is empty".into()));
        }
        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::compact()
        };
        Ok(DocStore::from_parts(
            self.path,
            self.fs,
            serializer,
            self.commit_mode,
            self.retry,
        ))
    }

    /// [`build`](Self::build) and then [`init_store`](DocStore::init_store).
    pub fn open(self) -> Result<DocStore<F>> {
        let store = self.build()?;
        store.init_store()?;
        Ok(store)
    }
}

impl<F> std::fmt::Debug for DocStoreBuilder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocStoreBuilder")
            .field("path", &self.path)
            .field("pretty", &self.pretty)
            .field("commit_mode", &self.commit_mode)
            .field("retry", &self.retry)
            .finish()
    }
}
