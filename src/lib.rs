//! File-backed JSON document store.
//!
//! One JSON file maps string keys to ordered lists of documents. Every call
//! re-reads the whole file; every mutation writes it back while holding a
//! `<file>.lock` sentinel, so a second writer is refused instead of
//! clobbering the first.
//!
//! ```rust,no_run
//! use json_docstore::{DocStore, Update};
//! use serde_json::json;
//!
//! let db = DocStore::new("db.json");
//! db.init_store().unwrap();
//! db.add_many("fruit", vec![json!({"n": "apple"}), json!({"n": "pear"})]).unwrap();
//! db.update_where("fruit", json!({"n": "plum"}), |f| f["n"] == "pear").unwrap();
//! db.remove_where("fruit", |f| f["n"] == "apple").unwrap();
//! assert_eq!(db.get("fruit").unwrap(), Some(vec![json!({"n": "plum"})]));
//! ```
//!
//! **Writes are guarded, reads are not.** A reader in another process can see
//! a half-written file unless the store uses [`CommitMode::Atomic`]. A
//! malformed file reads as an empty store and is overwritten by the next
//! write.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fs;
pub mod lock;
pub mod persist;
pub mod serializer;
pub mod store;

pub use error::{Error, Result};
pub use fs::{FileSystem, MemoryFs, OsFs};
pub use lock::{FileLock, Lock, RetryPolicy, RetryingLock};
pub use persist::{CommitMode, Store};
pub use store::{DocStore, DocStoreBuilder, Update};
