//! Unified error type for all store operations.

use std::path::PathBuf;

/// Things that can go wrong when using the store.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An operation ran before [`init_store`](crate::DocStore::init_store).
    #[error("store has not been initialized")]
    Uninitialized,
    /// The lock sentinel already existed when a write tried to take it.
    #[error("could not obtain lock {}", .path.display())]
    LockUnavailable {
        /// Path of the sentinel that was already present.
        path: PathBuf,
    },
    /// File system problem (open, read, write, delete, rename).
    #[error("i/o error: {0}")]
    Io(String),
    /// Failed to serialize the store or a document.
    #[error("serialization error: {0}")]
    Serialize(String),
    /// Failed to turn a stored document into the requested type.
    #[error("deserialization error: {0}")]
    Deserialize(String),
    /// Bad configuration (retry policy, path, etc.).
    #[error("config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.to_string())
        } else if err.is_syntax() || err.is_eof() || err.is_data() {
            Error::Deserialize(err.to_string())
        } else {
            Error::Serialize(err.to_string())
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
