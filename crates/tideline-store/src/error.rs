use std::path::PathBuf;

use tideline_types::{ItemPath, TypeError};

/// Errors from content sources and mutable stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The item does not exist in the store.
    #[error("item not found: {0}")]
    NotFound(ItemPath),

    /// A file cannot be created because its container does not exist.
    #[error("parent container missing for {0}")]
    MissingParent(ItemPath),

    /// A container was requested where a file exists.
    #[error("not a container: {0}")]
    NotAContainer(ItemPath),

    /// File content was requested from a container.
    #[error("not a file: {0}")]
    NotAFile(ItemPath),

    /// I/O error from the underlying storage backend.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scratch file used to stage new content could not be created.
    #[error("cannot stage content for {path}: {source}")]
    Staging {
        path: ItemPath,
        #[source]
        source: std::io::Error,
    },

    /// A path argument could not be parsed.
    #[error(transparent)]
    InvalidPath(#[from] TypeError),

    /// A content source cannot produce its bytes.
    #[error("content unavailable for revision {revision}: {reason}")]
    Unavailable { revision: String, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
