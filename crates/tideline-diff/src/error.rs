//! Error types for the diff crate.

use tideline_types::ItemPath;

/// Errors that can occur while classifying or indexing items.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Classification was asked about an item that exists on no side.
    #[error("cannot classify {path}: {reason}")]
    ClassificationInvariant { path: ItemPath, reason: &'static str },

    /// An integer encoding of a sync kind is not a valid combination.
    #[error("invalid sync kind bits: {0:#x}")]
    InvalidKindBits(u32),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] tideline_store::StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
