//! Error types for the merge crate.
//!
//! Content conflicts and unreadable base/remote content are not errors: they
//! are reported per item through [`MergeStatus`](crate::MergeStatus). Errors
//! here abort the whole batch.

/// Errors that abort a merge batch.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The local store failed to read or mutate an item.
    #[error("store error: {0}")]
    Store(#[from] tideline_store::StoreError),

    /// Reclassification failed.
    #[error("diff error: {0}")]
    Diff(#[from] tideline_diff::DiffError),

    /// The content merger failed outright (not a content conflict).
    #[error("content merger failed: {0}")]
    Merger(String),

    /// The caller cancelled the batch between items.
    #[error("merge cancelled")]
    Cancelled,
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
