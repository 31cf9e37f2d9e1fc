use std::path::PathBuf;

use thiserror::Error;
use tideline_types::ItemPath;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("cannot scan {path}: {reason}")]
    Scan { path: PathBuf, reason: String },

    #[error("no such item in this session: {0}")]
    UnknownPath(ItemPath),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] tideline_types::TypeError),

    #[error("scan cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(#[from] tideline_store::StoreError),

    #[error("diff error: {0}")]
    Diff(#[from] tideline_diff::DiffError),

    #[error("merge error: {0}")]
    Merge(#[from] tideline_merge::MergeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
