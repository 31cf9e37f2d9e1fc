//! Merge engine for Tideline.
//!
//! Takes classified items from a diff tree and reconciles the local store
//! with the remote side, one batch at a time.
//!
//! - [`plan`] -- what to do with one item (skip, replace, mark, merge)
//! - [`MergeEngine`] -- applies plans under a combined scope and keeps the
//!   tree current
//! - [`ContentMerger`] / [`LineMerger`] -- pluggable three-way content merge
//! - [`MergeStatus`] -- ok, or the list of items left in conflict
//!
//! A content conflict never aborts a batch. A store failure always does.

pub mod engine;
pub mod error;
pub mod merger;
pub mod options;
pub mod plan;
pub mod status;

pub use engine::MergeEngine;
pub use error::{MergeError, MergeResult};
pub use merger::{ConflictRegion, ContentMerger, LineMerger, MergeOutput};
pub use options::MergeOptions;
pub use plan::{plan, ConflictReason, MergeAction, SkipReason};
pub use status::MergeStatus;
