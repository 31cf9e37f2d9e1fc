//! Foundation types for Tideline.
//!
//! This crate provides the identity and bookkeeping types shared by every
//! other Tideline crate.
//!
//! # Key Types
//!
//! - [`ItemPath`] -- Normalized workspace-relative identity of a synchronized item
//! - [`ItemKind`] -- Whether an item is a file or a container
//! - [`ContentId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`ProgressMonitor`] -- Progress reporting and coarse-grained cancellation
//! - [`CancellationToken`] -- Shareable monitor that can be cancelled from another thread

pub mod error;
pub mod object;
pub mod path;
pub mod progress;

pub use error::TypeError;
pub use object::ContentId;
pub use path::{ItemKind, ItemPath};
pub use progress::{CancellationToken, NullProgress, ProgressMonitor};
