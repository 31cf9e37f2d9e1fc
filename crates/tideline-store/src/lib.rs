//! Content sources and mutable item stores for Tideline.
//!
//! A synchronization compares three views of every item: the local copy, the
//! common ancestor (base), and the remote copy. This crate provides both kinds
//! of storage those views live in:
//!
//! - [`ContentSource`] / [`Handle`] -- immutable revisions (base and remote
//!   snapshots, or a frozen view of local content)
//! - [`MutableStore`] -- the local tree that merging writes into
//!
//! # Storage Backends
//!
//! - [`InMemoryStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FsStore`] -- a directory on disk, with staged writes
//!
//! # Design Rules
//!
//! 1. Handles are immutable once created; equal revisions mean equal snapshots.
//! 2. A single item write is all-or-nothing.
//! 3. Overlapping scopes are serialized by [`ScopeLocks`]; disjoint ones are not.
//! 4. A scope is acquired whole, never piecemeal.
//! 5. Mutations are not rolled back when a later one fails.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod scope;
pub mod source;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use lock::{ScopeGuard, ScopeLocks};
pub use memory::InMemoryStore;
pub use scope::{combined_scope, Scope};
pub use source::{ContentSource, FileSource, Handle, MemorySource};
pub use traits::{run_in_transaction, MutableStore};
