//! Synchronization classification for Tideline.
//!
//! Classifies each item from its local copy, an optional common ancestor
//! (base), and the remote copy, and indexes the results in a [`DiffTree`].
//!
//! # Key Types
//!
//! - [`SyncKind`] -- change type x direction x conflict flags
//! - [`classify`] -- the two-way / three-way classification function
//! - [`Comparator`] -- pluggable equality ([`ContentComparator`], [`RevisionComparator`])
//! - [`DiffNode`] / [`DiffNodeBuilder`] -- one classified item
//! - [`DiffTree`] -- all classified items of a session, with subtree queries

pub mod classify;
pub mod comparator;
pub mod error;
pub mod filter;
pub mod kind;
pub mod node;
pub mod tree;

pub use classify::classify;
pub use comparator::{Comparator, ContentComparator, RevisionComparator};
pub use error::{DiffError, DiffResult};
pub use kind::{ChangeType, ConflictFlags, Direction, SyncKind};
pub use node::{Change, DiffNode, DiffNodeBuilder, LocalRef};
pub use tree::{DiffTree, DiffTreeListener, TreeEvent};
