//! Session API for Tideline.
//!
//! A [`SyncSession`] binds a local directory to a remote directory (and,
//! for three-way comparison, a base directory), scans them into a diff tree,
//! and merges through the engine. This is the main entry point for
//! applications embedding Tideline.

pub mod config;
pub mod error;
pub mod scan;
pub mod session;

pub use config::{CompareMode, SessionConfig, CONFIG_FILE};
pub use error::{SdkError, SdkResult};
pub use scan::Scanner;
pub use session::SyncSession;

// Re-export key types
pub use tideline_diff::{ChangeType, ConflictFlags, DiffNode, Direction, SyncKind};
pub use tideline_merge::{MergeOptions, MergeStatus};
pub use tideline_types::{CancellationToken, ItemPath, NullProgress, ProgressMonitor};
