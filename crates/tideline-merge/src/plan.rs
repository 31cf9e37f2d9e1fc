//! Per-item merge decisions.

use std::fmt;

use tideline_diff::{ChangeType, ConflictFlags, DiffNode, Direction};

use crate::options::MergeOptions;

/// What the engine will do with one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeAction {
    /// Leave the item alone.
    Skip(SkipReason),
    /// Copy the winning side over the local copy.
    Replace,
    /// Record the item as reconciled without touching content.
    MarkMerged,
    /// Run the content merger on base, local, and remote.
    ThreeWayMerge,
    /// Report the item as conflicted.
    Conflict(ConflictReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Only files are merged.
    NotAFile,
    InSync,
    /// The local copy already holds the wanted content.
    Outgoing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictReason {
    /// Base, remote, or local is missing, so there is nothing to merge from.
    MissingInput,
    /// Base or remote content could not be fetched.
    ContentUnavailable,
    /// The content merger could not reconcile the changes.
    Unmergeable,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingInput => "missing merge input",
            Self::ContentUnavailable => "content unavailable",
            Self::Unmergeable => "changes cannot be merged",
        })
    }
}

/// Decide what to do with `node`.
///
/// `force` replaces the local copy with the winning side even for outgoing and
/// conflicting changes.
pub fn plan(node: &DiffNode, force: bool, options: &MergeOptions) -> MergeAction {
    let kind = node.kind();
    if !node.local().is_file() {
        return MergeAction::Skip(SkipReason::NotAFile);
    }
    if kind.is_in_sync() {
        return MergeAction::Skip(SkipReason::InSync);
    }
    if force || !node.is_three_way() {
        return MergeAction::Replace;
    }
    match kind.direction() {
        Direction::Outgoing => return MergeAction::Skip(SkipReason::Outgoing),
        Direction::Incoming => return MergeAction::Replace,
        Direction::Conflicting | Direction::None => {}
    }
    if kind.change() == ChangeType::Deletion {
        return MergeAction::MarkMerged;
    }
    if options.resolve_pseudo_conflicts && kind.has_conflict(ConflictFlags::PSEUDO_CONFLICT) {
        return MergeAction::MarkMerged;
    }
    if node.base().is_none() || node.remote().is_none() || !node.local().exists {
        return MergeAction::Conflict(ConflictReason::MissingInput);
    }
    MergeAction::ThreeWayMerge
}
