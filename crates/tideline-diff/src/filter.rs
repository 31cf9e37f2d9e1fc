//! Ready-made predicates for [`DiffTree::query`](crate::DiffTree::query).

use crate::kind::{ChangeType, ConflictFlags, Direction};
use crate::node::DiffNode;

/// Nodes with exactly this direction.
pub fn direction(direction: Direction) -> impl Fn(&DiffNode) -> bool + Clone {
    move |node: &DiffNode| node.kind().direction() == direction
}

/// Nodes with this change type.
pub fn change(change: ChangeType) -> impl Fn(&DiffNode) -> bool + Clone {
    move |node: &DiffNode| node.kind().change() == change
}

/// Nodes carrying a conflict flag.
pub fn conflict_flag(flag: ConflictFlags) -> impl Fn(&DiffNode) -> bool + Clone {
    move |node: &DiffNode| node.kind().has_conflict(flag)
}

/// File items only.
pub fn files() -> impl Fn(&DiffNode) -> bool + Clone {
    |node: &DiffNode| node.local().is_file()
}
