use serde::{Deserialize, Serialize};

/// Tunables for [`MergeEngine`](crate::MergeEngine).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Mark pseudo-conflicts (both sides added or changed to the same
    /// content) as merged instead of reporting them as conflicts.
    pub resolve_pseudo_conflicts: bool,
}
