use std::fmt;

use serde::{Deserialize, Serialize};
use tideline_types::ItemPath;

/// Outcome of a merge batch that did not fail outright.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "items", rename_all = "snake_case")]
pub enum MergeStatus {
    /// Every item was applied or skipped.
    Ok,
    /// These items are still conflicted. Everything else was applied.
    Conflicts(Vec<ItemPath>),
}

impl MergeStatus {
    pub fn from_conflicts(conflicts: Vec<ItemPath>) -> Self {
        if conflicts.is_empty() {
            Self::Ok
        } else {
            Self::Conflicts(conflicts)
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// The conflicted items, empty when ok.
    pub fn conflicts(&self) -> &[ItemPath] {
        match self {
            Self::Ok => &[],
            Self::Conflicts(items) => items,
        }
    }
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Conflicts(items) => write!(f, "{} item(s) conflicted", items.len()),
        }
    }
}
