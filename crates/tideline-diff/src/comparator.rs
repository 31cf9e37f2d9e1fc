//! Pluggable equality between snapshots of an item.

use std::fmt;

use tideline_store::Handle;
use tideline_types::NullProgress;
use tracing::warn;

use crate::node::LocalRef;

/// Decides whether two sides of an item hold the same state.
pub trait Comparator: Send + Sync + fmt::Debug {
    /// Whether classification should consult the base (common ancestor).
    fn is_three_way(&self) -> bool;

    /// Compare the local copy with a base or remote handle.
    fn compare_local(&self, local: &LocalRef, other: &Handle) -> bool;

    /// Compare two handles (base with remote).
    fn compare(&self, a: &Handle, b: &Handle) -> bool;
}

/// Compares by content: content ids when both sides know theirs, bytes
/// otherwise. A side whose bytes cannot be read compares unequal.
#[derive(Clone, Copy, Debug)]
pub struct ContentComparator {
    three_way: bool,
}

impl ContentComparator {
    pub fn three_way() -> Self {
        Self { three_way: true }
    }

    pub fn two_way() -> Self {
        Self { three_way: false }
    }
}

impl Comparator for ContentComparator {
    fn is_three_way(&self) -> bool {
        self.three_way
    }

    fn compare_local(&self, local: &LocalRef, other: &Handle) -> bool {
        local
            .content
            .as_ref()
            .is_some_and(|content| same_content(content, other))
    }

    fn compare(&self, a: &Handle, b: &Handle) -> bool {
        same_content(a, b)
    }
}

/// Compares base and remote by revision identifier, and the local copy by
/// content. Always three-way.
#[derive(Clone, Copy, Debug, Default)]
pub struct RevisionComparator;

impl Comparator for RevisionComparator {
    fn is_three_way(&self) -> bool {
        true
    }

    fn compare_local(&self, local: &LocalRef, other: &Handle) -> bool {
        local
            .content
            .as_ref()
            .is_some_and(|content| same_content(content, other))
    }

    fn compare(&self, a: &Handle, b: &Handle) -> bool {
        a.revision() == b.revision()
    }
}

fn same_content(a: &Handle, b: &Handle) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (a.content_id(), b.content_id()) {
        return x == y;
    }
    match (a.read_bytes(&NullProgress), b.read_bytes(&NullProgress)) {
        (Ok(x), Ok(y)) => x == y,
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "unreadable content compares unequal");
            false
        }
    }
}
