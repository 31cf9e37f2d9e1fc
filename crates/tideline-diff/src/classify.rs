//! Classification of one item from its local, base, and remote sides.

use tideline_store::Handle;
use tracing::trace;

use crate::comparator::Comparator;
use crate::error::{DiffError, DiffResult};
use crate::kind::{ChangeType, ConflictFlags, Direction, SyncKind};
use crate::node::LocalRef;

/// Classify an item.
///
/// Two-way comparators ignore `base`. The only error is an item that exists
/// on neither side of a two-way comparison.
pub fn classify(
    local: &LocalRef,
    base: Option<&Handle>,
    remote: Option<&Handle>,
    comparator: &dyn Comparator,
) -> DiffResult<SyncKind> {
    let kind = if comparator.is_three_way() {
        three_way(local, base, remote, comparator)
    } else {
        two_way(local, remote, comparator)?
    };
    trace!(path = %local.path, %kind, "classified");
    Ok(kind)
}

fn two_way(
    local: &LocalRef,
    remote: Option<&Handle>,
    comparator: &dyn Comparator,
) -> DiffResult<SyncKind> {
    let change = match (local.exists, remote) {
        (false, None) => {
            return Err(DiffError::ClassificationInvariant {
                path: local.path.clone(),
                reason: "absent both locally and remotely",
            })
        }
        (true, None) => ChangeType::Deletion,
        (false, Some(_)) => ChangeType::Addition,
        (true, Some(remote)) => {
            if comparator.compare_local(local, remote) {
                ChangeType::InSync
            } else {
                ChangeType::Change
            }
        }
    };
    Ok(SyncKind::two_way(change))
}

fn three_way(
    local: &LocalRef,
    base: Option<&Handle>,
    remote: Option<&Handle>,
    comparator: &dyn Comparator,
) -> SyncKind {
    use ChangeType::{Addition, Change, Deletion};
    use Direction::{Conflicting, Incoming, Outgoing};

    let Some(base) = base else {
        return match (remote, local.exists) {
            (None, false) => SyncKind::IN_SYNC,
            (None, true) => SyncKind::new(Addition, Outgoing),
            (Some(_), false) => SyncKind::new(Addition, Incoming),
            (Some(remote), true) => {
                let kind = SyncKind::new(Addition, Conflicting);
                if comparator.compare_local(local, remote) {
                    kind.with_conflict(ConflictFlags::PSEUDO_CONFLICT)
                } else {
                    kind
                }
            }
        };
    };

    match (local.exists, remote) {
        (false, None) => {
            SyncKind::new(Deletion, Conflicting).with_conflict(ConflictFlags::PSEUDO_CONFLICT)
        }
        (false, Some(remote)) => {
            if comparator.compare(base, remote) {
                SyncKind::new(Deletion, Outgoing)
            } else {
                SyncKind::new(Change, Conflicting)
            }
        }
        (true, None) => {
            if comparator.compare_local(local, base) {
                SyncKind::new(Deletion, Incoming)
            } else {
                SyncKind::new(Change, Conflicting)
            }
        }
        (true, Some(remote)) => {
            let local_unchanged = comparator.compare_local(local, base);
            let remote_unchanged = comparator.compare(base, remote);
            match (local_unchanged, remote_unchanged) {
                (true, true) => SyncKind::IN_SYNC,
                (true, false) => SyncKind::new(Change, Incoming),
                (false, true) => SyncKind::new(Change, Outgoing),
                (false, false) => {
                    if comparator.compare_local(local, remote) {
                        SyncKind::IN_SYNC
                    } else {
                        SyncKind::new(Change, Conflicting)
                    }
                }
            }
        }
    }
}
