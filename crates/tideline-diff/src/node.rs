//! Diff nodes: one item's three sides plus its derived classification.

use std::fmt;
use std::sync::Arc;

use tideline_store::{Handle, MutableStore};
use tideline_types::{ItemKind, ItemPath};

use crate::classify::classify;
use crate::comparator::Comparator;
use crate::error::DiffResult;
use crate::kind::{ConflictFlags, SyncKind};

/// The local side of an item: identity, existence, and a snapshot of its
/// content when it is an existing file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalRef {
    pub path: ItemPath,
    pub kind: ItemKind,
    pub exists: bool,
    pub content: Option<Handle>,
}

impl LocalRef {
    /// An existing local file.
    pub fn file(path: ItemPath, content: Handle) -> Self {
        Self {
            path,
            kind: ItemKind::File,
            exists: true,
            content: Some(content),
        }
    }

    /// An existing local container.
    pub fn container(path: ItemPath) -> Self {
        Self {
            path,
            kind: ItemKind::Container,
            exists: true,
            content: None,
        }
    }

    /// An item that does not exist locally.
    pub fn missing(path: ItemPath) -> Self {
        Self {
            path,
            kind: ItemKind::File,
            exists: false,
            content: None,
        }
    }

    /// The current local state of `path` in `store`.
    pub fn from_store(store: &dyn MutableStore, path: &ItemPath) -> DiffResult<Self> {
        Ok(match store.kind(path)? {
            Some(ItemKind::File) => match store.snapshot(path)? {
                Some(content) => Self::file(path.clone(), content),
                None => Self::missing(path.clone()),
            },
            Some(ItemKind::Container) => Self::container(path.clone()),
            None => Self::missing(path.clone()),
        })
    }

    pub fn is_file(&self) -> bool {
        self.kind == ItemKind::File
    }
}

/// One side's transition: its content before and after the change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub before: Option<Handle>,
    pub after: Option<Handle>,
}

/// One classified item.
///
/// Built with [`DiffNodeBuilder`], which classifies once all inputs are known.
/// Nodes are immutable; a rescan or merge replaces them.
#[derive(Clone)]
pub struct DiffNode {
    local: LocalRef,
    base: Option<Handle>,
    remote: Option<Handle>,
    kind: SyncKind,
    comparator: Arc<dyn Comparator>,
}

impl DiffNode {
    pub fn builder(local: LocalRef, comparator: Arc<dyn Comparator>) -> DiffNodeBuilder {
        DiffNodeBuilder {
            local,
            base: None,
            remote: None,
            comparator,
            in_sync: false,
        }
    }

    pub fn path(&self) -> &ItemPath {
        &self.local.path
    }

    pub fn local(&self) -> &LocalRef {
        &self.local
    }

    pub fn base(&self) -> Option<&Handle> {
        self.base.as_ref()
    }

    pub fn remote(&self) -> Option<&Handle> {
        self.remote.as_ref()
    }

    pub fn kind(&self) -> SyncKind {
        self.kind
    }

    pub fn comparator(&self) -> &Arc<dyn Comparator> {
        &self.comparator
    }

    pub fn is_three_way(&self) -> bool {
        self.comparator.is_three_way()
    }

    /// The same node with a conflict flag added to its kind. Ignored unless
    /// the node is conflicting.
    pub fn with_conflict(&self, flag: ConflictFlags) -> DiffNode {
        DiffNode {
            kind: self.kind.with_conflict(flag),
            ..self.clone()
        }
    }

    /// The local transition from base, when the local side changed.
    pub fn local_change(&self) -> Option<Change> {
        if !self.is_three_way() || !self.kind.direction().includes_outgoing() {
            return None;
        }
        Some(Change {
            before: self.base.clone(),
            after: self.local.content.clone(),
        })
    }

    /// The remote transition, when the remote side changed. For two-way nodes
    /// this is the transition from local to remote.
    pub fn remote_change(&self) -> Option<Change> {
        if self.is_three_way() {
            if !self.kind.direction().includes_incoming() {
                return None;
            }
            return Some(Change {
                before: self.base.clone(),
                after: self.remote.clone(),
            });
        }
        if self.kind.is_in_sync() {
            return None;
        }
        Some(Change {
            before: self.local.content.clone(),
            after: self.remote.clone(),
        })
    }
}

impl PartialEq for DiffNode {
    fn eq(&self, other: &Self) -> bool {
        self.local.path == other.local.path
            && self.base == other.base
            && self.remote == other.remote
    }
}

impl Eq for DiffNode {}

impl fmt::Debug for DiffNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffNode")
            .field("path", &self.local.path)
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("remote", &self.remote)
            .finish()
    }
}

/// Collects a node's inputs, then classifies on [`build`](Self::build).
#[must_use]
pub struct DiffNodeBuilder {
    local: LocalRef,
    base: Option<Handle>,
    remote: Option<Handle>,
    comparator: Arc<dyn Comparator>,
    in_sync: bool,
}

impl DiffNodeBuilder {
    pub fn base(mut self, base: Option<Handle>) -> Self {
        self.base = base;
        self
    }

    pub fn remote(mut self, remote: Option<Handle>) -> Self {
        self.remote = remote;
        self
    }

    /// Record the node as in sync without classifying it.
    pub fn in_sync(mut self, in_sync: bool) -> Self {
        self.in_sync = in_sync;
        self
    }

    pub fn build(self) -> DiffResult<DiffNode> {
        let kind = if self.in_sync {
            SyncKind::IN_SYNC
        } else {
            classify(
                &self.local,
                self.base.as_ref(),
                self.remote.as_ref(),
                self.comparator.as_ref(),
            )?
        };
        Ok(DiffNode {
            local: self.local,
            base: self.base,
            remote: self.remote,
            kind,
            comparator: self.comparator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ContentComparator;
    use crate::kind::{ChangeType, Direction};
    use tideline_store::{InMemoryStore, MemorySource};

    fn p(s: &str) -> ItemPath {
        ItemPath::new(s).unwrap()
    }

    fn h(data: &str) -> Handle {
        MemorySource::new(data).into_handle()
    }

    fn three_way() -> Arc<dyn Comparator> {
        Arc::new(ContentComparator::three_way())
    }

    #[test]
    fn builder_classifies_on_build() {
        let node = DiffNode::builder(LocalRef::file(p("a"), h("mine")), three_way())
            .base(Some(h("old")))
            .remote(Some(h("theirs")))
            .build()
            .unwrap();
        assert_eq!(
            node.kind(),
            SyncKind::new(ChangeType::Change, Direction::Conflicting)
        );
    }

    #[test]
    fn in_sync_hint_skips_classification() {
        let node = DiffNode::builder(LocalRef::missing(p("a")), three_way())
            .remote(Some(h("x")))
            .in_sync(true)
            .build()
            .unwrap();
        assert!(node.kind().is_in_sync());
    }

    #[test]
    fn equality_ignores_classification() {
        let base = h("b");
        let a = DiffNode::builder(LocalRef::file(p("a"), h("b")), three_way())
            .base(Some(base.clone()))
            .build()
            .unwrap();
        let b = DiffNode::builder(LocalRef::file(p("a"), h("changed")), three_way())
            .base(Some(base))
            .build()
            .unwrap();
        assert_ne!(a.kind(), b.kind());
        assert_eq!(a, b);
    }

    #[test]
    fn changes_follow_direction() {
        let node = DiffNode::builder(LocalRef::file(p("a"), h("mine")), three_way())
            .base(Some(h("old")))
            .remote(Some(h("old")))
            .build()
            .unwrap();
        let local = node.local_change().expect("outgoing change");
        assert_eq!(local.before, Some(h("old")));
        assert_eq!(local.after, Some(h("mine")));
        assert!(node.remote_change().is_none());
    }

    #[test]
    fn two_way_remote_change_is_local_to_remote() {
        let node = DiffNode::builder(
            LocalRef::file(p("a"), h("mine")),
            Arc::new(ContentComparator::two_way()),
        )
        .remote(Some(h("theirs")))
        .build()
        .unwrap();
        assert!(node.local_change().is_none());
        let change = node.remote_change().unwrap();
        assert_eq!(change.before, Some(h("mine")));
        assert_eq!(change.after, Some(h("theirs")));
    }

    #[test]
    fn local_ref_from_store() {
        let store = InMemoryStore::new().with_file("d/f", "x").unwrap();
        let file = LocalRef::from_store(&store, &p("d/f")).unwrap();
        assert!(file.exists && file.is_file());
        assert_eq!(file.content, Some(h("x")));

        let dir = LocalRef::from_store(&store, &p("d")).unwrap();
        assert_eq!(dir.kind, ItemKind::Container);

        let gone = LocalRef::from_store(&store, &p("nope")).unwrap();
        assert!(!gone.exists);
    }

    #[test]
    fn with_conflict_only_on_conflicting_nodes() {
        let node = DiffNode::builder(LocalRef::file(p("a"), h("mine")), three_way())
            .base(Some(h("old")))
            .remote(Some(h("theirs")))
            .build()
            .unwrap()
            .with_conflict(ConflictFlags::MANUAL_CONFLICT);
        assert!(node.kind().is_conflicting());
        assert!(node.kind().has_conflict(ConflictFlags::MANUAL_CONFLICT));
    }
}
