//! The diff tree: every classified item of one synchronization session.
//!
//! Nodes are keyed by [`ItemPath`] in a `BTreeMap`, so a subtree is a
//! contiguous key range. The tree is not internally synchronized; share it
//! behind a lock and serialize structural mutations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tideline_types::ItemPath;
use tracing::trace;

use crate::kind::SyncKind;
use crate::node::DiffNode;

/// A structural change to a [`DiffTree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEvent {
    /// A node was inserted for a path that had none.
    Added { path: ItemPath, kind: SyncKind },
    /// A node was replaced.
    Changed {
        path: ItemPath,
        previous: SyncKind,
        current: SyncKind,
    },
    /// A node was removed.
    Removed { path: ItemPath, kind: SyncKind },
}

impl TreeEvent {
    pub fn path(&self) -> &ItemPath {
        match self {
            Self::Added { path, .. } | Self::Changed { path, .. } | Self::Removed { path, .. } => {
                path
            }
        }
    }
}

/// Observer of tree mutations. Called after the tree is consistent again.
pub trait DiffTreeListener: Send + Sync {
    fn on_change(&self, event: &TreeEvent);
}

/// Indexed collection of diff nodes, at most one per path.
#[derive(Default)]
pub struct DiffTree {
    nodes: BTreeMap<ItemPath, DiffNode>,
    listeners: Vec<Arc<dyn DiffTreeListener>>,
}

impl DiffTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn DiffTreeListener>) {
        self.listeners.push(listener);
    }

    /// Insert a node, replacing and returning any node at the same path.
    pub fn put(&mut self, node: DiffNode) -> Option<DiffNode> {
        let path = node.path().clone();
        let current = node.kind();
        let previous = self.nodes.insert(path.clone(), node);
        let event = match &previous {
            Some(old) => TreeEvent::Changed {
                path,
                previous: old.kind(),
                current,
            },
            None => TreeEvent::Added {
                path,
                kind: current,
            },
        };
        self.notify(&event);
        previous
    }

    pub fn get(&self, path: &ItemPath) -> Option<&DiffNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &ItemPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn remove(&mut self, path: &ItemPath) -> Option<DiffNode> {
        let removed = self.nodes.remove(path)?;
        self.notify(&TreeEvent::Removed {
            path: path.clone(),
            kind: removed.kind(),
        });
        Some(removed)
    }

    /// Remove every node.
    pub fn clear(&mut self) {
        let nodes = std::mem::take(&mut self.nodes);
        for (path, node) in nodes {
            self.notify(&TreeEvent::Removed {
                path,
                kind: node.kind(),
            });
        }
    }

    /// Replace the whole contents with `nodes`.
    pub fn replace_all(&mut self, nodes: impl IntoIterator<Item = DiffNode>) {
        self.clear();
        for node in nodes {
            self.put(node);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All paths, in order.
    pub fn paths(&self) -> impl Iterator<Item = &ItemPath> + '_ {
        self.nodes.keys()
    }

    /// All nodes, in path order.
    pub fn iter(&self) -> impl Iterator<Item = &DiffNode> + Clone + '_ {
        self.nodes.values()
    }

    /// Nodes matching `predicate`, in path order. The iterator is lazy and
    /// can be restarted by cloning it before use.
    pub fn query<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a DiffNode> + Clone + 'a
    where
        P: Fn(&DiffNode) -> bool + Clone + 'a,
    {
        self.nodes.values().filter(move |&node| predicate(node))
    }

    /// `prefix` and every node beneath it.
    pub fn subtree<'a>(
        &'a self,
        prefix: &'a ItemPath,
    ) -> impl Iterator<Item = &'a DiffNode> + Clone + 'a {
        self.nodes
            .range(prefix.clone()..)
            .take_while(move |(path, _)| path.as_str().starts_with(prefix.as_str()))
            .filter(move |(path, _)| path.starts_with(prefix))
            .map(|(_, node)| node)
    }

    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&DiffNode) -> bool,
    {
        self.nodes.values().filter(|&node| predicate(node)).count()
    }

    /// Nodes that are not in sync.
    pub fn out_of_sync(&self) -> impl Iterator<Item = &DiffNode> + Clone + '_ {
        self.query(|node: &DiffNode| !node.kind().is_in_sync())
    }

    /// Nodes whose direction is conflicting.
    pub fn conflicts(&self) -> impl Iterator<Item = &DiffNode> + Clone + '_ {
        self.query(|node: &DiffNode| node.kind().is_conflicting())
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts().next().is_some()
    }

    fn notify(&self, event: &TreeEvent) {
        trace!(path = %event.path(), ?event, "diff tree changed");
        for listener in &self.listeners {
            listener.on_change(event);
        }
    }
}

impl fmt::Debug for DiffTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffTree")
            .field("node_count", &self.nodes.len())
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{Comparator, ContentComparator};
    use crate::filter;
    use crate::kind::{ChangeType, Direction};
    use crate::node::LocalRef;
    use std::sync::Mutex;
    use tideline_store::{Handle, MemorySource};

    fn p(s: &str) -> ItemPath {
        ItemPath::new(s).unwrap()
    }

    fn h(data: &str) -> Handle {
        MemorySource::new(data).into_handle()
    }

    /// A three-way node at `path` with the given local/base/remote contents.
    fn node(path: &str, local: Option<&str>, base: Option<&str>, remote: Option<&str>) -> DiffNode {
        let cmp: Arc<dyn Comparator> = Arc::new(ContentComparator::three_way());
        let local = match local {
            Some(data) => LocalRef::file(p(path), h(data)),
            None => LocalRef::missing(p(path)),
        };
        DiffNode::builder(local, cmp)
            .base(base.map(h))
            .remote(remote.map(h))
            .build()
            .unwrap()
    }

    fn sample() -> DiffTree {
        let mut tree = DiffTree::new();
        tree.put(node("a", Some("1"), Some("1"), Some("1")));
        tree.put(node("d/x", Some("2"), Some("1"), Some("1")));
        tree.put(node("d/y", Some("1"), Some("1"), Some("3")));
        tree.put(node("d/sub/z", Some("2"), Some("1"), Some("3")));
        tree.put(node("dz", None, None, Some("new")));
        tree
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<TreeEvent>>);

    impl DiffTreeListener for Recorder {
        fn on_change(&self, event: &TreeEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn put_replaces_existing_node() {
        let mut tree = DiffTree::new();
        assert!(tree.put(node("a", Some("1"), Some("1"), Some("1"))).is_none());
        let old = tree.put(node("a", Some("2"), Some("1"), Some("1")));
        assert!(old.unwrap().kind().is_in_sync());
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.get(&p("a")).unwrap().kind(),
            SyncKind::new(ChangeType::Change, Direction::Outgoing)
        );
    }

    #[test]
    fn subtree_is_segment_aware_and_inclusive() {
        let tree = sample();
        let d = p("d");
        let paths: Vec<_> = tree.subtree(&d).map(|n| n.path().as_str()).collect();
        assert_eq!(paths, vec!["d/sub/z", "d/x", "d/y"]);

        let dx = p("d/x");
        let leaf: Vec<_> = tree.subtree(&dx).map(|n| n.path().as_str()).collect();
        assert_eq!(leaf, vec!["d/x"]);
        assert_eq!(tree.subtree(&p("missing")).count(), 0);
    }

    #[test]
    fn query_is_lazy_and_restartable() {
        let tree = sample();
        let incoming = tree.query(filter::direction(Direction::Incoming));
        let first: Vec<_> = incoming.clone().map(|n| n.path().clone()).collect();
        let second: Vec<_> = incoming.map(|n| n.path().clone()).collect();
        assert_eq!(first, vec![p("d/y"), p("dz")]);
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_sync_and_conflicts() {
        let tree = sample();
        assert_eq!(tree.out_of_sync().count(), 4);
        let conflicts: Vec<_> = tree.conflicts().map(|n| n.path().as_str()).collect();
        assert_eq!(conflicts, vec!["d/sub/z"]);
        assert!(tree.has_conflicts());
        assert_eq!(tree.count(filter::change(ChangeType::Addition)), 1);
    }

    #[test]
    fn listeners_see_every_mutation() {
        let recorder = Arc::new(Recorder::default());
        let mut tree = DiffTree::new();
        tree.add_listener(recorder.clone());

        tree.put(node("a", Some("1"), Some("1"), Some("2")));
        tree.put(node("a", Some("2"), Some("2"), Some("2")));
        tree.remove(&p("a"));
        assert!(tree.remove(&p("a")).is_none());

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], TreeEvent::Added { .. }));
        assert!(matches!(
            events[1],
            TreeEvent::Changed { current, .. } if current.is_in_sync()
        ));
        assert!(matches!(events[2], TreeEvent::Removed { .. }));
    }

    #[test]
    fn replace_all_clears_first() {
        let recorder = Arc::new(Recorder::default());
        let mut tree = sample();
        tree.add_listener(recorder.clone());

        tree.replace_all(vec![node("only", Some("1"), None, None)]);
        assert_eq!(tree.paths().cloned().collect::<Vec<_>>(), vec![p("only")]);
        assert_eq!(recorder.0.lock().unwrap().len(), 6);
    }
}
