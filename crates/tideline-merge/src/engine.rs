//! The merge engine.
//!
//! [`MergeEngine`] walks classified items, decides per item what to do
//! ([`plan`]), applies the mutation to the local store, and records the
//! reconciled state back into the diff tree.
//!
//! Every batch holds the union of its items' scopes for its whole duration,
//! acquired once before the first item. Each item then runs in its own nested
//! scope. Content conflicts are collected and the batch continues; store
//! failures abort the batch and leave already-applied items in place.

use std::sync::{Arc, RwLock};

use tideline_diff::{ConflictFlags, DiffNode, DiffTree, LocalRef};
use tideline_store::{Handle, MutableStore, Scope};
use tideline_types::{ItemPath, ProgressMonitor};
use tracing::{debug, info, warn};

use crate::error::{MergeError, MergeResult};
use crate::merger::{ContentMerger, MergeOutput};
use crate::options::MergeOptions;
use crate::plan::{plan, ConflictReason, MergeAction};
use crate::status::MergeStatus;

/// Per-item result inside a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Applied,
    Skipped,
    Conflict(ConflictReason),
}

/// Applies merge decisions to a local store and keeps a diff tree current.
pub struct MergeEngine {
    store: Arc<dyn MutableStore>,
    merger: Arc<dyn ContentMerger>,
    tree: Arc<RwLock<DiffTree>>,
    options: MergeOptions,
}

impl MergeEngine {
    pub fn new(
        store: Arc<dyn MutableStore>,
        merger: Arc<dyn ContentMerger>,
        tree: Arc<RwLock<DiffTree>>,
    ) -> Self {
        Self {
            store,
            merger,
            tree,
            options: MergeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    pub fn tree(&self) -> &Arc<RwLock<DiffTree>> {
        &self.tree
    }

    pub fn store(&self) -> &Arc<dyn MutableStore> {
        &self.store
    }

    /// Merge a batch of items, in order.
    ///
    /// Returns [`MergeStatus::Conflicts`] naming every item that could not be
    /// merged; all other items are applied. Store failures and cancellation
    /// abort the batch with an error.
    pub fn merge_all(
        &self,
        nodes: &[DiffNode],
        force: bool,
        monitor: &dyn ProgressMonitor,
    ) -> MergeResult<MergeStatus> {
        let scope = self.batch_scope(nodes);
        let _batch = self.store.begin(&scope)?;
        monitor.begin_task("merge", nodes.len());

        let mut conflicts = Vec::new();
        let mut applied = 0usize;
        for (done, requested) in nodes.iter().enumerate() {
            if monitor.is_cancelled() {
                info!(applied, remaining = nodes.len() - done, "merge cancelled");
                return Err(MergeError::Cancelled);
            }
            let node = self.current(requested);
            match self.merge_one(&node, force, monitor)? {
                Outcome::Applied => applied += 1,
                Outcome::Skipped => {}
                Outcome::Conflict(reason) => {
                    warn!(path = %node.path(), %reason, "merge conflict");
                    conflicts.push(node.path().clone());
                }
            }
            monitor.worked(1);
        }
        monitor.done();

        info!(
            items = nodes.len(),
            applied,
            conflicts = conflicts.len(),
            "merge batch finished"
        );
        Ok(MergeStatus::from_conflicts(conflicts))
    }

    /// Merge a single item.
    pub fn merge(
        &self,
        node: &DiffNode,
        force: bool,
        monitor: &dyn ProgressMonitor,
    ) -> MergeResult<MergeStatus> {
        self.merge_all(std::slice::from_ref(node), force, monitor)
    }

    /// Record items as reconciled without touching their content.
    ///
    /// With `in_sync` the items become in sync outright; without it they are
    /// reclassified against the remote as their new base. Items already in
    /// sync are left alone.
    pub fn mark_as_merged(
        &self,
        nodes: &[DiffNode],
        in_sync: bool,
        monitor: &dyn ProgressMonitor,
    ) -> MergeResult<()> {
        let scope = self.batch_scope(nodes);
        let _batch = self.store.begin(&scope)?;
        monitor.begin_task("mark as merged", nodes.len());

        for requested in nodes {
            if monitor.is_cancelled() {
                return Err(MergeError::Cancelled);
            }
            let node = self.current(requested);
            if !node.kind().is_in_sync() {
                let _item = self.store.begin(&Scope::of(node.path().clone()))?;
                self.mark_one(&node, in_sync)?;
            }
            monitor.worked(1);
        }
        monitor.done();
        Ok(())
    }

    /// Run the content merger on conflicting changes without writing, and
    /// flag each as an automerge or manual conflict in the tree.
    ///
    /// Returns the number of items flagged.
    pub fn tag_conflicts(
        &self,
        nodes: &[DiffNode],
        monitor: &dyn ProgressMonitor,
    ) -> MergeResult<usize> {
        monitor.begin_task("tag conflicts", nodes.len());
        let mut tagged = 0;
        for requested in nodes {
            if monitor.is_cancelled() {
                return Err(MergeError::Cancelled);
            }
            let node = self.current(requested);
            if plan(&node, false, &self.options) == MergeAction::ThreeWayMerge {
                let flag = match self.dry_run(&node, monitor)? {
                    Some(MergeOutput::Merged(_)) => Some(ConflictFlags::AUTOMERGE_CONFLICT),
                    Some(MergeOutput::Conflict { .. }) => Some(ConflictFlags::MANUAL_CONFLICT),
                    None => None,
                };
                if let Some(flag) = flag {
                    debug!(path = %node.path(), ?flag, "tagged conflict");
                    self.put(node.with_conflict(flag));
                    tagged += 1;
                }
            }
            monitor.worked(1);
        }
        monitor.done();
        Ok(tagged)
    }

    fn batch_scope(&self, nodes: &[DiffNode]) -> Scope {
        let paths: Vec<ItemPath> = nodes.iter().map(|n| n.path().clone()).collect();
        self.store.combined_scope(&paths)
    }

    /// The tree's node for the same path, which may be newer than `node` if a
    /// previous batch touched it.
    fn current(&self, node: &DiffNode) -> DiffNode {
        self.tree
            .read()
            .expect("lock poisoned")
            .get(node.path())
            .cloned()
            .unwrap_or_else(|| node.clone())
    }

    fn put(&self, node: DiffNode) {
        self.tree.write().expect("lock poisoned").put(node);
    }

    fn merge_one(
        &self,
        node: &DiffNode,
        force: bool,
        monitor: &dyn ProgressMonitor,
    ) -> MergeResult<Outcome> {
        let _item = self.store.begin(&Scope::of(node.path().clone()))?;
        let action = plan(node, force, &self.options);
        debug!(path = %node.path(), kind = %node.kind(), ?action, "merging item");

        match action {
            MergeAction::Skip(_) => Ok(Outcome::Skipped),
            MergeAction::Replace => self.replace(node, monitor),
            MergeAction::MarkMerged => {
                self.mark_one(node, false)?;
                Ok(Outcome::Applied)
            }
            MergeAction::ThreeWayMerge => self.three_way_merge(node, monitor),
            MergeAction::Conflict(reason) => Ok(Outcome::Conflict(reason)),
        }
    }

    /// Copy the winning side over the local copy: the remote, or the base
    /// when only the local side changed (a forced revert).
    fn replace(&self, node: &DiffNode, monitor: &dyn ProgressMonitor) -> MergeResult<Outcome> {
        let path = node.path();
        let winner = if !node.is_three_way() || node.kind().direction().includes_incoming() {
            node.remote()
        } else {
            node.base()
        };

        match winner.filter(|h| h.exists()) {
            None => {
                if self.store.exists(path)? {
                    self.store.delete(path)?;
                }
            }
            Some(handle) => {
                let Some(data) = read_side(path, handle, monitor) else {
                    return Ok(Outcome::Conflict(ConflictReason::ContentUnavailable));
                };
                if let Some(parent) = path.parent() {
                    self.store.ensure_container(&parent)?;
                }
                self.store.create_or_replace(path, &data)?;
            }
        }

        self.mark_one(node, true)?;
        Ok(Outcome::Applied)
    }

    fn three_way_merge(
        &self,
        node: &DiffNode,
        monitor: &dyn ProgressMonitor,
    ) -> MergeResult<Outcome> {
        match self.dry_run(node, monitor)? {
            None => Ok(Outcome::Conflict(ConflictReason::ContentUnavailable)),
            Some(MergeOutput::Merged(bytes)) => {
                self.store.create_or_replace(node.path(), &bytes)?;
                self.mark_one(node, false)?;
                Ok(Outcome::Applied)
            }
            Some(MergeOutput::Conflict { regions }) => {
                debug!(path = %node.path(), regions = regions.len(), "unmergeable");
                self.put(node.with_conflict(ConflictFlags::MANUAL_CONFLICT));
                Ok(Outcome::Conflict(ConflictReason::Unmergeable))
            }
        }
    }

    /// Run the content merger without writing. `None` when base or remote
    /// content cannot be fetched.
    fn dry_run(
        &self,
        node: &DiffNode,
        monitor: &dyn ProgressMonitor,
    ) -> MergeResult<Option<MergeOutput>> {
        let path = node.path();
        let (Some(base), Some(remote)) = (node.base(), node.remote()) else {
            return Ok(None);
        };
        let Some(ancestor) = read_side(path, base, monitor) else {
            return Ok(None);
        };
        let Some(theirs) = read_side(path, remote, monitor) else {
            return Ok(None);
        };
        let ours = self.store.read(path)?;
        self.merger.merge(&ancestor, &ours, &theirs).map(Some)
    }

    /// Rebuild the node from the store's current local state with the remote
    /// as its new base, and put it in the tree.
    fn mark_one(&self, node: &DiffNode, in_sync: bool) -> MergeResult<()> {
        let local = LocalRef::from_store(self.store.as_ref(), node.path())?;
        let merged = DiffNode::builder(local, Arc::clone(node.comparator()))
            .base(node.remote().cloned())
            .remote(node.remote().cloned())
            .in_sync(in_sync || !node.is_three_way())
            .build()?;
        debug!(path = %node.path(), kind = %merged.kind(), "marked merged");
        self.put(merged);
        Ok(())
    }
}

fn read_side(path: &ItemPath, handle: &Handle, monitor: &dyn ProgressMonitor) -> Option<Vec<u8>> {
    match handle.read_bytes(monitor) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(%path, revision = handle.revision(), error = %e, "content unavailable");
            None
        }
    }
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("merger", &self.merger)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
