use std::path::Path;
use std::sync::{Arc, RwLock};

use tideline_diff::{Comparator, DiffNode, DiffTree, LocalRef};
use tideline_merge::{LineMerger, MergeEngine, MergeStatus};
use tideline_store::{FileSource, FsStore, Handle};
use tideline_types::{ItemPath, ProgressMonitor};
use tracing::info;

use crate::config::SessionConfig;
use crate::error::{SdkError, SdkResult};
use crate::scan::Scanner;

/// One synchronization run over a local directory, an optional base
/// directory, and a remote directory.
///
/// The session owns the diff tree; it is rebuilt by [`scan`](Self::scan) and
/// kept current by merges.
pub struct SyncSession {
    config: SessionConfig,
    store: Arc<FsStore>,
    scanner: Scanner,
    comparator: Arc<dyn Comparator>,
    engine: MergeEngine,
}

impl SyncSession {
    pub fn open(config: SessionConfig) -> SdkResult<Self> {
        let store = Arc::new(FsStore::open(&config.local)?);
        let scanner = Scanner::new(&config.ignore)?;
        let comparator = config.comparator();
        let tree = Arc::new(RwLock::new(DiffTree::new()));
        let engine = MergeEngine::new(store.clone(), Arc::new(LineMerger), tree)
            .with_options(config.merge_options());
        info!(
            local = %config.local.display(),
            remote = %config.remote.display(),
            three_way = config.is_three_way(),
            "session opened"
        );
        Ok(Self {
            config,
            store,
            scanner,
            comparator,
            engine,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tree(&self) -> &Arc<RwLock<DiffTree>> {
        self.engine.tree()
    }

    /// Walk all roots and classify every file found on any side, replacing
    /// the tree contents. Returns the number of items classified.
    pub fn scan(&self, monitor: &dyn ProgressMonitor) -> SdkResult<usize> {
        let mut paths = self.scanner.files(&self.config.local)?;
        paths.extend(self.scanner.files(&self.config.remote)?);
        if let Some(base) = &self.config.base {
            paths.extend(self.scanner.files(base)?);
        }

        monitor.begin_task("scan", paths.len());
        let mut nodes = Vec::with_capacity(paths.len());
        for path in &paths {
            if monitor.is_cancelled() {
                return Err(SdkError::Cancelled);
            }
            let local = LocalRef::from_store(self.store.as_ref(), path)?;
            let base = match &self.config.base {
                Some(root) => snapshot(root, path)?,
                None => None,
            };
            let remote = snapshot(&self.config.remote, path)?;
            if !local.exists && remote.is_none() && !self.comparator.is_three_way() {
                // Vanished from both sides since it was listed.
                monitor.worked(1);
                continue;
            }
            let node = DiffNode::builder(local, Arc::clone(&self.comparator))
                .base(base)
                .remote(remote)
                .build()?;
            nodes.push(node);
            monitor.worked(1);
        }
        monitor.done();

        let count = nodes.len();
        let mut tree = self.tree().write().expect("lock poisoned");
        tree.replace_all(nodes);
        info!(
            items = count,
            out_of_sync = tree.out_of_sync().count(),
            conflicts = tree.conflicts().count(),
            "scan finished"
        );
        Ok(count)
    }

    /// Items that are not in sync, in path order.
    pub fn status(&self) -> Vec<DiffNode> {
        self.tree()
            .read()
            .expect("lock poisoned")
            .out_of_sync()
            .cloned()
            .collect()
    }

    pub fn node(&self, path: &ItemPath) -> Option<DiffNode> {
        self.tree().read().expect("lock poisoned").get(path).cloned()
    }

    /// Merge the out-of-sync items at or beneath `paths`, or every
    /// out-of-sync item when `paths` is empty.
    pub fn merge(
        &self,
        paths: &[ItemPath],
        force: bool,
        monitor: &dyn ProgressMonitor,
    ) -> SdkResult<MergeStatus> {
        let nodes = self.select(paths)?;
        Ok(self.engine.merge_all(&nodes, force, monitor)?)
    }

    /// Accept the local copy of the selected items as merged with the remote.
    pub fn mark_as_merged(
        &self,
        paths: &[ItemPath],
        monitor: &dyn ProgressMonitor,
    ) -> SdkResult<()> {
        let nodes = self.select(paths)?;
        Ok(self.engine.mark_as_merged(&nodes, false, monitor)?)
    }

    /// Flag every conflicting change as auto-mergeable or manual.
    pub fn tag_conflicts(&self, monitor: &dyn ProgressMonitor) -> SdkResult<usize> {
        let nodes: Vec<DiffNode> = self
            .tree()
            .read()
            .expect("lock poisoned")
            .conflicts()
            .cloned()
            .collect();
        Ok(self.engine.tag_conflicts(&nodes, monitor)?)
    }

    fn select(&self, paths: &[ItemPath]) -> SdkResult<Vec<DiffNode>> {
        let tree = self.tree().read().expect("lock poisoned");
        if paths.is_empty() {
            return Ok(tree.out_of_sync().cloned().collect());
        }
        let mut selected: Vec<DiffNode> = Vec::new();
        for path in paths {
            let mut found = false;
            for node in tree.subtree(path) {
                found = true;
                if !node.kind().is_in_sync() && !selected.iter().any(|n| n.path() == node.path()) {
                    selected.push(node.clone());
                }
            }
            if !found {
                return Err(SdkError::UnknownPath(path.clone()));
            }
        }
        Ok(selected)
    }
}

fn snapshot(root: &Path, path: &ItemPath) -> SdkResult<Option<Handle>> {
    let location = path.segments().fold(root.to_path_buf(), |acc, seg| acc.join(seg));
    Ok(FileSource::open(location)?.map(Handle::new))
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("config", &self.config)
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}
