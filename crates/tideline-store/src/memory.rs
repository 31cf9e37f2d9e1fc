use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tideline_types::{ItemKind, ItemPath};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::lock::{ScopeGuard, ScopeLocks};
use crate::scope::Scope;
use crate::source::{Handle, MemorySource};
use crate::traits::MutableStore;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry {
    File(Vec<u8>),
    Container,
}

/// In-memory, `BTreeMap`-based item store.
///
/// Intended for tests and embedding. Items are held behind a `RwLock`; content
/// is cloned on read and write.
pub struct InMemoryStore {
    items: RwLock<BTreeMap<ItemPath, Entry>>,
    locks: Arc<ScopeLocks>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            locks: ScopeLocks::new(),
        }
    }

    /// Builder-style helper: add a file, creating its containers.
    pub fn with_file(self, path: &str, data: impl AsRef<[u8]>) -> StoreResult<Self> {
        let path = ItemPath::new(path)?;
        if let Some(parent) = path.parent() {
            self.ensure_container(&parent)?;
        }
        self.create_or_replace(&path, data.as_ref())?;
        Ok(self)
    }

    /// Number of items (files and containers).
    pub fn len(&self) -> usize {
        self.items.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().expect("lock poisoned").is_empty()
    }

    /// Sorted paths of all files.
    pub fn files(&self) -> Vec<ItemPath> {
        self.items
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// The scope lock table, shared with callers that need to inspect it.
    pub fn locks(&self) -> &Arc<ScopeLocks> {
        &self.locks
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MutableStore for InMemoryStore {
    fn kind(&self, path: &ItemPath) -> StoreResult<Option<ItemKind>> {
        let items = self.items.read().expect("lock poisoned");
        Ok(items.get(path).map(|entry| match entry {
            Entry::File(_) => ItemKind::File,
            Entry::Container => ItemKind::Container,
        }))
    }

    fn read(&self, path: &ItemPath) -> StoreResult<Vec<u8>> {
        let items = self.items.read().expect("lock poisoned");
        match items.get(path) {
            Some(Entry::File(data)) => Ok(data.clone()),
            Some(Entry::Container) => Err(StoreError::NotAFile(path.clone())),
            None => Err(StoreError::NotFound(path.clone())),
        }
    }

    fn create_or_replace(&self, path: &ItemPath, data: &[u8]) -> StoreResult<()> {
        let mut items = self.items.write().expect("lock poisoned");
        if let Some(parent) = path.parent() {
            match items.get(&parent) {
                Some(Entry::Container) => {}
                Some(Entry::File(_)) => return Err(StoreError::NotAContainer(parent)),
                None => return Err(StoreError::MissingParent(path.clone())),
            }
        }
        if let Some(Entry::Container) = items.get(path) {
            return Err(StoreError::NotAFile(path.clone()));
        }
        items.insert(path.clone(), Entry::File(data.to_vec()));
        debug!(%path, bytes = data.len(), "wrote item");
        Ok(())
    }

    fn delete(&self, path: &ItemPath) -> StoreResult<()> {
        let mut items = self.items.write().expect("lock poisoned");
        if items.remove(path).is_none() {
            return Err(StoreError::NotFound(path.clone()));
        }
        items.retain(|held, _| !path.is_ancestor_of(held));
        debug!(%path, "deleted item");
        Ok(())
    }

    fn ensure_container(&self, path: &ItemPath) -> StoreResult<()> {
        let mut items = self.items.write().expect("lock poisoned");
        let mut chain = path.ancestors();
        chain.reverse();
        chain.push(path.clone());
        for dir in chain {
            match items.get(&dir) {
                Some(Entry::Container) => {}
                Some(Entry::File(_)) => return Err(StoreError::NotAContainer(dir)),
                None => {
                    items.insert(dir, Entry::Container);
                }
            }
        }
        Ok(())
    }

    fn snapshot(&self, path: &ItemPath) -> StoreResult<Option<Handle>> {
        let items = self.items.read().expect("lock poisoned");
        Ok(match items.get(path) {
            Some(Entry::File(data)) => Some(MemorySource::new(data.clone()).into_handle()),
            _ => None,
        })
    }

    fn begin(&self, scope: &Scope) -> StoreResult<ScopeGuard> {
        Ok(self.locks.acquire(scope))
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("item_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::run_in_transaction;
    use tideline_types::NullProgress;

    fn p(s: &str) -> ItemPath {
        ItemPath::new(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn create_and_read_top_level_file() {
        let store = InMemoryStore::new();
        store.create_or_replace(&p("a.txt"), b"hello").unwrap();
        assert_eq!(store.read(&p("a.txt")).unwrap(), b"hello");
        assert_eq!(store.kind(&p("a.txt")).unwrap(), Some(ItemKind::File));
    }

    #[test]
    fn replace_overwrites_content() {
        let store = InMemoryStore::new().with_file("a.txt", "v1").unwrap();
        store.create_or_replace(&p("a.txt"), b"v2").unwrap();
        assert_eq!(store.read(&p("a.txt")).unwrap(), b"v2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_requires_parent_container() {
        let store = InMemoryStore::new();
        let err = store.create_or_replace(&p("dir/a.txt"), b"x").unwrap_err();
        assert!(matches!(err, StoreError::MissingParent(_)));

        store.ensure_container(&p("dir")).unwrap();
        store.create_or_replace(&p("dir/a.txt"), b"x").unwrap();
        assert!(store.exists(&p("dir/a.txt")).unwrap());
    }

    #[test]
    fn ensure_container_creates_ancestors_and_is_idempotent() {
        let store = InMemoryStore::new();
        store.ensure_container(&p("a/b/c")).unwrap();
        store.ensure_container(&p("a/b/c")).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.kind(&p("a/b")).unwrap(), Some(ItemKind::Container));
    }

    #[test]
    fn ensure_container_rejects_file_on_path() {
        let store = InMemoryStore::new().with_file("a", "x").unwrap();
        let err = store.ensure_container(&p("a/b")).unwrap_err();
        assert!(matches!(err, StoreError::NotAContainer(path) if path == p("a")));
    }

    #[test]
    fn delete_removes_descendants() {
        let store = InMemoryStore::new()
            .with_file("d/x", "1")
            .unwrap()
            .with_file("d/sub/y", "2")
            .unwrap()
            .with_file("dx", "3")
            .unwrap();
        store.delete(&p("d")).unwrap();
        assert_eq!(store.files(), vec![p("dx")]);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.delete(&p("ghost")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn read_container_is_not_a_file() {
        let store = InMemoryStore::new();
        store.ensure_container(&p("dir")).unwrap();
        assert!(matches!(
            store.read(&p("dir")),
            Err(StoreError::NotAFile(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn snapshot_is_immutable_after_write() {
        let store = InMemoryStore::new().with_file("a", "before").unwrap();
        let snap = store.snapshot(&p("a")).unwrap().expect("file exists");
        store.create_or_replace(&p("a"), b"after").unwrap();
        assert_eq!(snap.read_bytes(&NullProgress).unwrap(), b"before");
        assert_ne!(store.snapshot(&p("a")).unwrap(), Some(snap));
    }

    #[test]
    fn snapshot_of_missing_or_container_is_none() {
        let store = InMemoryStore::new();
        store.ensure_container(&p("dir")).unwrap();
        assert!(store.snapshot(&p("dir")).unwrap().is_none());
        assert!(store.snapshot(&p("nope")).unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    #[test]
    fn transaction_holds_scope_for_body() {
        let store = InMemoryStore::new();
        let scope = store.combined_scope(&[p("a"), p("b")]);
        let held = run_in_transaction(&store, &scope, || {
            Ok::<_, StoreError>(store.locks().held_count())
        })
        .unwrap();
        assert_eq!(held, 1);
        assert_eq!(store.locks().held_count(), 0);
    }

    #[test]
    fn transaction_does_not_roll_back() {
        let store = InMemoryStore::new();
        let scope = Scope::of(p("a"));
        let result = run_in_transaction(&store, &scope, || {
            store.create_or_replace(&p("a"), b"kept")?;
            store.create_or_replace(&p("a/missing/child"), b"x")
        });
        assert!(result.is_err());
        assert_eq!(store.read(&p("a")).unwrap(), b"kept");
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::thread;

        let store = Arc::new(InMemoryStore::new().with_file("shared", "data").unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    assert_eq!(store.read(&p("shared")).unwrap(), b"data");
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryStore::new().with_file("x", "1").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryStore"));
        assert!(debug.contains("item_count"));
    }
}
