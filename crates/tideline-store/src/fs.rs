//! Filesystem-backed item store.
//!
//! Items map onto paths beneath a root directory. New content is written to a
//! scratch file in the destination directory and renamed over the target, so a
//! crash mid-write leaves either the old content or the new.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tideline_types::{ItemKind, ItemPath};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::lock::{ScopeGuard, ScopeLocks};
use crate::scope::Scope;
use crate::source::{FileSource, Handle};
use crate::traits::MutableStore;

/// Prefix of scratch files; scanners skip names starting with it.
pub const STAGING_PREFIX: &str = ".tideline-";

/// A [`MutableStore`] over a directory tree.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    locks: Arc<ScopeLocks>,
}

impl FsStore {
    /// Open a store rooted at an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let meta = fs::metadata(&root).map_err(|e| StoreError::io(&root, e))?;
        if !meta.is_dir() {
            return Err(StoreError::io(
                &root,
                io::Error::new(io::ErrorKind::InvalidInput, "store root is not a directory"),
            ));
        }
        Ok(Self {
            root,
            locks: ScopeLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The filesystem location of an item.
    pub fn resolve(&self, path: &ItemPath) -> PathBuf {
        path.segments().fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    fn metadata(&self, path: &ItemPath) -> StoreResult<Option<fs::Metadata>> {
        let target = self.resolve(path);
        match fs::metadata(&target) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(target, e)),
        }
    }
}

impl MutableStore for FsStore {
    fn kind(&self, path: &ItemPath) -> StoreResult<Option<ItemKind>> {
        Ok(self.metadata(path)?.map(|meta| {
            if meta.is_dir() {
                ItemKind::Container
            } else {
                ItemKind::File
            }
        }))
    }

    fn read(&self, path: &ItemPath) -> StoreResult<Vec<u8>> {
        match self.kind(path)? {
            Some(ItemKind::File) => {
                let target = self.resolve(path);
                fs::read(&target).map_err(|e| StoreError::io(target, e))
            }
            Some(ItemKind::Container) => Err(StoreError::NotAFile(path.clone())),
            None => Err(StoreError::NotFound(path.clone())),
        }
    }

    fn create_or_replace(&self, path: &ItemPath, data: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            match self.kind(&parent)? {
                Some(ItemKind::Container) => {}
                Some(ItemKind::File) => return Err(StoreError::NotAContainer(parent)),
                None => return Err(StoreError::MissingParent(path.clone())),
            }
        }
        if self.kind(path)? == Some(ItemKind::Container) {
            return Err(StoreError::NotAFile(path.clone()));
        }

        let target = self.resolve(path);
        let dir = target.parent().unwrap_or(self.root.as_path());
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| StoreError::Staging {
                path: path.clone(),
                source,
            })?;
        staged
            .write_all(data)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| StoreError::io(staged.path(), e))?;
        staged
            .persist(&target)
            .map_err(|e| StoreError::io(&target, e.error))?;

        debug!(%path, bytes = data.len(), "wrote item");
        Ok(())
    }

    fn delete(&self, path: &ItemPath) -> StoreResult<()> {
        let target = self.resolve(path);
        let result = match self.kind(path)? {
            Some(ItemKind::Container) => fs::remove_dir_all(&target),
            Some(ItemKind::File) => fs::remove_file(&target),
            None => return Err(StoreError::NotFound(path.clone())),
        };
        result.map_err(|e| StoreError::io(target, e))?;
        debug!(%path, "deleted item");
        Ok(())
    }

    fn ensure_container(&self, path: &ItemPath) -> StoreResult<()> {
        let mut chain = path.ancestors();
        chain.reverse();
        chain.push(path.clone());
        for dir in chain {
            match self.kind(&dir)? {
                Some(ItemKind::Container) => {}
                Some(ItemKind::File) => return Err(StoreError::NotAContainer(dir)),
                None => {
                    let target = self.resolve(&dir);
                    match fs::create_dir(&target) {
                        Ok(()) => {}
                        // created concurrently by a disjoint transaction
                        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && target.is_dir() => {}
                        Err(e) => return Err(StoreError::io(target, e)),
                    }
                }
            }
        }
        Ok(())
    }

    fn snapshot(&self, path: &ItemPath) -> StoreResult<Option<Handle>> {
        Ok(FileSource::open(self.resolve(path))?.map(Handle::new))
    }

    fn begin(&self, scope: &Scope) -> StoreResult<ScopeGuard> {
        Ok(self.locks.acquire(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideline_types::NullProgress;

    fn p(s: &str) -> ItemPath {
        ItemPath::new(s).unwrap()
    }

    fn store() -> (tempfile::TempDir, FsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn write_read_round_trip_on_disk() {
        let (dir, store) = store();
        store.ensure_container(&p("src")).unwrap();
        store.create_or_replace(&p("src/lib.rs"), b"fn main() {}").unwrap();

        assert_eq!(
            fs::read(dir.path().join("src").join("lib.rs")).unwrap(),
            b"fn main() {}"
        );
        assert_eq!(store.read(&p("src/lib.rs")).unwrap(), b"fn main() {}");
        assert_eq!(store.kind(&p("src")).unwrap(), Some(ItemKind::Container));
    }

    #[test]
    fn no_scratch_files_left_behind() {
        let (dir, store) = store();
        store.create_or_replace(&p("a"), b"1").unwrap();
        store.create_or_replace(&p("a"), b"2").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a".to_string()]);
    }

    #[test]
    fn missing_parent_is_reported() {
        let (_dir, store) = store();
        assert!(matches!(
            store.create_or_replace(&p("x/y"), b"1"),
            Err(StoreError::MissingParent(_))
        ));
    }

    #[test]
    fn delete_container_removes_tree() {
        let (dir, store) = store();
        store.ensure_container(&p("d/e")).unwrap();
        store.create_or_replace(&p("d/e/f"), b"1").unwrap();
        store.delete(&p("d")).unwrap();
        assert!(!dir.path().join("d").exists());
        assert!(matches!(
            store.delete(&p("d")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn snapshot_reads_disk_content() {
        let (_dir, store) = store();
        store.create_or_replace(&p("a"), b"on disk").unwrap();
        let snap = store.snapshot(&p("a")).unwrap().unwrap();
        assert_eq!(snap.read_bytes(&NullProgress).unwrap(), b"on disk");
        assert!(store.snapshot(&p("b")).unwrap().is_none());
    }

    #[test]
    fn open_rejects_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"").unwrap();
        assert!(matches!(FsStore::open(&file), Err(StoreError::Io { .. })));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unwritable_directory_is_a_staging_failure() {
        // procfs refuses new files even to root.
        let store = FsStore::open("/proc").unwrap();
        let target = p("self/tideline-item");
        assert_eq!(store.kind(&p("self")).unwrap(), Some(ItemKind::Container));

        let err = store.create_or_replace(&target, b"data").unwrap_err();

        assert!(matches!(err, StoreError::Staging { ref path, .. } if *path == target));
        assert_eq!(store.kind(&target).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn staging_failure_leaves_target_untouched() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = store();
        store.ensure_container(&p("ro")).unwrap();
        store.create_or_replace(&p("ro/f"), b"old").unwrap();
        let ro = dir.path().join("ro");
        fs::set_permissions(&ro, fs::Permissions::from_mode(0o555)).unwrap();
        if fs::write(ro.join("write-check"), b"").is_ok() {
            // permissions are not enforced for this user
            fs::set_permissions(&ro, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = store.create_or_replace(&p("ro/f"), b"new");
        fs::set_permissions(&ro, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(StoreError::Staging { .. })));
        assert_eq!(store.read(&p("ro/f")).unwrap(), b"old");
    }
}
