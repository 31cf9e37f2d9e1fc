use tideline_types::{ItemKind, ItemPath};

use crate::error::{StoreError, StoreResult};
use crate::lock::ScopeGuard;
use crate::scope::{combined_scope, Scope};
use crate::source::Handle;

/// The local side of a synchronization: a tree of items that can be mutated.
///
/// All implementations must satisfy these invariants:
/// - `create_or_replace` is all-or-nothing for a single item: readers observe
///   either the old content or the new content, never a partial write.
/// - `begin` blocks while another thread holds an overlapping scope and
///   returns a guard that holds the scope until dropped.
/// - Mutations are not rolled back when a later mutation in the same scope
///   fails.
/// - All I/O errors are propagated, never silently ignored.
pub trait MutableStore: Send + Sync {
    /// The kind of item at `path`, or `None` if nothing exists there.
    fn kind(&self, path: &ItemPath) -> StoreResult<Option<ItemKind>>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &ItemPath) -> StoreResult<bool> {
        Ok(self.kind(path)?.is_some())
    }

    /// Read a file's content.
    ///
    /// Returns [`StoreError::NotFound`] if missing and
    /// [`StoreError::NotAFile`] for containers.
    fn read(&self, path: &ItemPath) -> StoreResult<Vec<u8>>;

    /// Create a file or replace its content. The parent container must exist.
    fn create_or_replace(&self, path: &ItemPath, data: &[u8]) -> StoreResult<()>;

    /// Delete an item and everything beneath it.
    fn delete(&self, path: &ItemPath) -> StoreResult<()>;

    /// Create a container and any missing ancestors. No-op if it exists.
    fn ensure_container(&self, path: &ItemPath) -> StoreResult<()>;

    /// The current content of a file as an immutable handle, or `None` if no
    /// file exists at `path`.
    fn snapshot(&self, path: &ItemPath) -> StoreResult<Option<Handle>>;

    /// The scope needed to mutate all of `paths` together.
    fn combined_scope(&self, paths: &[ItemPath]) -> Scope {
        combined_scope(paths)
    }

    /// Enter a transactional region covering `scope`.
    fn begin(&self, scope: &Scope) -> StoreResult<ScopeGuard>;
}

/// Run `body` while holding `scope` on `store`.
pub fn run_in_transaction<T, E>(
    store: &dyn MutableStore,
    scope: &Scope,
    body: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    let _guard = store.begin(scope)?;
    body()
}
