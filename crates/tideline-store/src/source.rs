//! Read-only revisions of item content.
//!
//! Base and remote snapshots reach the core as [`Handle`]s: shared references to
//! a [`ContentSource`] that is immutable once classification begins.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tideline_types::{ContentId, ProgressMonitor};

use crate::error::{StoreError, StoreResult};

/// One revision of an item's content.
///
/// Implementations must be immutable: the same source always reports the same
/// revision and the same bytes.
pub trait ContentSource: Send + Sync + fmt::Debug {
    /// Stable identifier of this revision. Two sources with the same revision
    /// identifier are the same snapshot.
    fn revision(&self) -> &str;

    /// Whether the revision still exists on its side.
    fn exists(&self) -> bool {
        true
    }

    /// Fetch the content bytes.
    fn read_bytes(&self, progress: &dyn ProgressMonitor) -> StoreResult<Vec<u8>>;

    /// Content hash if known without reading, used for fast comparison.
    fn content_id(&self) -> Option<ContentId> {
        None
    }
}

/// Shared, immutable reference to a [`ContentSource`].
///
/// Handles compare equal when their revision identifiers are equal.
#[derive(Clone)]
pub struct Handle(Arc<dyn ContentSource>);

impl Handle {
    pub fn new(source: impl ContentSource + 'static) -> Self {
        Self(Arc::new(source))
    }

    pub fn from_arc(source: Arc<dyn ContentSource>) -> Self {
        Self(source)
    }

    pub fn revision(&self) -> &str {
        self.0.revision()
    }

    pub fn exists(&self) -> bool {
        self.0.exists()
    }

    pub fn read_bytes(&self, progress: &dyn ProgressMonitor) -> StoreResult<Vec<u8>> {
        self.0.read_bytes(progress)
    }

    pub fn content_id(&self) -> Option<ContentId> {
        self.0.content_id()
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.revision() == other.revision()
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.revision())
    }
}

/// Content held in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    revision: String,
    data: Vec<u8>,
    id: ContentId,
}

impl MemorySource {
    /// A source whose revision identifier is the content hash.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let id = ContentId::from_bytes(&data);
        Self {
            revision: id.to_hex(),
            data,
            id,
        }
    }

    /// A source with an explicit revision identifier (e.g. a server revision tag).
    pub fn with_revision(revision: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            revision: revision.into(),
            id: ContentId::from_bytes(&data),
            data,
        }
    }

    /// Wrap into a [`Handle`].
    pub fn into_handle(self) -> Handle {
        Handle::new(self)
    }
}

impl ContentSource for MemorySource {
    fn revision(&self) -> &str {
        &self.revision
    }

    fn read_bytes(&self, _progress: &dyn ProgressMonitor) -> StoreResult<Vec<u8>> {
        Ok(self.data.clone())
    }

    fn content_id(&self) -> Option<ContentId> {
        Some(self.id)
    }
}

/// Content of a file on disk, identified by its hash at open time.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
    revision: String,
    id: ContentId,
}

impl FileSource {
    /// Open a file and hash its current content. Returns `Ok(None)` if the
    /// path is not a regular file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }
        let data = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let id = ContentId::from_bytes(&data);
        Ok(Some(Self {
            path: path.to_path_buf(),
            revision: id.to_hex(),
            id,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContentSource for FileSource {
    fn revision(&self) -> &str {
        &self.revision
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_bytes(&self, _progress: &dyn ProgressMonitor) -> StoreResult<Vec<u8>> {
        let data = std::fs::read(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        if ContentId::from_bytes(&data) != self.id {
            return Err(StoreError::Unavailable {
                revision: self.revision.clone(),
                reason: format!("{} changed since it was scanned", self.path.display()),
            });
        }
        Ok(data)
    }

    fn content_id(&self) -> Option<ContentId> {
        Some(self.id)
    }
}
