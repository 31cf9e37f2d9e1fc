//! Item identity.
//!
//! Every synchronized artifact is identified by an [`ItemPath`]: a normalized,
//! workspace-relative, `/`-separated path. Paths order lexicographically, which
//! keeps every descendant of a path contiguous in a `BTreeMap` keyed by path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Normalized workspace-relative identity of an item.
///
/// Invariants: never empty, never absolute, no `.` or `..` segments, no empty
/// segments. Backslashes are accepted on input and normalized to `/`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemPath(String);

impl ItemPath {
    /// Parse and normalize a path.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TypeError> {
        let raw = raw.as_ref();
        let invalid = |reason| TypeError::InvalidPath {
            path: raw.to_string(),
            reason,
        };

        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') {
            return Err(invalid("absolute paths are not item identities"));
        }
        let trimmed = unified.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(invalid("empty path"));
        }

        for segment in trimmed.split('/') {
            match segment {
                "" => return Err(invalid("empty segment")),
                "." | ".." => return Err(invalid("relative segment")),
                _ => {}
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments from the root down.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The last segment.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The containing path, or `None` for a top-level item.
    pub fn parent(&self) -> Option<ItemPath> {
        self.0
            .rfind('/')
            .map(|idx| ItemPath(self.0[..idx].to_string()))
    }

    /// All ancestors, nearest first.
    pub fn ancestors(&self) -> Vec<ItemPath> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(p) = current {
            current = p.parent();
            out.push(p);
        }
        out
    }

    /// Append a child segment (which may itself contain `/`).
    pub fn join(&self, child: &str) -> Result<ItemPath, TypeError> {
        ItemPath::new(format!("{}/{}", self.0, child))
    }

    /// Segment-aware prefix test: `a/b/c` starts with `a/b`, `a/bc` does not.
    pub fn starts_with(&self, prefix: &ItemPath) -> bool {
        self.0 == prefix.0
            || (self.0.len() > prefix.0.len()
                && self.0.starts_with(&prefix.0)
                && self.0.as_bytes()[prefix.0.len()] == b'/')
    }

    /// `true` if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &ItemPath) -> bool {
        self != other && other.starts_with(self)
    }

    /// `true` if either path contains the other.
    pub fn overlaps(&self, other: &ItemPath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }
}

impl fmt::Debug for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemPath({})", self.0)
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemPath::new(s)
    }
}

impl TryFrom<String> for ItemPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ItemPath::new(value)
    }
}

impl From<ItemPath> for String {
    fn from(path: ItemPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ItemPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether an item holds content or other items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A leaf item with byte content. Only files are merged.
    File,
    /// A folder-like item that contains other items.
    Container,
}
