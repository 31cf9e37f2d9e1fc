//! Lock scopes over item paths.
//!
//! A [`Scope`] is the set of items an operation may mutate. Holding a path
//! covers everything beneath it, so a scope is kept normalized: no member is an
//! ancestor of another member.

use std::collections::BTreeSet;
use std::fmt;

use tideline_types::ItemPath;

/// A normalized set of item paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    roots: BTreeSet<ItemPath>,
}

impl Scope {
    /// The empty scope. Conflicts with nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The scope covering a single item and its descendants.
    pub fn of(path: ItemPath) -> Self {
        let mut roots = BTreeSet::new();
        roots.insert(path);
        Self { roots }
    }

    /// Add a path, dropping members it covers. No-op if already covered.
    pub fn insert(&mut self, path: ItemPath) {
        if self.contains(&path) {
            return;
        }
        self.roots.retain(|held| !path.is_ancestor_of(held));
        self.roots.insert(path);
    }

    /// Union of two scopes.
    pub fn combine(mut self, other: &Scope) -> Self {
        for path in &other.roots {
            self.insert(path.clone());
        }
        self
    }

    /// Whether `path` is covered by a member of this scope.
    pub fn contains(&self, path: &ItemPath) -> bool {
        path.ancestors()
            .iter()
            .chain(std::iter::once(path))
            .any(|candidate| self.roots.contains(candidate))
    }

    /// Whether `other` is entirely covered by this scope.
    pub fn covers(&self, other: &Scope) -> bool {
        other.roots.iter().all(|path| self.contains(path))
    }

    /// Whether any member of `self` overlaps any member of `other`.
    pub fn conflicts_with(&self, other: &Scope) -> bool {
        self.roots
            .iter()
            .any(|a| other.roots.iter().any(|b| a.overlaps(b)))
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Members in path order.
    pub fn paths(&self) -> impl Iterator<Item = &ItemPath> {
        self.roots.iter()
    }
}

impl FromIterator<ItemPath> for Scope {
    fn from_iter<I: IntoIterator<Item = ItemPath>>(iter: I) -> Self {
        let mut scope = Scope::empty();
        for path in iter {
            scope.insert(path);
        }
        scope
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.roots.iter().map(ItemPath::as_str).collect();
        write!(f, "[{}]", joined.join(", "))
    }
}

/// Union of the per-item scopes of `paths`.
///
/// Pure and independent of any store: batch operations compute this once, up
/// front, and hold it for the whole batch.
pub fn combined_scope<'a>(paths: impl IntoIterator<Item = &'a ItemPath>) -> Scope {
    paths.into_iter().cloned().collect()
}
