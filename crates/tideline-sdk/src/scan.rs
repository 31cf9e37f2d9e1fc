//! Directory scanning with ignore rules.

use std::collections::BTreeSet;
use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tideline_store::fs::STAGING_PREFIX;
use tideline_types::ItemPath;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{SdkError, SdkResult};

/// Lists the files under a root, skipping ignored names and scratch files.
pub struct Scanner {
    ignore: Gitignore,
}

impl Scanner {
    /// Build a scanner from gitignore-style patterns.
    pub fn new(patterns: &[String]) -> SdkResult<Self> {
        let mut builder = GitignoreBuilder::new(Path::new(""));
        for pattern in patterns {
            builder.add_line(None, pattern).map_err(|e| SdkError::Config {
                path: Path::new("ignore").to_path_buf(),
                reason: format!("bad pattern {pattern:?}: {e}"),
            })?;
        }
        let ignore = builder.build().map_err(|e| SdkError::Config {
            path: Path::new("ignore").to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { ignore })
    }

    pub fn is_ignored(&self, path: &ItemPath, is_dir: bool) -> bool {
        path.name().starts_with(STAGING_PREFIX)
            || self.ignore.matched(path.as_str(), is_dir).is_ignore()
    }

    /// Every file beneath `root`, as item paths relative to it. A missing
    /// root has no files; names that are not valid item paths (not UTF-8,
    /// for one) are skipped along with anything beneath them.
    pub fn files(&self, root: &Path) -> SdkResult<BTreeSet<ItemPath>> {
        if !root.exists() {
            debug!(root = %root.display(), "scan root does not exist");
            return Ok(BTreeSet::new());
        }

        let mut files = BTreeSet::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match relative(root, entry.path()) {
                Some(path) => !self.is_ignored(&path, entry.file_type().is_dir()),
                None => {
                    warn!(
                        path = %entry.path().display(),
                        "skipping name that is not an item path"
                    );
                    false
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| SdkError::Scan {
                path: e.path().unwrap_or(root).to_path_buf(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = relative(root, entry.path()) else {
                continue;
            };
            trace!(%path, "found");
            files.insert(path);
        }
        debug!(root = %root.display(), files = files.len(), "scanned");
        Ok(files)
    }
}

fn relative(root: &Path, path: &Path) -> Option<ItemPath> {
    let rel = path.strip_prefix(root).ok()?;
    ItemPath::new(rel.to_str()?).ok()
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("patterns", &self.ignore.num_ignores())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scanner(patterns: &[&str]) -> Scanner {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        Scanner::new(&patterns).unwrap()
    }

    fn names(files: &BTreeSet<ItemPath>) -> Vec<&str> {
        files.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn lists_nested_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("top.txt"), "1").unwrap();
        fs::write(dir.path().join("a/b/deep.txt"), "2").unwrap();

        let files = scanner(&[]).files(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["a/b/deep.txt", "top.txt"]);
    }

    #[test]
    fn ignore_patterns_prune_directories_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        fs::write(dir.path().join("target/debug/out"), "x").unwrap();
        fs::write(dir.path().join("keep.rs"), "x").unwrap();
        fs::write(dir.path().join("scratch.tmp"), "x").unwrap();

        let files = scanner(&["target/", "*.tmp"]).files(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["keep.rs"]);
    }

    #[test]
    fn staging_files_are_always_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(format!("{STAGING_PREFIX}abc")), "x").unwrap();
        fs::write(dir.path().join("real"), "x").unwrap();

        let files = scanner(&[]).files(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["real"]);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scanner(&[]).files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let bad = OsStr::from_bytes(b"caf\xe9");
        fs::write(dir.path().join(bad), "x").unwrap();
        fs::write(dir.path().join("ok.txt"), "x").unwrap();

        let files = scanner(&[]).files(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["ok.txt"]);
    }
}
