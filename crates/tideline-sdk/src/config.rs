//! Session configuration, loaded from TOML.
//!
//! ```toml
//! local = "work"
//! base = "base"          # optional; absent => two-way comparison
//! remote = "upstream"
//! ignore = ["target/", "*.tmp"]
//! compare = "content"    # or "revision"
//! resolve_pseudo_conflicts = false
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tideline_diff::{Comparator, ContentComparator, RevisionComparator};
use tideline_merge::MergeOptions;
use tracing::{debug, info};

use crate::error::{SdkError, SdkResult};

/// File name looked up in the working directory when no config is given.
pub const CONFIG_FILE: &str = ".tideline.toml";

/// How base and remote snapshots are compared with each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Compare content.
    #[default]
    Content,
    /// Trust revision identifiers; local content is still hashed.
    Revision,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub local: PathBuf,
    /// Common ancestor root. Without one the session compares two-way.
    pub base: Option<PathBuf>,
    pub remote: PathBuf,
    /// Gitignore-style patterns, matched against item paths.
    pub ignore: Vec<String>,
    pub compare: CompareMode,
    pub resolve_pseudo_conflicts: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local: PathBuf::from("."),
            base: None,
            remote: PathBuf::from("."),
            ignore: Vec::new(),
            compare: CompareMode::default(),
            resolve_pseudo_conflicts: false,
        }
    }
}

impl SessionConfig {
    /// Parse TOML. `origin` only labels errors.
    pub fn from_toml(text: &str, origin: &Path) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load a config file. Relative roots are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> SdkResult<Self> {
        info!(path = %path.display(), "loading configuration");
        let text = std::fs::read_to_string(path).map_err(|e| SdkError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&text, path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(dir))
    }

    /// Load [`CONFIG_FILE`] from `dir` if it exists.
    pub fn discover(dir: &Path) -> SdkResult<Option<Self>> {
        let candidate = dir.join(CONFIG_FILE);
        if !candidate.is_file() {
            debug!(dir = %dir.display(), "no configuration file");
            return Ok(None);
        }
        Self::load(&candidate).map(Some)
    }

    /// Resolve relative roots against `dir`.
    pub fn relative_to(mut self, dir: &Path) -> Self {
        let anchor = |p: PathBuf| if p.is_relative() { dir.join(p) } else { p };
        self.local = anchor(self.local);
        self.base = self.base.map(anchor);
        self.remote = anchor(self.remote);
        self
    }

    pub fn is_three_way(&self) -> bool {
        self.base.is_some()
    }

    /// The comparator every node of the session is classified with.
    pub fn comparator(&self) -> Arc<dyn Comparator> {
        match (self.is_three_way(), self.compare) {
            (false, _) => Arc::new(ContentComparator::two_way()),
            (true, CompareMode::Content) => Arc::new(ContentComparator::three_way()),
            (true, CompareMode::Revision) => Arc::new(RevisionComparator),
        }
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            resolve_pseudo_conflicts: self.resolve_pseudo_conflicts,
        }
    }
}
