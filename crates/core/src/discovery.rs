//! Script discovery over a target directory tree.
//!
//! [`Discovery`] walks the tree depth-first with subdirectories visited in
//! lexical order. Every visited directory produces one [`DirectoryBatch`]
//! whose units are already in run order (see [`crate::ordering`]). A
//! directory's own files come before anything in its subdirectories.
//!
//! Ignored directory names are pruned at any depth. Files without a
//! recognised script suffix are skipped silently.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::ordering;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// File suffix for Python scripts.
pub const PYTHON_SUFFIX: &str = ".py";

/// File suffix for shell scripts.
pub const SHELL_SUFFIX: &str = ".sh";

/// Default name of the reserved output directory under the scan root.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Directory names that are never descended into, in addition to the
/// configured output directory.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".hg",
    ".svn",
    // CI metadata
    ".github",
    ".gitlab",
    ".circleci",
    // Dependency caches / virtualenvs
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Runtime kind of a discovered script, derived purely from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScriptKind {
    #[serde(rename = "script-python")]
    Python,
    #[serde(rename = "script-shell")]
    Shell,
}

impl ScriptKind {
    /// Classify a file name, or `None` if it is not a runnable script.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if file_name.ends_with(PYTHON_SUFFIX) {
            Some(Self::Python)
        } else if file_name.ends_with(SHELL_SUFFIX) {
            Some(Self::Shell)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "script-python",
            Self::Shell => "script-shell",
        }
    }
}

/// One runnable script. Identity is `relative_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunUnit {
    /// Path relative to the scan root, `/`-separated on every platform.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    /// Directory containing the script; used as the child's working directory.
    pub directory: PathBuf,
    /// Display form of the file name; lossy for non-UTF-8 names.
    pub file_name: String,
    pub kind: ScriptKind,
    /// Lower runs first.
    pub priority: u8,
}

/// The ordered units found directly inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryBatch {
    pub directory: PathBuf,
    pub units: Vec<RunUnit>,
}

/// Discovery filters.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Directory names pruned at any depth.
    pub ignored_dirs: BTreeSet<String>,
    /// File name of the orchestrator's own entry point; never treated as a unit.
    pub self_name: Option<String>,
}

impl DiscoveryConfig {
    /// Default ignore set plus the given reserved output directory name.
    pub fn new(output_dir: &str) -> Self {
        let mut ignored_dirs: BTreeSet<String> =
            DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect();
        ignored_dirs.insert(output_dir.to_string());
        Self {
            ignored_dirs,
            self_name: None,
        }
    }

    pub fn with_self_name(mut self, name: impl Into<String>) -> Self {
        self.self_name = Some(name.into());
        self
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.contains(name)
    }

    fn is_self(&self, file_name: &str) -> bool {
        self.self_name.as_deref() == Some(file_name)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Lazy, deterministic walker over a scan root.
pub struct Discovery {
    root: PathBuf,
    config: DiscoveryConfig,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>, config: DiscoveryConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Visit directories depth-first (pre-order, lexical) and yield one
    /// ordered batch per directory. Directories are listed only when the
    /// iterator reaches them.
    pub fn batches(&self) -> impl Iterator<Item = DirectoryBatch> + '_ {
        let config = &self.config;
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !config.is_ignored_dir(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable path during discovery");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .map(move |entry| self.scan_directory(entry.path()))
    }

    /// Flattened view of [`Self::batches`].
    pub fn units(&self) -> impl Iterator<Item = RunUnit> + '_ {
        self.batches().flat_map(|batch| batch.units)
    }

    /// List the regular files directly inside `dir` and turn the runnable
    /// ones into ordered units.
    fn scan_directory(&self, dir: &Path) -> DirectoryBatch {
        // (display name, real path); the real path keeps non-UTF-8 names intact.
        let mut files: Vec<(String, PathBuf)> = Vec::new();
        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_file() {
                        files.push((entry.file_name().to_string_lossy().into_owned(), path));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot list directory");
            }
        }

        files.sort_by(|(a, _), (b, _)| ordering::run_order(a, b));

        let units = files
            .into_iter()
            .filter_map(|(name, path)| self.classify(dir, name, path))
            .collect();

        DirectoryBatch {
            directory: dir.to_path_buf(),
            units,
        }
    }

    fn classify(&self, dir: &Path, file_name: String, absolute_path: PathBuf) -> Option<RunUnit> {
        if self.config.is_self(&file_name) {
            tracing::debug!(file = %file_name, "Skipping orchestrator entry point");
            return None;
        }
        let kind = ScriptKind::from_file_name(&file_name)?;
        let relative_path = relative_key(&self.root, &absolute_path);

        Some(RunUnit {
            relative_path,
            absolute_path,
            directory: dir.to_path_buf(),
            priority: ordering::priority_class(&file_name),
            file_name,
            kind,
        })
    }
}

/// Build the state key for `path`: relative to `root`, `/`-separated.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
