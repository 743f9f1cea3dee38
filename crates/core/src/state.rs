//! Durable record of completed units.
//!
//! The state lives in `<root>/execution_state.json` as a pretty-printed
//! document: `{"executed": [...], "created_at": "..."}`. Every mutation
//! rewrites the whole document through a temp file and a rename, so a
//! crash leaves either the previous or the new state on disk.
//!
//! Loading never fails: a missing file yields an empty state and a corrupt
//! one is logged and treated as empty. Losing state only causes redundant
//! re-execution.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the persisted state, relative to the scan root.
pub const STATE_FILE: &str = "execution_state.json";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failure to persist the state document.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to serialize execution state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write execution state to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// ExecutionState
// ---------------------------------------------------------------------------

/// Set of relative paths whose unit has completed successfully.
///
/// Insertion order is preserved so the file reads as a run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    #[serde(default)]
    pub executed: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ExecutionState {
    pub fn empty() -> Self {
        Self {
            executed: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_complete(&self, relative_path: &str) -> bool {
        self.executed.iter().any(|p| p == relative_path)
    }

    /// Add `relative_path` if absent. Returns `true` if it was added.
    pub fn insert(&mut self, relative_path: &str) -> bool {
        if self.is_complete(relative_path) {
            return false;
        }
        self.executed.push(relative_path.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.executed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Reads and writes the state document for one scan root.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store backed by `<root>/execution_state.json`.
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(STATE_FILE),
        }
    }

    /// Store backed by an explicit file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, falling back to empty on any problem.
    pub fn load(&self) -> ExecutionState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No execution state yet");
                return ExecutionState::empty();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Cannot read execution state, starting empty",
                );
                return ExecutionState::empty();
            }
        };

        match serde_json::from_str::<ExecutionState>(&contents) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Execution state is corrupt, starting empty",
                );
                ExecutionState::empty()
            }
        }
    }

    /// Discard all history and persist an empty state.
    ///
    /// The returned state is empty even if the write failed.
    pub fn reset(&self) -> ExecutionState {
        let state = ExecutionState::empty();
        if let Err(e) = self.save(&state) {
            tracing::error!(error = %e, "Failed to persist reset execution state");
        }
        state
    }

    /// Record `relative_path` as complete and persist immediately.
    ///
    /// Returns `false` if the document could not be written; the in-memory
    /// state is updated either way.
    pub fn mark_complete(&self, state: &mut ExecutionState, relative_path: &str) -> bool {
        state.insert(relative_path);
        match self.save(state) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    unit = relative_path,
                    error = %e,
                    "Failed to persist execution state",
                );
                false
            }
        }
    }

    /// Replace the document on disk with `state`.
    pub fn save(&self, state: &ExecutionState) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(state)?;
        let tmp_path = self.tmp_path();
        let write_err = |source: std::io::Error| StateError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
        file.write_all(&json).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
