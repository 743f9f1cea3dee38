//! Types shared by every script executor.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a unit is launched with besides its own path.
#[derive(Debug, Clone, Default)]
pub struct ScriptInput {
    /// Added on top of the inherited environment.
    pub env_vars: Vec<(String, String)>,
    /// Child working directory; the caller's when `None`.
    pub working_directory: Option<PathBuf>,
    /// Kill the child after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Exit status and captured streams of a finished child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the child was terminated by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Reasons a child never produced an exit status.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Script file or interpreter missing.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Killed after exceeding its timeout.
    #[error("Timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    /// Classify a failed `spawn` of `program`.
    pub fn from_spawn(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Launches a script file and waits for it.
///
/// A non-zero exit is still `Ok`; only launch failures, I/O failures and
/// timeouts are errors.
pub trait ScriptExecutor: Send + Sync {
    fn execute(
        &self,
        script_path: &Path,
        input: ScriptInput,
    ) -> impl std::future::Future<Output = Result<ScriptOutput, ScriptError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn spawn_errors_are_classified() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        assert_matches!(
            ScriptError::from_spawn("python9", missing),
            ScriptError::NotFound(p) if p == "python9"
        );

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_matches!(
            ScriptError::from_spawn("/opt/locked", denied),
            ScriptError::PermissionDenied(_)
        );

        let other = std::io::Error::other("boom");
        let err = ScriptError::from_spawn("bash", other);
        assert_matches!(err, ScriptError::Io(_));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn timeout_message_carries_elapsed_time() {
        let err = ScriptError::Timeout { elapsed_ms: 1500 };
        assert_eq!(err.to_string(), "Timed out after 1500ms");
    }

    #[test]
    fn success_means_exit_zero() {
        let mut output = ScriptOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 1,
        };
        assert!(output.success());
        output.exit_code = -1;
        assert!(!output.success());
    }
}
