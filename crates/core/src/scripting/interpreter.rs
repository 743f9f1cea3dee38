//! Executor that hands the script path to an interpreter program.
//!
//! Both runtimes work the same way (`<program> <script>`), so one type
//! covers them. The Python interpreter is configured once per run, so every
//! unit sees the same Python runtime.

use std::path::Path;

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_SHELL: &str = "bash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterExecutor {
    program: String,
}

impl InterpreterExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ScriptExecutor for InterpreterExecutor {
    async fn execute(
        &self,
        script_path: &Path,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        // Report a vanished script as such, not as an interpreter error.
        if tokio::fs::metadata(script_path).await.is_err() {
            return Err(ScriptError::NotFound(script_path.display().to_string()));
        }

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg(script_path);
        subprocess::run_command(&mut cmd, input).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
