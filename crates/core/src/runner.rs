//! Runs one [`RunUnit`] and reduces the result to a [`RunOutcome`].
//!
//! The working directory is always the unit's own directory so scripts can
//! reference sibling files by relative path. Launch failures, timeouts and
//! non-zero exits all come back as a failed outcome; nothing escapes this
//! boundary as an error.

use std::time::Duration;

use crate::discovery::{RunUnit, ScriptKind};
use crate::scripting::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use crate::scripting::interpreter::{InterpreterExecutor, DEFAULT_PYTHON, DEFAULT_SHELL};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Interpreter selection and the optional per-unit timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub python: String,
    pub shell: String,
    pub timeout: Option<Duration>,
}

impl RunnerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default   |
    /// |-----------------------------|-----------|
    /// | `SEQEXEC_PYTHON`            | `python3` |
    /// | `SEQEXEC_SHELL`             | `bash`    |
    /// | `SEQEXEC_UNIT_TIMEOUT_SECS` | unset     |
    ///
    /// A timeout of `0` or an unparsable value means no timeout.
    pub fn from_env() -> Self {
        let python = std::env::var("SEQEXEC_PYTHON").unwrap_or_else(|_| DEFAULT_PYTHON.into());
        let shell = std::env::var("SEQEXEC_SHELL").unwrap_or_else(|_| DEFAULT_SHELL.into());
        let timeout = std::env::var("SEQEXEC_UNIT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            python,
            shell,
            timeout,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            timeout: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

/// Result of running one unit. Owned by the orchestrator for one iteration.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub unit: RunUnit,
    pub success: bool,
    /// `None` when the process never produced an exit status.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Launch failure or timeout description.
    pub error: Option<String>,
}

impl RunOutcome {
    fn from_output(unit: &RunUnit, output: ScriptOutput) -> Self {
        Self {
            unit: unit.clone(),
            success: output.success(),
            exit_code: Some(output.exit_code),
            stdout: output.stdout,
            stderr: output.stderr,
            duration_ms: output.duration_ms,
            error: None,
        }
    }

    fn from_error(unit: &RunUnit, err: ScriptError) -> Self {
        let duration_ms = match &err {
            ScriptError::Timeout { elapsed_ms } => *elapsed_ms,
            _ => 0,
        };
        Self {
            unit: unit.clone(),
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms,
            error: Some(err.to_string()),
        }
    }

    /// One-line description of why the unit failed, including stderr.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        match (&self.error, self.exit_code) {
            (Some(err), _) => err.clone(),
            (None, Some(code)) if stderr.is_empty() => format!("exit code {code}"),
            (None, Some(code)) => format!("exit code {code}: {stderr}"),
            (None, None) => "unknown failure".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Dispatches units to the executor matching their [`ScriptKind`].
pub struct Runner {
    python: InterpreterExecutor,
    shell: InterpreterExecutor,
    timeout: Option<Duration>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            python: InterpreterExecutor::new(config.python),
            shell: InterpreterExecutor::new(config.shell),
            timeout: config.timeout,
        }
    }

    /// Run `unit` to completion with `env_vars` added to its environment.
    pub async fn run(&self, unit: &RunUnit, env_vars: Vec<(String, String)>) -> RunOutcome {
        let input = ScriptInput {
            env_vars,
            working_directory: Some(unit.directory.clone()),
            timeout: self.timeout,
        };

        tracing::info!(
            unit = %unit.relative_path,
            kind = unit.kind.name(),
            cwd = %unit.directory.display(),
            "Running unit",
        );

        let result = match unit.kind {
            ScriptKind::Python => self.python.execute(&unit.absolute_path, input).await,
            ScriptKind::Shell => self.shell.execute(&unit.absolute_path, input).await,
        };

        match result {
            Ok(output) => RunOutcome::from_output(unit, output),
            Err(e) => RunOutcome::from_error(unit, e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
