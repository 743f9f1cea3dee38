//! `seqexec` -- resumable, order-aware batch script runner.
//!
//! Walks a directory tree, runs every `.py` and `.sh` script exactly once
//! in a deterministic order, and records progress in
//! `<DIRECTORY>/execution_state.json` so an interrupted or failed run
//! resumes where it stopped.
//!
//! # Environment variables
//!
//! | Variable                     | Default                      | Description                         |
//! |------------------------------|------------------------------|-------------------------------------|
//! | `SEQEXEC_PYTHON`             | `python3`                    | Interpreter for `.py` scripts       |
//! | `SEQEXEC_SHELL`              | `bash`                       | Interpreter for `.sh` scripts       |
//! | `SEQEXEC_UNIT_TIMEOUT_SECS`  | unset                        | Per-script timeout                  |
//! | `SEQEXEC_OUTPUT_DIR`         | `output`                     | Output directory name under root    |
//! | `SEQEXEC_ENTRY_NAME`         | this executable's file name  | File name excluded from discovery   |
//! | `SEQEXEC_HISTORY_DB`         | `<root>/<output>/history.db` | Run history database                |
//! | `SEQEXEC_UPLOAD_URL`         | unset                        | Enables artifact upload             |
//! | `SEQEXEC_UPLOAD_DESTINATION` | `seqexec-results`            | Remote folder for uploads           |
//! | `SEQEXEC_UPLOAD_TOKEN`       | unset                        | Bearer token for uploads            |

mod args;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use seqexec_core::orchestrator::{validate_root, Orchestrator, RunSummary};
use seqexec_sink::ReportingSink;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::Args;
use config::LaunchConfig;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seqexec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "seqexec failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    // Validate before the sink creates anything under the root.
    let root = validate_root(&args.directory)
        .with_context(|| format!("invalid directory {}", args.directory.display()))?;

    let config = LaunchConfig::from_env(&root, &args);
    let sink = ReportingSink::from_config(&config.sink).await;
    let orchestrator = Orchestrator::new(config.orchestrator, Arc::new(sink))?;

    tracing::info!(
        root = %orchestrator.root().display(),
        output_dir = %orchestrator.output_dir().display(),
        reset = args.reset,
        "Starting seqexec",
    );

    tokio::select! {
        summary = orchestrator.run() => Ok(report(&summary)),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; progress so far is saved");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report(summary: &RunSummary) -> ExitCode {
    if summary.unpersisted > 0 {
        tracing::warn!(
            count = summary.unpersisted,
            "Some completions were not saved; a later run may repeat them",
        );
    }

    match &summary.failure {
        None if summary.is_success() => {
            tracing::info!(
                executed = summary.executed.len(),
                skipped = summary.skipped.len(),
                harvested = summary.harvested,
                "All scripts completed",
            );
            ExitCode::SUCCESS
        }
        Some(failure) => {
            tracing::error!(
                unit = %failure.unit,
                executed = summary.executed.len(),
                skipped = summary.skipped.len(),
                "Run halted: {}",
                failure.message,
            );
            ExitCode::FAILURE
        }
        None => {
            tracing::error!(phase = ?summary.phase, "Run did not finish");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use seqexec_core::orchestrator::{RunPhase, UnitFailure};

    use super::*;

    fn summary(phase: RunPhase, failure: Option<UnitFailure>) -> RunSummary {
        RunSummary {
            phase,
            executed: vec!["a.sh".to_string()],
            skipped: Vec::new(),
            harvested: 0,
            unpersisted: 0,
            failure,
        }
    }

    #[test]
    fn completed_run_exits_zero() {
        assert_eq!(report(&summary(RunPhase::Done, None)), ExitCode::SUCCESS);
    }

    #[test]
    fn lost_resume_point_still_exits_zero() {
        let mut done = summary(RunPhase::Done, None);
        done.unpersisted = 1;
        assert_eq!(report(&done), ExitCode::SUCCESS);
    }

    #[test]
    fn halted_run_exits_one() {
        let failure = UnitFailure {
            unit: "b.sh".to_string(),
            message: "exit code 2".to_string(),
        };
        assert_eq!(
            report(&summary(RunPhase::Halted, Some(failure))),
            ExitCode::FAILURE
        );
    }

    #[test]
    fn unfinished_run_exits_one() {
        assert_eq!(
            report(&summary(RunPhase::ProcessingUnit, None)),
            ExitCode::FAILURE
        );
    }

    #[tokio::test]
    async fn invalid_root_fails_before_creating_anything() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing");
        let args = Args {
            directory: missing.clone(),
            reset: true,
            timeout: None,
            no_export: false,
        };

        let result = run(args).await;

        assert!(result.is_err());
        assert!(!missing.exists());
        let created: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .flatten()
            .map(|e| e.path())
            .collect();
        assert!(created.is_empty(), "unexpected files: {created:?}");
    }
}
