//! The execution-state machine.
//!
//! ```text
//! Scanning -> ProcessingUnit* -> Done
//!                  |
//!                  +-> Halted   (first failed unit; absorbing)
//! ```
//!
//! For each discovered unit, in directory and priority order:
//!
//! 1. Already in the execution state: report `skipped`, launch nothing.
//! 2. Otherwise run it. On success, persist completion before anything
//!    else, report `success`, then harvest and export any structured result.
//! 3. On failure, report `failure` and stop. No later unit in this or any
//!    following directory is attempted.
//!
//! Dropping the future returned by [`Orchestrator::run`] kills the child in
//! flight; the state on disk is exactly as of the last completed unit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::discovery::{Discovery, DiscoveryConfig, RunUnit, DEFAULT_OUTPUT_DIR};
use crate::error::CoreError;
use crate::harvest::{result_base_name, HarvestSource, ResultHarvester, RESULT_FILE_ENV};
use crate::runner::{RunOutcome, Runner, RunnerConfig};
use crate::sink::{OutcomeRecord, OutcomeStatus, Sink};
use crate::state::{ExecutionState, StateStore};

/// Environment variable carrying the absolute scan root to each unit.
pub const ROOT_ENV: &str = "SEQEXEC_ROOT";

/// Environment variable carrying the unit's relative path.
pub const UNIT_ENV: &str = "SEQEXEC_UNIT";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory to scan.
    pub root: PathBuf,
    /// Name of the reserved output directory under `root`.
    pub output_dir_name: String,
    /// File name of the orchestrator's own entry point, excluded from discovery.
    pub self_name: Option<String>,
    /// Discard persisted state before scanning.
    pub reset: bool,
    pub runner: RunnerConfig,
}

impl OrchestratorConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir_name: DEFAULT_OUTPUT_DIR.to_string(),
            self_name: None,
            reset: false,
            runner: RunnerConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Scanning,
    ProcessingUnit,
    Done,
    Halted,
}

/// The unit that halted the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: String,
    pub message: String,
}

/// What one orchestrator pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub phase: RunPhase,
    /// Units launched and completed in this pass, in order.
    pub executed: Vec<String>,
    /// Units skipped as already complete, in order.
    pub skipped: Vec<String>,
    /// Number of structured results handed to the sink.
    pub harvested: usize,
    /// Completions that could not be written to the state file. Non-zero
    /// means a later run may repeat those units.
    pub unpersisted: usize,
    pub failure: Option<UnitFailure>,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            phase: RunPhase::Scanning,
            executed: Vec::new(),
            skipped: Vec::new(),
            harvested: 0,
            unpersisted: 0,
            failure: None,
        }
    }

    /// `true` only when every discovered unit was skipped or succeeded.
    pub fn is_success(&self) -> bool {
        self.phase == RunPhase::Done
    }
}

enum UnitStep {
    Skipped,
    Completed { harvested: bool, persisted: bool },
    Failed(UnitFailure),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    root: PathBuf,
    output_dir: PathBuf,
    reset: bool,
    discovery: Discovery,
    store: StateStore,
    runner: Runner,
    harvester: ResultHarvester,
    sink: Arc<dyn Sink>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("root", &self.root)
            .field("output_dir", &self.output_dir)
            .field("reset", &self.reset)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Validate the root and wire up the components.
    ///
    /// Fails only if `config.root` is missing or not a directory; nothing
    /// on disk is touched in that case.
    pub fn new(config: OrchestratorConfig, sink: Arc<dyn Sink>) -> Result<Self, CoreError> {
        let root = validate_root(&config.root)?;

        let mut discovery_config = DiscoveryConfig::new(&config.output_dir_name);
        if let Some(name) = config.self_name {
            discovery_config = discovery_config.with_self_name(name);
        }

        Ok(Self {
            output_dir: root.join(&config.output_dir_name),
            reset: config.reset,
            discovery: Discovery::new(root.clone(), discovery_config),
            store: StateStore::new(&root),
            runner: Runner::new(config.runner),
            harvester: ResultHarvester::default(),
            sink,
            root,
        })
    }

    /// Replace the default harvester.
    pub fn with_harvester(mut self, harvester: ResultHarvester) -> Self {
        self.harvester = harvester;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute one full pass over the root.
    pub async fn run(&self) -> RunSummary {
        let mut state = if self.reset {
            tracing::info!(root = %self.root.display(), "Resetting execution state");
            self.store.reset()
        } else {
            self.store.load()
        };

        tracing::info!(
            root = %self.root.display(),
            previously_executed = state.len(),
            "Starting run",
        );

        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            tracing::warn!(
                dir = %self.output_dir.display(),
                error = %e,
                "Cannot create output directory",
            );
        }

        let mut summary = RunSummary::new();

        for batch in self.discovery.batches() {
            for unit in &batch.units {
                summary.phase = RunPhase::ProcessingUnit;
                match self.process_unit(unit, &mut state).await {
                    UnitStep::Skipped => summary.skipped.push(unit.relative_path.clone()),
                    UnitStep::Completed {
                        harvested,
                        persisted,
                    } => {
                        summary.executed.push(unit.relative_path.clone());
                        if harvested {
                            summary.harvested += 1;
                        }
                        if !persisted {
                            summary.unpersisted += 1;
                        }
                    }
                    UnitStep::Failed(failure) => {
                        tracing::error!(
                            unit = %failure.unit,
                            executed = summary.executed.len(),
                            "Critical failure, halting run",
                        );
                        summary.failure = Some(failure);
                        summary.phase = RunPhase::Halted;
                        return summary;
                    }
                }
            }
        }

        summary.phase = RunPhase::Done;
        tracing::info!(
            executed = summary.executed.len(),
            skipped = summary.skipped.len(),
            harvested = summary.harvested,
            "All units processed",
        );
        summary
    }

    async fn process_unit(&self, unit: &RunUnit, state: &mut ExecutionState) -> UnitStep {
        if state.is_complete(&unit.relative_path) {
            tracing::info!(unit = %unit.relative_path, "Already executed, skipping");
            self.report(&OutcomeRecord::skipped(&unit.relative_path, &self.output_dir))
                .await;
            return UnitStep::Skipped;
        }

        let result_file = self.result_file_for(unit);
        discard(&result_file);

        let outcome = self.runner.run(unit, self.unit_env(unit, &result_file)).await;

        if !outcome.success {
            let message = outcome.failure_message();
            tracing::error!(
                unit = %unit.relative_path,
                exit_code = ?outcome.exit_code,
                stdout = %outcome.stdout.trim_end(),
                stderr = %outcome.stderr.trim_end(),
                "Unit failed",
            );
            self.report(&self.outcome_record(&outcome)).await;
            discard(&result_file);
            return UnitStep::Failed(UnitFailure {
                unit: unit.relative_path.clone(),
                message,
            });
        }

        let persisted = self.store.mark_complete(state, &unit.relative_path);
        tracing::info!(
            unit = %unit.relative_path,
            duration_ms = outcome.duration_ms,
            "Unit completed",
        );
        tracing::debug!(unit = %unit.relative_path, stdout = %outcome.stdout.trim_end());

        self.report(&self.outcome_record(&outcome)).await;

        let source = HarvestSource {
            stdout: &outcome.stdout,
            result_file: Some(&result_file),
        };
        let harvested = self.harvester.harvest(unit, &source);
        discard(&result_file);

        if let Some(result) = &harvested {
            if let Err(e) = self.sink.export_result(result).await {
                tracing::warn!(
                    unit = %unit.relative_path,
                    base_name = %result.base_name,
                    error = %e,
                    "Result export failed",
                );
            }
        }

        UnitStep::Completed {
            harvested: harvested.is_some(),
            persisted,
        }
    }

    async fn report(&self, record: &OutcomeRecord) {
        if let Err(e) = self.sink.record_outcome(record).await {
            tracing::warn!(unit = %record.name, error = %e, "Failed to record outcome");
        }
    }

    fn outcome_record(&self, outcome: &RunOutcome) -> OutcomeRecord {
        OutcomeRecord {
            name: outcome.unit.relative_path.clone(),
            status: if outcome.success {
                OutcomeStatus::Success
            } else {
                OutcomeStatus::Failure
            },
            timestamp: Utc::now(),
            output_dir: self.output_dir.clone(),
            exit_code: outcome.exit_code,
            duration_ms: Some(outcome.duration_ms),
            error: (!outcome.success).then(|| outcome.failure_message()),
        }
    }

    fn result_file_for(&self, unit: &RunUnit) -> PathBuf {
        self.output_dir
            .join(format!(".{}.pending.json", result_base_name(&unit.file_name)))
    }

    fn unit_env(&self, unit: &RunUnit, result_file: &Path) -> Vec<(String, String)> {
        vec![
            (ROOT_ENV.to_string(), self.root.display().to_string()),
            (UNIT_ENV.to_string(), unit.relative_path.clone()),
            (RESULT_FILE_ENV.to_string(), result_file.display().to_string()),
        ]
    }
}

/// Resolve `root` to an absolute directory path.
pub fn validate_root(root: &Path) -> Result<PathBuf, CoreError> {
    if !root.exists() {
        return Err(CoreError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CoreError::NotADirectory(root.to_path_buf()));
    }
    Ok(root.canonicalize()?)
}

/// Remove a file if present, ignoring errors.
fn discard(path: &Path) {
    let _ = std::fs::remove_file(path);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
