//! Models for the `unit_runs` table.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{DbId, Timestamp};

/// Status value for a unit that exited successfully.
pub const STATUS_SUCCESS: &str = "success";

/// Status value for a unit that failed and halted the run.
pub const STATUS_FAILURE: &str = "failure";

/// Status value for a unit skipped as already complete.
pub const STATUS_SKIPPED: &str = "skipped";

/// One recorded unit outcome.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UnitRun {
    pub id: DbId,
    /// Groups the rows of one orchestrator pass.
    pub run_id: String,
    pub unit: String,
    pub status: String,
    pub exit_code: Option<i32>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub output_dir: String,
    pub recorded_at: Timestamp,
}

/// DTO for inserting a unit outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnitRun {
    pub run_id: String,
    pub unit: String,
    pub status: String,
    pub exit_code: Option<i32>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub output_dir: String,
    pub recorded_at: Timestamp,
}
