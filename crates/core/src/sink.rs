//! Collaborator contract for durable history and artifact export.
//!
//! The orchestrator reports every unit through [`Sink::record_outcome`] and
//! hands harvested results to [`Sink::export_result`]. Sink errors are
//! logged by the caller and never change whether the run continues.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::harvest::HarvestedResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Skipped,
}

impl OutcomeStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
        }
    }
}

/// Per-unit record handed to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    /// Unit identity (relative path).
    pub name: String,
    pub status: OutcomeStatus,
    pub timestamp: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub exit_code: Option<i32>,
    pub duration_ms: Option<u64>,
    /// Failure description including captured stderr.
    pub error: Option<String>,
}

impl OutcomeRecord {
    /// Record for a unit skipped because it already completed.
    pub fn skipped(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            status: OutcomeStatus::Skipped,
            timestamp: Utc::now(),
            output_dir: output_dir.into(),
            exit_code: None,
            duration_ms: None,
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("History recording failed: {0}")]
    History(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist one unit outcome.
    async fn record_outcome(&self, record: &OutcomeRecord) -> Result<(), SinkError>;

    /// Export (and optionally upload) a harvested result.
    async fn export_result(&self, result: &HarvestedResult) -> Result<(), SinkError>;
}

/// Sink that discards everything.
pub struct NullSink;

#[async_trait]
impl Sink for NullSink {
    async fn record_outcome(&self, _record: &OutcomeRecord) -> Result<(), SinkError> {
        Ok(())
    }

    async fn export_result(&self, _result: &HarvestedResult) -> Result<(), SinkError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
