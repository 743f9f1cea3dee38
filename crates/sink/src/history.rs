//! Durable run history backed by `seqexec-db`.

use std::path::Path;

use chrono::Utc;
use seqexec_core::sink::{OutcomeRecord, SinkError};
use seqexec_db::models::artifact::{CreateExportedArtifact, FORMAT_CSV, FORMAT_JSON};
use seqexec_db::models::unit_run::CreateUnitRun;
use seqexec_db::repositories::{ArtifactRepo, UnitRunRepo};
use seqexec_db::{DbId, DbPool};
use uuid::Uuid;

use crate::export::{ExportFormat, ExportedFile};

/// Writes outcome and artifact rows for one orchestrator pass.
pub struct HistoryRecorder {
    pool: DbPool,
    run_id: String,
}

impl HistoryRecorder {
    /// Open (and migrate) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let pool = seqexec_db::open(path).await.map_err(history_error)?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying migrations first.
    pub async fn from_pool(pool: DbPool) -> Result<Self, SinkError> {
        seqexec_db::run_migrations(&pool)
            .await
            .map_err(|e| SinkError::History(e.to_string()))?;
        Ok(Self {
            pool,
            run_id: Uuid::now_v7().to_string(),
        })
    }

    /// Identifier shared by every row of this pass.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn record(&self, record: &OutcomeRecord) -> Result<(), SinkError> {
        let dto = CreateUnitRun {
            run_id: self.run_id.clone(),
            unit: record.name.clone(),
            status: record.status.name().to_string(),
            exit_code: record.exit_code,
            duration_ms: record.duration_ms.and_then(|ms| i64::try_from(ms).ok()),
            error_message: record.error.clone(),
            output_dir: record.output_dir.display().to_string(),
            recorded_at: record.timestamp,
        };
        UnitRunRepo::create(&self.pool, &dto)
            .await
            .map_err(history_error)?;
        Ok(())
    }

    /// Record an exported file and return its row id.
    pub async fn record_artifact(
        &self,
        base_name: &str,
        file: &ExportedFile,
    ) -> Result<DbId, SinkError> {
        let format = match file.format {
            ExportFormat::Json => FORMAT_JSON,
            ExportFormat::Csv => FORMAT_CSV,
        };
        let dto = CreateExportedArtifact {
            run_id: self.run_id.clone(),
            base_name: base_name.to_string(),
            file_path: file.path.display().to_string(),
            format: format.to_string(),
            byte_size: i64::try_from(file.byte_size).unwrap_or(i64::MAX),
            created_at: Utc::now(),
        };
        let row = ArtifactRepo::create(&self.pool, &dto)
            .await
            .map_err(history_error)?;
        Ok(row.id)
    }

    pub async fn mark_uploaded(&self, artifact_id: DbId) -> Result<(), SinkError> {
        ArtifactRepo::mark_uploaded(&self.pool, artifact_id)
            .await
            .map_err(history_error)?;
        Ok(())
    }
}

fn history_error(err: sqlx::Error) -> SinkError {
    SinkError::History(err.to_string())
}
