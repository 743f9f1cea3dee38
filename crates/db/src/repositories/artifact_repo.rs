//! Repository for the `exported_artifacts` table.

use crate::models::artifact::{CreateExportedArtifact, ExportedArtifact};
use crate::{DbId, DbPool};

const COLUMNS: &str = "\
    id, run_id, base_name, file_path, format, byte_size, uploaded, created_at";

pub struct ArtifactRepo;

impl ArtifactRepo {
    /// Record a written export file. New rows start as not uploaded.
    pub async fn create(
        pool: &DbPool,
        dto: &CreateExportedArtifact,
    ) -> Result<ExportedArtifact, sqlx::Error> {
        let query = format!(
            "INSERT INTO exported_artifacts \
                (run_id, base_name, file_path, format, byte_size, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExportedArtifact>(&query)
            .bind(&dto.run_id)
            .bind(&dto.base_name)
            .bind(&dto.file_path)
            .bind(&dto.format)
            .bind(dto.byte_size)
            .bind(dto.created_at)
            .fetch_one(pool)
            .await
    }

    /// Flag an artifact as delivered to the upload destination.
    pub async fn mark_uploaded(pool: &DbPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE exported_artifacts SET uploaded = 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_by_run(
        pool: &DbPool,
        run_id: &str,
    ) -> Result<Vec<ExportedArtifact>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM exported_artifacts WHERE run_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, ExportedArtifact>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }
}
