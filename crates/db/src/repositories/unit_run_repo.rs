//! Repository for the `unit_runs` table.

use crate::models::unit_run::{CreateUnitRun, UnitRun};
use crate::{DbId, DbPool};

/// Column list for `unit_runs` SELECT queries.
const COLUMNS: &str = "\
    id, run_id, unit, status, exit_code, duration_ms, \
    error_message, output_dir, recorded_at";

/// Provides query operations for recorded unit outcomes.
pub struct UnitRunRepo;

impl UnitRunRepo {
    /// Insert an outcome row and return it.
    pub async fn create(pool: &DbPool, dto: &CreateUnitRun) -> Result<UnitRun, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO unit_runs \
                (run_id, unit, status, exit_code, duration_ms, error_message, output_dir, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id",
        )
        .bind(&dto.run_id)
        .bind(&dto.unit)
        .bind(&dto.status)
        .bind(dto.exit_code)
        .bind(dto.duration_ms)
        .bind(&dto.error_message)
        .bind(&dto.output_dir)
        .bind(dto.recorded_at)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<UnitRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM unit_runs WHERE id = $1");
        sqlx::query_as::<_, UnitRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All outcomes of one pass, in the order they were recorded.
    pub async fn list_by_run(pool: &DbPool, run_id: &str) -> Result<Vec<UnitRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM unit_runs WHERE run_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, UnitRun>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }

    /// Number of rows of a pass with the given status.
    pub async fn count_by_status(
        pool: &DbPool,
        run_id: &str,
        status: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM unit_runs WHERE run_id = $1 AND status = $2")
            .bind(run_id)
            .bind(status)
            .fetch_one(pool)
            .await
    }

    /// Most recent outcome for a unit across all passes.
    pub async fn latest_for_unit(pool: &DbPool, unit: &str) -> Result<Option<UnitRun>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM unit_runs WHERE unit = $1 ORDER BY id DESC LIMIT 1");
        sqlx::query_as::<_, UnitRun>(&query)
            .bind(unit)
            .fetch_optional(pool)
            .await
    }
}
