//! Models for the `exported_artifacts` table.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{DbId, Timestamp};

pub const FORMAT_JSON: &str = "json";
pub const FORMAT_CSV: &str = "csv";

/// A file written from a harvested result.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExportedArtifact {
    pub id: DbId,
    pub run_id: String,
    pub base_name: String,
    pub file_path: String,
    pub format: String,
    pub byte_size: i64,
    pub uploaded: bool,
    pub created_at: Timestamp,
}

/// DTO for inserting an exported artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExportedArtifact {
    pub run_id: String,
    pub base_name: String,
    pub file_path: String,
    pub format: String,
    pub byte_size: i64,
    pub created_at: Timestamp,
}
