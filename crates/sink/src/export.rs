//! Writes harvested results as JSON and CSV files.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use seqexec_core::harvest::HarvestedResult;
use seqexec_core::sink::SinkError;

/// Format of an exported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// One file written by [`ResultExporter::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub byte_size: u64,
}

impl ExportedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// ResultExporter
// ---------------------------------------------------------------------------

pub struct ResultExporter {
    output_dir: PathBuf,
}

impl ResultExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `<base>.json` and `<base>.csv`, overwriting earlier exports
    /// of the same unit.
    pub async fn export(&self, result: &HarvestedResult) -> Result<Vec<ExportedFile>, SinkError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let json = serde_json::to_vec_pretty(&result.value)
            .map_err(|e| SinkError::Export(format!("JSON encoding failed: {e}")))?;
        let csv = to_csv(&result.value)?;

        let mut files = Vec::with_capacity(2);
        for (format, bytes) in [(ExportFormat::Json, json), (ExportFormat::Csv, csv)] {
            let path = self
                .output_dir
                .join(format!("{}.{}", result.base_name, format.extension()));
            tokio::fs::write(&path, &bytes).await?;
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote result export");
            files.push(ExportedFile {
                path,
                format,
                byte_size: bytes.len() as u64,
            });
        }
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// CSV encoding
// ---------------------------------------------------------------------------

/// Render an object or array of objects as CSV.
///
/// The header is the union of keys across all rows in first-seen order.
/// Missing keys become empty cells; nested values are written as JSON text.
pub fn to_csv(value: &Value) -> Result<Vec<u8>, SinkError> {
    let rows: Vec<&Map<String, Value>> = match value {
        Value::Object(map) => vec![map],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| SinkError::Export("array element is not an object".into()))
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(SinkError::Export("result is not an object or array".into())),
    };

    let mut header: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !header.contains(&key.as_str()) {
                header.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).map_err(csv_error)?;
    for row in &rows {
        let record: Vec<String> = header
            .iter()
            .map(|key| row.get(*key).map(cell).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| SinkError::Export(format!("CSV flush failed: {e}")))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_error(err: csv::Error) -> SinkError {
    SinkError::Export(format!("CSV encoding failed: {err}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn csv_text(value: Value) -> String {
        String::from_utf8(to_csv(&value).unwrap()).unwrap()
    }

    #[test]
    fn single_object_is_one_row() {
        assert_eq!(csv_text(json!({"k": 1})), "k\n1\n");
    }

    #[test]
    fn header_is_union_of_keys() {
        let text = csv_text(json!([{"a": 1}, {"a": 2, "b": "x"}]));
        assert_eq!(text, "a,b\n1,\n2,x\n");
    }

    #[test]
    fn nested_values_become_json_text() {
        let text = csv_text(json!({"n": null, "tags": ["x", "y"]}));
        assert_eq!(text, "n,tags\n,\"[\"\"x\"\",\"\"y\"\"]\"\n");
    }

    #[test]
    fn scalar_is_rejected() {
        assert_matches!(to_csv(&json!(3)), Err(SinkError::Export(_)));
    }

    #[test]
    fn mixed_array_is_rejected() {
        assert_matches!(to_csv(&json!([{"a": 1}, 2])), Err(SinkError::Export(_)));
    }

    #[tokio::test]
    async fn export_writes_json_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path().join("output"));
        let result = HarvestedResult {
            base_name: "result_task.py".to_string(),
            value: json!({"k": 1}),
        };

        let files = exporter.export(&result).await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name(), "result_task.py.json");
        assert_eq!(files[1].file_name(), "result_task.py.csv");

        let json_back: Value =
            serde_json::from_slice(&std::fs::read(&files[0].path).unwrap()).unwrap();
        assert_eq!(json_back, json!({"k": 1}));
        assert_eq!(std::fs::read_to_string(&files[1].path).unwrap(), "k\n1\n");
        assert_eq!(files[1].byte_size, 4);
    }
}
