//! Best-effort extraction of structured results from a finished unit.
//!
//! A unit may publish a result in two ways, tried in order:
//!
//! 1. Write JSON to the file named by `SEQEXEC_RESULT_FILE`.
//! 2. Print JSON as the last non-empty line of stdout.
//!
//! Only an object or a non-empty array of objects counts as a result.
//! Everything else is ignored; harvesting never fails a run.

use std::path::Path;

use serde_json::Value;

use crate::discovery::RunUnit;

/// Environment variable naming the result file a unit may write.
pub const RESULT_FILE_ENV: &str = "SEQEXEC_RESULT_FILE";

/// Prefix of every harvested result's base name.
pub const RESULT_PREFIX: &str = "result_";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Structured value extracted from a unit, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestedResult {
    /// `result_<unit-filename>`.
    pub base_name: String,
    pub value: Value,
}

/// What a strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct HarvestSource<'a> {
    pub stdout: &'a str,
    pub result_file: Option<&'a Path>,
}

/// One way of locating a structured result.
pub trait HarvestStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, source: &HarvestSource<'_>) -> Option<Value>;
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Reads the whole designated result file.
pub struct ResultFileStrategy;

impl HarvestStrategy for ResultFileStrategy {
    fn name(&self) -> &'static str {
        "result_file"
    }

    fn extract(&self, source: &HarvestSource<'_>) -> Option<Value> {
        let path = source.result_file?;
        let contents = std::fs::read_to_string(path).ok()?;
        parse_structured(&contents)
    }
}

/// Parses the last non-empty stdout line.
pub struct TrailingLineStrategy;

impl HarvestStrategy for TrailingLineStrategy {
    fn name(&self) -> &'static str {
        "trailing_line"
    }

    fn extract(&self, source: &HarvestSource<'_>) -> Option<Value> {
        let line = source
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())?;
        parse_structured(line)
    }
}

// ---------------------------------------------------------------------------
// ResultHarvester
// ---------------------------------------------------------------------------

/// Ordered chain of strategies; the first hit wins.
pub struct ResultHarvester {
    strategies: Vec<Box<dyn HarvestStrategy>>,
}

impl ResultHarvester {
    pub fn new(strategies: Vec<Box<dyn HarvestStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn harvest(&self, unit: &RunUnit, source: &HarvestSource<'_>) -> Option<HarvestedResult> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.extract(source) {
                tracing::debug!(
                    unit = %unit.relative_path,
                    strategy = strategy.name(),
                    "Harvested structured result",
                );
                return Some(HarvestedResult {
                    base_name: result_base_name(&unit.file_name),
                    value,
                });
            }
        }
        None
    }
}

impl Default for ResultHarvester {
    /// Result file first, trailing stdout line as fallback.
    fn default() -> Self {
        Self::new(vec![
            Box::new(ResultFileStrategy),
            Box::new(TrailingLineStrategy),
        ])
    }
}

/// Export base name for a unit's result.
pub fn result_base_name(file_name: &str) -> String {
    format!("{RESULT_PREFIX}{file_name}")
}

/// Parse `text` as JSON and keep it only if it is an object or a non-empty
/// array of objects.
pub fn parse_structured(text: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let accepted = match &value {
        Value::Object(_) => true,
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
        _ => false,
    };
    accepted.then_some(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::discovery::ScriptKind;

    fn unit(file_name: &str) -> RunUnit {
        RunUnit {
            relative_path: format!("jobs/{file_name}"),
            absolute_path: PathBuf::from("/srv/jobs").join(file_name),
            directory: PathBuf::from("/srv/jobs"),
            file_name: file_name.to_string(),
            kind: ScriptKind::Python,
            priority: 1,
        }
    }

    fn stdout_only(stdout: &str) -> HarvestSource<'_> {
        HarvestSource {
            stdout,
            result_file: None,
        }
    }

    #[test]
    fn object_on_last_line_is_harvested() {
        let result = ResultHarvester::default()
            .harvest(&unit("stats.py"), &stdout_only("working...\n{\"k\": 1}\n"))
            .expect("harvested");
        assert_eq!(result.base_name, "result_stats.py");
        assert_eq!(result.value, json!({"k": 1}));
    }

    #[test]
    fn trailing_blank_lines_are_skipped() {
        let value = TrailingLineStrategy.extract(&stdout_only("[{\"a\": 1}, {\"a\": 2}]\n\n  \n"));
        assert_eq!(value, Some(json!([{"a": 1}, {"a": 2}])));
    }

    #[test]
    fn plain_text_is_not_harvested() {
        let harvester = ResultHarvester::default();
        assert!(harvester
            .harvest(&unit("log.py"), &stdout_only("done: 3 rows\n"))
            .is_none());
        assert!(harvester.harvest(&unit("quiet.py"), &stdout_only("")).is_none());
    }

    #[test]
    fn only_the_last_line_counts() {
        assert!(TrailingLineStrategy
            .extract(&stdout_only("{\"k\": 1}\nfinished\n"))
            .is_none());
    }

    #[test]
    fn scalars_and_mixed_arrays_are_rejected() {
        assert!(parse_structured("42").is_none());
        assert!(parse_structured("\"text\"").is_none());
        assert!(parse_structured("null").is_none());
        assert!(parse_structured("[]").is_none());
        assert!(parse_structured("[1, 2]").is_none());
        assert!(parse_structured("[{\"a\": 1}, 2]").is_none());
    }

    #[test]
    fn result_file_takes_precedence_over_stdout() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("result.json");
        std::fs::write(&path, "{\n  \"from\": \"file\"\n}\n").expect("write");

        let source = HarvestSource {
            stdout: "{\"from\": \"stdout\"}",
            result_file: Some(&path),
        };
        let result = ResultHarvester::default()
            .harvest(&unit("both.py"), &source)
            .expect("harvested");
        assert_eq!(result.value, json!({"from": "file"}));
    }

    #[test]
    fn missing_result_file_falls_back_to_stdout() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("never_written.json");
        let source = HarvestSource {
            stdout: "{\"from\": \"stdout\"}",
            result_file: Some(&path),
        };
        let result = ResultHarvester::default()
            .harvest(&unit("fallback.sh"), &source)
            .expect("harvested");
        assert_eq!(result.value, json!({"from": "stdout"}));
    }
}
