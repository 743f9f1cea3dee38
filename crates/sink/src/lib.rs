//! Production [`Sink`] for the orchestrator.
//!
//! [`ReportingSink`] records every unit outcome in the SQLite history,
//! writes harvested results as JSON and CSV under the output directory and,
//! when configured, uploads those files to a remote store. Each concern is
//! optional: a history database that fails to open only disables history.

use async_trait::async_trait;
use seqexec_core::harvest::HarvestedResult;
use seqexec_core::sink::{OutcomeRecord, Sink, SinkError};

pub mod config;
pub mod export;
pub mod history;
pub mod upload;

use config::SinkConfig;
use export::ResultExporter;
use history::HistoryRecorder;
use upload::ArtifactUploader;

pub struct ReportingSink {
    history: Option<HistoryRecorder>,
    exporter: Option<ResultExporter>,
    uploader: Option<ArtifactUploader>,
}

impl ReportingSink {
    /// Build the sink from configuration. Never fails; unavailable parts
    /// are logged and left disabled.
    pub async fn from_config(config: &SinkConfig) -> Self {
        let history = match HistoryRecorder::open(&config.history_db).await {
            Ok(recorder) => {
                tracing::info!(
                    path = %config.history_db.display(),
                    run_id = recorder.run_id(),
                    "Run history enabled"
                );
                Some(recorder)
            }
            Err(e) => {
                tracing::warn!(
                    path = %config.history_db.display(),
                    error = %e,
                    "Run history unavailable, continuing without it"
                );
                None
            }
        };

        let uploader = match (&config.upload, config.export) {
            (Some(upload), true) => match ArtifactUploader::new(upload.clone()) {
                Ok(uploader) => {
                    tracing::info!(url = %upload.url, destination = %upload.destination, "Artifact upload enabled");
                    Some(uploader)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to build upload client, upload disabled");
                    None
                }
            },
            _ => None,
        };

        let exporter = config
            .export
            .then(|| ResultExporter::new(config.output_dir.clone()));

        Self {
            history,
            exporter,
            uploader,
        }
    }

    /// Assemble a sink from already-built parts.
    pub fn from_parts(
        history: Option<HistoryRecorder>,
        exporter: Option<ResultExporter>,
        uploader: Option<ArtifactUploader>,
    ) -> Self {
        Self {
            history,
            exporter,
            uploader,
        }
    }

    pub fn history(&self) -> Option<&HistoryRecorder> {
        self.history.as_ref()
    }
}

#[async_trait]
impl Sink for ReportingSink {
    async fn record_outcome(&self, record: &OutcomeRecord) -> Result<(), SinkError> {
        match &self.history {
            Some(history) => history.record(record).await,
            None => Ok(()),
        }
    }

    async fn export_result(&self, result: &HarvestedResult) -> Result<(), SinkError> {
        let Some(exporter) = &self.exporter else {
            return Ok(());
        };
        let files = exporter.export(result).await?;
        tracing::info!(
            base_name = %result.base_name,
            files = files.len(),
            "Exported harvested result"
        );

        for file in &files {
            let artifact_id = match &self.history {
                Some(history) => match history.record_artifact(&result.base_name, file).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!(path = %file.path.display(), error = %e, "Failed to record artifact");
                        None
                    }
                },
                None => None,
            };

            let Some(uploader) = &self.uploader else {
                continue;
            };
            match uploader.upload(&file.path).await {
                Ok(url) => {
                    tracing::info!(file = %file.file_name(), url = %url, "Uploaded artifact");
                    if let (Some(history), Some(id)) = (&self.history, artifact_id) {
                        if let Err(e) = history.mark_uploaded(id).await {
                            tracing::warn!(artifact_id = id, error = %e, "Failed to flag artifact as uploaded");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file.file_name(), error = %e, "Artifact upload failed");
                }
            }
        }
        Ok(())
    }
}
