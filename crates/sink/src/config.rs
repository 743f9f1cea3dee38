//! Sink configuration loaded from the environment.

use std::path::{Path, PathBuf};

/// File name of the history database inside the output directory.
pub const HISTORY_DB_FILE: &str = "history.db";

/// Default remote folder for uploaded artifacts.
pub const DEFAULT_UPLOAD_DESTINATION: &str = "seqexec-results";

// ---------------------------------------------------------------------------
// UploadConfig
// ---------------------------------------------------------------------------

/// Remote artifact store settings.
///
/// Loaded from environment variables; if `SEQEXEC_UPLOAD_URL` is not set,
/// [`UploadConfig::from_env`] returns `None` and uploading is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Base URL, without trailing slash.
    pub url: String,
    pub destination: String,
    pub token: Option<String>,
}

impl UploadConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            destination: DEFAULT_UPLOAD_DESTINATION.to_string(),
            token: None,
        }
    }

    /// | Env Var                      | Default           |
    /// |------------------------------|-------------------|
    /// | `SEQEXEC_UPLOAD_URL`         | unset (disabled)  |
    /// | `SEQEXEC_UPLOAD_DESTINATION` | `seqexec-results` |
    /// | `SEQEXEC_UPLOAD_TOKEN`       | unset             |
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SEQEXEC_UPLOAD_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())?;
        let mut config = Self::new(url);
        if let Ok(destination) = std::env::var("SEQEXEC_UPLOAD_DESTINATION") {
            config.destination = destination.trim_matches('/').to_string();
        }
        config.token = std::env::var("SEQEXEC_UPLOAD_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Some(config)
    }

    /// Target URL for one exported file.
    pub fn target_url(&self, file_name: &str) -> String {
        if self.destination.is_empty() {
            format!("{}/{file_name}", self.url)
        } else {
            format!("{}/{}/{file_name}", self.url, self.destination)
        }
    }
}

// ---------------------------------------------------------------------------
// SinkConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Directory exported result files are written to.
    pub output_dir: PathBuf,
    pub history_db: PathBuf,
    /// When false, harvested results are neither written nor uploaded.
    pub export: bool,
    pub upload: Option<UploadConfig>,
}

impl SinkConfig {
    /// Defaults for an output directory: history inside it, export on,
    /// upload off.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            history_db: output_dir.join(HISTORY_DB_FILE),
            output_dir,
            export: true,
            upload: None,
        }
    }

    /// Load configuration for `output_dir` from environment variables.
    ///
    /// | Env Var              | Default                   |
    /// |----------------------|---------------------------|
    /// | `SEQEXEC_HISTORY_DB` | `<output_dir>/history.db` |
    ///
    /// Upload settings come from [`UploadConfig::from_env`].
    pub fn from_env(output_dir: &Path) -> Self {
        let mut config = Self::new(output_dir);
        if let Ok(path) = std::env::var("SEQEXEC_HISTORY_DB") {
            if !path.is_empty() {
                config.history_db = PathBuf::from(path);
            }
        }
        config.upload = UploadConfig::from_env();
        config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
