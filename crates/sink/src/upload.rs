//! Artifact upload with exponential-backoff retry.
//!
//! [`ArtifactUploader`] sends an exported file to the configured store via
//! HTTP PUT. Failed attempts are retried three times with exponential
//! backoff (1 s, 2 s, 4 s).

use std::path::Path;
use std::time::Duration;

use crate::config::UploadConfig;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single upload attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store returned a non-2xx status code.
    #[error("Upload returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// ArtifactUploader
// ---------------------------------------------------------------------------

pub struct ArtifactUploader {
    client: reqwest::Client,
    config: UploadConfig,
    retry_delays: Vec<Duration>,
}

impl ArtifactUploader {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            config,
            retry_delays: RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        })
    }

    /// Replace the backoff schedule. The number of delays is the number of
    /// retries after the first attempt.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload one file, retrying with backoff. Returns the target URL of
    /// the first successful attempt.
    pub async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let body = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let url = self.config.target_url(&file_name);

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_put(&url, body.clone()).await {
                Ok(()) => return Ok(url),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %url,
                        error = %e,
                        "Upload attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match self.try_put(&url, body).await {
            Ok(()) => Ok(url),
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Upload failed after all retries");
                Err(e)
            }
        }
    }

    async fn try_put(&self, url: &str, body: Vec<u8>) -> Result<(), UploadError> {
        let mut request = self.client.put(url).body(body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(UploadError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
