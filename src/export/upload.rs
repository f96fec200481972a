//! Session upload to the game backend

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{Result, TrackerError};

/// Response from an accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status code
    pub status: u16,
    /// Response body as returned by the service
    pub body: String,
}

impl UploadReceipt {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends serialized sessions to the backend
#[cfg_attr(test, mockall::automock)]
pub trait SessionUploader: Send + Sync {
    /// Upload one JSON session document
    ///
    /// Non-2xx responses are reported as `TrackerError::Upload`.
    fn upload(&self, body: &[u8]) -> Result<UploadReceipt>;
}

/// Endpoint receiving session documents for an API base URL
pub fn track_endpoint(api_base: &str) -> String {
    format!("{}/track", api_base.trim_end_matches('/'))
}

/// Uploader posting to `<api base>/track` with reqwest
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpUploader {
    /// Create an uploader for the configured API
    pub fn new(api: &ApiConfig) -> Result<Self> {
        Self::with_timeout(&api.base_url, Duration::from_secs(api.timeout_secs))
    }

    /// Create an uploader for an API base URL with a request timeout
    pub fn with_timeout(api_base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: track_endpoint(api_base),
        })
    }

    /// Full URL sessions are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SessionUploader for HttpUploader {
    fn upload(&self, body: &[u8]) -> Result<UploadReceipt> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .map_err(|e| TrackerError::Upload {
                status: None,
                message: format!("Request to {} failed: {}", self.endpoint, e),
            })?;

        let status = response.status();
        let text = response.text().unwrap_or_default();

        if !status.is_success() {
            let message = if text.is_empty() {
                status.canonical_reason().unwrap_or("request rejected").to_string()
            } else {
                text
            };
            return Err(TrackerError::Upload {
                status: Some(status.as_u16()),
                message,
            });
        }

        tracing::debug!(status = status.as_u16(), endpoint = %self.endpoint, "Session uploaded");
        Ok(UploadReceipt::new(status.as_u16(), text))
    }
}
