//! HTTP client for the local analysis service.
//!
//! The service accepts a multipart upload on `POST /analyze/` and answers
//! with a JSON document. Anything other than `200 OK` is a failure; the body
//! of a failed response is only logged.

use std::path::Path;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::messages::{AnalysisRequest, AnalysisResult};

/// Default endpoint of the analysis sidecar.
pub const DEFAULT_ANALYSIS_URL: &str = "http://localhost:8000/analyze/";

/// Maximum number of response body bytes echoed into logs on failure.
const MAX_LOGGED_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Processing failed with status code: {0}")]
    Status(u16),

    #[error("Analysis request failed: {0}")]
    Transport(String),

    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),

    #[error("Failed to read audio file {path}: {error}")]
    ReadAudio { path: String, error: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

pub struct AnalysisClient {
    http_client: Client,
    endpoint: String,
}

impl AnalysisClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `audio_path` with the request fields and return the parsed response.
    pub async fn analyze(
        &self,
        audio_path: &Path,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let audio = tokio::fs::read(audio_path)
            .await
            .map_err(|e| AnalysisError::ReadAudio {
                path: audio_path.display().to_string(),
                error: e.to_string(),
            })?;

        info!(
            endpoint = %self.endpoint,
            bytes = audio.len(),
            output_format = %request.output_format,
            "Sending audio to analysis service"
        );

        let form = request
            .to_form(audio)
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(MAX_LOGGED_BODY).collect();
            warn!(status = %status, body = %preview, "Analysis service returned an error");
            return Err(AnalysisError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(format!("Failed to read response: {e}")))?;

        let result: AnalysisResult = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        debug!(fields = result.as_map().len(), "Analysis response parsed");
        Ok(result)
    }
}
