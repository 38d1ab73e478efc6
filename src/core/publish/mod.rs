//! Result publishing.
//!
//! Without storage the analysis result goes back to the caller verbatim. With
//! storage configured the encoded audio and the structured data are written to
//! job-named files in the scratch directory, uploaded, and replaced by their
//! URLs.

mod callback;
mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::core::analysis::AnalysisResult;
use crate::core::scratch::{ScratchFile, job_key, sanitize_file_name};

pub use callback::{CallbackError, CallbackRelay};
pub use storage::{ArtifactUploader, BucketUploader};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("analysis result has no '{0}' field")]
    MissingField(&'static str),

    #[error("encoded audio is not valid base64: {0}")]
    InvalidEncodedAudio(String),

    #[error("failed to access {path}: {error}")]
    Io { path: String, error: String },

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("storage misconfigured: {0}")]
    Configuration(String),

    #[error("expected {expected} URLs from uploader, got {actual}")]
    UrlCountMismatch { expected: usize, actual: usize },
}

/// URLs of the artifacts uploaded for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifacts {
    pub data_encoded_audio_url: String,
    pub data_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp3_url: Option<String>,
}

/// What a job hands back in its `data` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedResult {
    Stored(StoredArtifacts),
    Inline(AnalysisResult),
}

impl PublishedResult {
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            PublishedResult::Inline(result) => result.clone().into_value(),
            PublishedResult::Stored(artifacts) => {
                serde_json::to_value(artifacts).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}

pub struct ResultPublisher {
    uploader: Option<Arc<dyn ArtifactUploader>>,
}

impl ResultPublisher {
    /// Publisher that always returns results inline.
    pub fn inline() -> Self {
        Self { uploader: None }
    }

    pub fn with_uploader(uploader: Arc<dyn ArtifactUploader>) -> Self {
        Self {
            uploader: Some(uploader),
        }
    }

    pub fn from_config(storage: Option<&StorageConfig>) -> Result<Self, PublishError> {
        match storage {
            Some(config) => Ok(Self::with_uploader(Arc::new(BucketUploader::from_config(
                config,
            )?))),
            None => Ok(Self::inline()),
        }
    }

    pub fn uploads_enabled(&self) -> bool {
        self.uploader.is_some()
    }

    /// Upload the job's source audio rendition. `None` when storage is off.
    pub async fn upload_source_audio(
        &self,
        job_id: &str,
        audio_path: &Path,
    ) -> Result<Option<String>, PublishError> {
        let Some(uploader) = &self.uploader else {
            return Ok(None);
        };

        let urls = uploader.upload(job_id, &[audio_path.to_path_buf()]).await?;
        let url = urls
            .into_iter()
            .next()
            .ok_or(PublishError::UrlCountMismatch {
                expected: 1,
                actual: 0,
            })?;
        info!(job_id = %job_id, url = %url, "Uploaded source audio");
        Ok(Some(url))
    }

    /// Turn an analysis result into the job's published output.
    pub async fn publish(
        &self,
        job_id: &str,
        result: AnalysisResult,
        output_format: &str,
        scratch: &ScratchFile,
        source_audio_url: Option<&str>,
    ) -> Result<PublishedResult, PublishError> {
        let Some(uploader) = &self.uploader else {
            return Ok(PublishedResult::Inline(result));
        };

        let encoded = result
            .encoded_audio()
            .ok_or(PublishError::MissingField(AnalysisResult::ENCODED_AUDIO_FIELD))?;
        let data = result
            .data()
            .ok_or(PublishError::MissingField(AnalysisResult::DATA_FIELD))?;

        let audio = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| PublishError::InvalidEncodedAudio(e.to_string()))?;
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| PublishError::Upload(format!("failed to serialize data: {e}")))?;

        let base_name = job_key(job_id);
        let audio_path = scratch.artifact(&format!(
            "{base_name}.{}",
            sanitize_file_name(output_format)
        ));
        let data_path = scratch.artifact(&format!("{base_name}.json"));

        write_artifact(&audio_path, &audio).await?;
        write_artifact(&data_path, json.as_bytes()).await?;
        debug!(
            audio = %audio_path.display(),
            data = %data_path.display(),
            "Wrote result artifacts"
        );

        let files: Vec<PathBuf> = vec![audio_path, data_path];
        let urls = uploader.upload(job_id, &files).await?;
        let [audio_url, data_url]: [String; 2] =
            urls.try_into()
                .map_err(|urls: Vec<String>| PublishError::UrlCountMismatch {
                    expected: 2,
                    actual: urls.len(),
                })?;

        Ok(PublishedResult::Stored(StoredArtifacts {
            data_encoded_audio_url: audio_url,
            data_url,
            mp3_url: source_audio_url.map(str::to_string),
        }))
    }
}

async fn write_artifact(path: &Path, contents: &[u8]) -> Result<(), PublishError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PublishError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })
}
