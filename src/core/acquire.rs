//! Input acquisition: turn a job's audio (inline base64 or remote URL) into a
//! WAV file on the job's scratch path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info};

use super::audio::{self, AudioError};
use super::scratch::ScratchFile;

/// Most bytes reserved up front for a download, whatever its advertised length.
const MAX_PREALLOCATED_BYTES: u64 = 8 * 1024 * 1024;

/// Errors raised while materializing job audio.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Failed to download audio. Status code: {0}")]
    DownloadStatus(u16),

    #[error("Download request failed: {0}")]
    Network(String),

    #[error("Audio download exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("Failed to write {path}: {error}")]
    Write { path: String, error: String },

    #[error("Audio processing task failed: {0}")]
    Task(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Acquisition behaviour taken from the worker configuration.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Decode and re-encode input to WAV. When false the payload is written verbatim.
    pub transcode: bool,
    pub ffmpeg_path: PathBuf,
    pub download_timeout: Duration,
    /// Downloads larger than this are abandoned.
    pub max_download_bytes: u64,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            transcode: true,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            download_timeout: Duration::from_secs(120),
            max_download_bytes: crate::config::DEFAULT_MAX_DOWNLOAD_BYTES,
        }
    }
}

/// Files produced for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredAudio {
    /// Canonical audio sent to the analysis service
    pub wav_path: PathBuf,
    /// MP3 rendition of the source audio, when requested
    pub mp3_path: Option<PathBuf>,
}

pub struct InputAcquirer {
    http_client: Client,
    options: AcquireOptions,
}

impl InputAcquirer {
    pub fn new(options: AcquireOptions) -> Result<Self, AcquisitionError> {
        let http_client = Client::builder()
            .timeout(options.download_timeout)
            .build()
            .map_err(|e| AcquisitionError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            options,
        })
    }

    pub fn options(&self) -> &AcquireOptions {
        &self.options
    }

    /// Decode a base64 payload into the scratch WAV, plus an MP3 next to it
    /// when `with_mp3` is set.
    pub async fn acquire_from_base64(
        &self,
        encoded: &str,
        scratch: &ScratchFile,
        with_mp3: bool,
    ) -> Result<AcquiredAudio, AcquisitionError> {
        let cleaned: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = BASE64.decode(cleaned.as_bytes())?;
        debug!(bytes = bytes.len(), "Decoded base64 audio payload");

        self.materialize(bytes, scratch.path()).await?;

        let mp3_path = if with_mp3 {
            let mp3_path = scratch.derived("mp3");
            audio::export_mp3(&self.options.ffmpeg_path, scratch.path(), &mp3_path).await?;
            Some(mp3_path)
        } else {
            None
        };

        Ok(AcquiredAudio {
            wav_path: scratch.path().to_path_buf(),
            mp3_path,
        })
    }

    /// Download `url` into the scratch WAV.
    pub async fn acquire_from_url(
        &self,
        url: &str,
        scratch: &ScratchFile,
    ) -> Result<AcquiredAudio, AcquisitionError> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AcquisitionError::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AcquisitionError::DownloadStatus(status.as_u16()));
        }

        let limit = self.options.max_download_bytes;
        let advertised = response.content_length().unwrap_or(0);
        if advertised > limit {
            return Err(AcquisitionError::TooLarge { limit });
        }

        let mut buffer = Vec::with_capacity(advertised.min(MAX_PREALLOCATED_BYTES) as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AcquisitionError::Network(e.to_string()))?
        {
            if (buffer.len() + chunk.len()) as u64 > limit {
                return Err(AcquisitionError::TooLarge { limit });
            }
            buffer.extend_from_slice(&chunk);
        }
        info!(bytes = buffer.len(), "Downloaded source audio");

        self.materialize(buffer, scratch.path()).await?;

        Ok(AcquiredAudio {
            wav_path: scratch.path().to_path_buf(),
            mp3_path: None,
        })
    }

    async fn materialize(&self, bytes: Vec<u8>, path: &Path) -> Result<(), AcquisitionError> {
        let contents = if self.options.transcode {
            // Decoding is CPU bound, keep it off the async workers
            tokio::task::spawn_blocking(move || audio::transcode_to_wav(&bytes))
                .await
                .map_err(|e| AcquisitionError::Task(e.to_string()))??
        } else {
            bytes
        };

        tokio::fs::write(path, &contents)
            .await
            .map_err(|e| AcquisitionError::Write {
                path: path.display().to_string(),
                error: e.to_string(),
            })
    }
}
