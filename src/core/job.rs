//! Job payload types
//!
//! A job arrives from the hosting framework as `{id, input}`. The input carries
//! the audio either inline (`data`, base64) or by reference (`url`) together
//! with optional metadata that is forwarded to the analysis service.
//!
//! Several input keys have legacy aliases that older callers still send:
//! `lyrics` for `transcript` and `output_audio_format` for `output_format`.

use serde::{Deserialize, Serialize};

/// Output format requested from the analysis service when the job names none.
pub const DEFAULT_OUTPUT_FORMAT: &str = "pcm";

/// Number of leading/trailing characters kept when logging a base64 payload.
const PREVIEW_CHARS: usize = 20;

/// A single unit of work handed to the worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub input: JobInput,
}

/// Caller-supplied job input.
///
/// Every field is optional on the wire; use the accessor methods to get the
/// effective value with fallbacks applied.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JobInput {
    /// Base64-encoded audio payload
    pub data: Option<String>,
    /// Remote location of the audio
    pub url: Option<String>,
    pub transcript: Option<String>,
    /// Legacy alias for `transcript`
    pub lyrics: Option<String>,
    pub output_format: Option<String>,
    /// Legacy alias for `output_format`
    pub output_audio_format: Option<String>,
    /// Callback URL that receives the published result
    pub submit: Option<String>,
    /// Upload the source audio as MP3 alongside the results
    pub upload_mp3: Option<bool>,
    pub mime: Option<String>,
    pub title: Option<String>,
}

/// How the job delivers its audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource<'a> {
    Base64(&'a str),
    Url(&'a str),
}

impl AudioSource<'_> {
    pub fn mode(&self) -> AcquisitionMode {
        match self {
            AudioSource::Base64(_) => AcquisitionMode::Base64,
            AudioSource::Url(_) => AcquisitionMode::Download,
        }
    }
}

/// Acquisition mode, used to phrase job messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    Base64,
    Download,
}

impl AcquisitionMode {
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            AcquisitionMode::Base64 => "Failed to save audio from base64 data",
            AcquisitionMode::Download => "Failed to download audio file",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            AcquisitionMode::Base64 => "Audio file successfully processed from base64 data.",
            AcquisitionMode::Download => "Audio file successfully downloaded and processed.",
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl JobInput {
    /// Select the audio source. Inline data wins when both are present.
    pub fn audio_source(&self) -> Option<AudioSource<'_>> {
        non_empty(&self.data)
            .map(AudioSource::Base64)
            .or_else(|| non_empty(&self.url).map(AudioSource::Url))
    }

    /// The caller-supplied audio URL, if any (also reported as the source audio link).
    pub fn source_url(&self) -> Option<&str> {
        non_empty(&self.url)
    }

    pub fn transcript(&self) -> &str {
        self.transcript
            .as_deref()
            .or(self.lyrics.as_deref())
            .unwrap_or("")
    }

    pub fn output_format(&self) -> &str {
        self.output_format
            .as_deref()
            .or(self.output_audio_format.as_deref())
            .unwrap_or(DEFAULT_OUTPUT_FORMAT)
    }

    pub fn submit_url(&self) -> Option<&str> {
        non_empty(&self.submit)
    }

    pub fn upload_mp3(&self) -> bool {
        self.upload_mp3.unwrap_or(false)
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    pub fn mime(&self) -> &str {
        self.mime.as_deref().unwrap_or("Unknown")
    }
}

/// Short form of a (potentially huge) base64 payload for log lines.
pub fn base64_preview(encoded: &str) -> String {
    let total = encoded.chars().count();
    if total <= PREVIEW_CHARS * 2 {
        return encoded.to_string();
    }
    let head: String = encoded.chars().take(PREVIEW_CHARS).collect();
    let tail: String = encoded.chars().skip(total - PREVIEW_CHARS).collect();
    format!("{head}...{tail}")
}
