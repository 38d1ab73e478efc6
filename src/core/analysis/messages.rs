//! Request and response types for the analysis service.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File name the analysis service sees for the uploaded audio.
pub const AUDIO_FILE_NAME: &str = "audio.wav";
pub const AUDIO_MIME_TYPE: &str = "audio/wav";

/// Sample rate requested from the analysis service by default.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
/// Channel count requested from the analysis service by default.
pub const DEFAULT_CHANNELS: u16 = 1;

/// Form fields sent alongside the audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub transcript: String,
    pub output_format: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Ask the service to inline the produced audio as base64
    pub include_base64: bool,
}

impl AnalysisRequest {
    pub fn new(transcript: impl Into<String>, output_format: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            output_format: output_format.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            include_base64: true,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    /// Build the multipart body with `audio` as the `file` part.
    pub fn to_form(&self, audio: Vec<u8>) -> Result<Form, reqwest::Error> {
        let file_part = Part::bytes(audio)
            .file_name(AUDIO_FILE_NAME)
            .mime_str(AUDIO_MIME_TYPE)?;

        Ok(Form::new()
            .part("file", file_part)
            .text("transcript", self.transcript.clone())
            .text("include_base64", self.include_base64.to_string())
            .text("output_format", self.output_format.clone())
            .text("sample_rate", self.sample_rate.to_string())
            .text("channels", self.channels.to_string()))
    }
}

/// JSON document returned by the analysis service.
///
/// The service's schema is owned elsewhere; only `data_encoded_audio` and
/// `data` are interpreted here, everything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

impl AnalysisResult {
    pub const ENCODED_AUDIO_FIELD: &'static str = "data_encoded_audio";
    pub const DATA_FIELD: &'static str = "data";

    /// Base64 audio produced by the service.
    pub fn encoded_audio(&self) -> Option<&str> {
        self.0
            .get(Self::ENCODED_AUDIO_FIELD)
            .and_then(Value::as_str)
    }

    /// Structured analysis payload.
    pub fn data(&self) -> Option<&Value> {
        self.0.get(Self::DATA_FIELD)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for AnalysisResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
