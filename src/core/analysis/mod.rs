//! Analysis service integration.

mod client;
mod messages;

pub use client::{AnalysisClient, AnalysisError, DEFAULT_ANALYSIS_URL};
pub use messages::{
    AUDIO_FILE_NAME, AnalysisRequest, AnalysisResult, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
};
