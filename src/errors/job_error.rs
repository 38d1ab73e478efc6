//! Job-level error type.
//!
//! Every stage of a job returns its own error; [`JobError`] wraps them and its
//! `Display` output is exactly the string reported back in `{"error": ...}`.

use thiserror::Error;

use crate::core::acquire::AcquisitionError;
use crate::core::analysis::AnalysisError;
use crate::core::job::AcquisitionMode;
use crate::core::publish::PublishError;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("No URL or base64-encoded audio provided in input.")]
    MissingAudio,

    #[error("Analysis service at {url} did not become ready after {attempts} attempts")]
    NotReady { url: String, attempts: u32 },

    #[error("Failed to allocate scratch space: {0}")]
    Scratch(String),

    #[error("{}: {}", .mode.failure_prefix(), .source)]
    Acquisition {
        mode: AcquisitionMode,
        source: AcquisitionError,
    },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Failed to publish results: {0}")]
    Publish(#[from] PublishError),

    #[error("Invalid worker configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Input problems the caller can fix, as opposed to service failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, JobError::MissingAudio)
    }
}
