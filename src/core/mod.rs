pub mod acquire;
pub mod analysis;
pub mod audio;
pub mod job;
pub mod publish;
pub mod readiness;
pub mod scratch;

// Re-export commonly used types for convenience
pub use acquire::{AcquireOptions, AcquiredAudio, AcquisitionError, InputAcquirer};
pub use analysis::{AnalysisClient, AnalysisError, AnalysisRequest, AnalysisResult};
pub use audio::AudioError;
pub use job::{AcquisitionMode, AudioSource, Job, JobInput};
pub use publish::{
    ArtifactUploader, BucketUploader, CallbackError, CallbackRelay, PublishError,
    PublishedResult, ResultPublisher, StoredArtifacts,
};
pub use readiness::{ReadinessProber, wait_until_ready};
pub use scratch::ScratchFile;
