//! Job orchestration.
//!
//! A job moves through `probing -> acquiring -> analyzing -> publishing`. Each
//! stage returns a typed error; the first failure ends the job and is rendered
//! into `{"error": ...}`. The job's scratch space is removed before the
//! response is produced, whichever way the job ends.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::core::acquire::{AcquireOptions, InputAcquirer};
use crate::core::analysis::{AnalysisClient, AnalysisRequest};
use crate::core::job::{AcquisitionMode, AudioSource, Job, base64_preview};
use crate::core::publish::{CallbackRelay, PublishedResult, ResultPublisher};
use crate::core::readiness::ReadinessProber;
use crate::core::scratch::ScratchFile;
use crate::errors::{JobError, JobResult};

/// Message returned when a job task dies without producing a result.
const INTERNAL_FAILURE: &str = "Internal error while processing job";

/// What a job returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResponse {
    Success {
        id: String,
        message: String,
        data: Value,
    },
    Failure {
        error: String,
    },
}

impl JobResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        JobResponse::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResponse::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobResponse::Failure { error } => Some(error),
            JobResponse::Success { .. } => None,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            JobResponse::Success { data, .. } => Some(data),
            JobResponse::Failure { .. } => None,
        }
    }
}

struct JobOutcome {
    mode: AcquisitionMode,
    published: PublishedResult,
}

/// Runs jobs against the analysis service.
///
/// Holds only immutable, shareable state; one handler serves any number of
/// concurrent jobs.
pub struct JobHandler {
    config: Arc<WorkerConfig>,
    prober: ReadinessProber,
    acquirer: InputAcquirer,
    analysis: AnalysisClient,
    publisher: ResultPublisher,
    callback: CallbackRelay,
}

impl JobHandler {
    /// Build a handler, with object storage when the configuration enables it.
    pub fn new(config: Arc<WorkerConfig>) -> JobResult<Self> {
        let publisher = ResultPublisher::from_config(config.storage.as_ref())
            .map_err(|e| JobError::Config(e.to_string()))?;
        Self::with_publisher(config, publisher)
    }

    pub fn with_publisher(
        config: Arc<WorkerConfig>,
        publisher: ResultPublisher,
    ) -> JobResult<Self> {
        let prober = ReadinessProber::new(
            config.readiness_url.clone(),
            config.readiness_max_attempts,
            config.readiness_interval_ms,
        )
        .map_err(|e| JobError::Config(format!("Failed to create readiness client: {e}")))?;

        let acquirer = InputAcquirer::new(AcquireOptions {
            transcode: config.transcode_input,
            ffmpeg_path: config.ffmpeg_path.clone(),
            download_timeout: config.download_timeout(),
            max_download_bytes: config.max_download_bytes,
        })
        .map_err(|e| JobError::Config(e.to_string()))?;

        let analysis = AnalysisClient::new(config.analysis_url.clone(), config.analysis_timeout())
            .map_err(|e| JobError::Config(e.to_string()))?;

        let callback = CallbackRelay::new(config.callback_timeout())
            .allow_private(config.callback_allow_private);

        Ok(Self {
            config,
            prober,
            acquirer,
            analysis,
            publisher,
            callback,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<WorkerConfig> {
        self.config.clone()
    }

    /// Run a job to completion and render its response.
    pub async fn handle(&self, job: &Job) -> JobResponse {
        match self.process(job).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_client_error() {
                    warn!(job_id = %job.id, error = %e, "Rejected job");
                } else {
                    error!(job_id = %job.id, error = %e, "Job failed");
                }
                JobResponse::failure(e.to_string())
            }
        }
    }

    /// Run a job, returning the first stage failure as an error.
    pub async fn process(&self, job: &Job) -> JobResult<JobResponse> {
        let input = &job.input;
        let source = input.audio_source().ok_or(JobError::MissingAudio)?;

        info!(
            job_id = %job.id,
            title = %input.title(),
            transcript = %input.transcript(),
            output_format = %input.output_format(),
            mime = %input.mime(),
            "Processing job"
        );

        let ready = self.prober.wait_until_ready().await;
        if !ready && self.config.require_ready {
            return Err(JobError::NotReady {
                url: self.prober.url().to_string(),
                attempts: self.prober.max_attempts(),
            });
        }

        let scratch = ScratchFile::create(self.config.scratch_dir.as_deref())
            .map_err(|e| JobError::Scratch(e.to_string()))?;
        debug!(job_id = %job.id, scratch = %scratch.dir().display(), "Allocated scratch space");

        let outcome = self.run_pipeline(job, source, &scratch).await;

        let scratch_dir = scratch.dir().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(
                job_id = %job.id,
                scratch = %scratch_dir.display(),
                error = %e,
                "Failed to remove scratch space"
            );
        }

        let JobOutcome { mode, published } = outcome?;
        let data = published.to_value();

        if let Some(submit_url) = input.submit_url() {
            self.relay(&job.id, submit_url, &data).await;
        }

        info!(job_id = %job.id, "Job completed");
        Ok(JobResponse::Success {
            id: job.id.clone(),
            message: mode.success_message().to_string(),
            data,
        })
    }

    async fn run_pipeline(
        &self,
        job: &Job,
        source: AudioSource<'_>,
        scratch: &ScratchFile,
    ) -> JobResult<JobOutcome> {
        let input = &job.input;
        let mode = source.mode();

        let acquired = match source {
            AudioSource::Base64(encoded) => {
                info!(job_id = %job.id, data = %base64_preview(encoded), "Using base64 audio");
                let with_mp3 = input.upload_mp3()
                    && input.source_url().is_none()
                    && self.publisher.uploads_enabled();
                self.acquirer
                    .acquire_from_base64(encoded, scratch, with_mp3)
                    .await
            }
            AudioSource::Url(url) => {
                info!(job_id = %job.id, url = %url, "Downloading audio");
                self.acquirer.acquire_from_url(url, scratch).await
            }
        }
        .map_err(|source| JobError::Acquisition { mode, source })?;
        info!(job_id = %job.id, "{}", mode.success_message());

        let source_audio_url = match (input.source_url(), &acquired.mp3_path) {
            (Some(url), _) => Some(url.to_string()),
            (None, Some(mp3_path)) => {
                self.publisher
                    .upload_source_audio(&job.id, mp3_path)
                    .await?
            }
            (None, None) => None,
        };

        let request = AnalysisRequest::new(input.transcript(), input.output_format())
            .with_sample_rate(self.config.sample_rate)
            .with_channels(self.config.channels);
        let result = self.analysis.analyze(&acquired.wav_path, &request).await?;
        info!(job_id = %job.id, "Analysis completed");

        let published = self
            .publisher
            .publish(
                &job.id,
                result,
                input.output_format(),
                scratch,
                source_audio_url.as_deref(),
            )
            .await?;

        Ok(JobOutcome { mode, published })
    }

    async fn relay(&self, job_id: &str, url: &str, data: &Value) {
        match self.callback.relay(url, data).await {
            Ok(status) => debug!(job_id = %job_id, status, "Callback delivered"),
            Err(e) => warn!(job_id = %job_id, url = %url, error = %e, "Callback relay failed"),
        }
    }
}

/// Run `job` on its own task so a panic inside it cannot take down the caller.
pub async fn run_job(handler: Arc<JobHandler>, job: Job) -> JobResponse {
    let job_id = job.id.clone();
    match tokio::spawn(async move { handler.handle(&job).await }).await {
        Ok(response) => response,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Job task terminated unexpectedly");
            JobResponse::failure(INTERNAL_FAILURE)
        }
    }
}
