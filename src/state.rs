use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::errors::JobResult;
use crate::handlers::JobHandler;

/// Shared state for the HTTP worker API.
pub struct AppState {
    pub config: Arc<WorkerConfig>,
    pub job_handler: Arc<JobHandler>,
}

impl AppState {
    pub fn new(config: WorkerConfig) -> JobResult<Arc<Self>> {
        let config = Arc::new(config);
        let job_handler = Arc::new(JobHandler::new(config.clone())?);
        Ok(Arc::new(Self {
            config,
            job_handler,
        }))
    }

    pub fn with_handler(job_handler: Arc<JobHandler>) -> Arc<Self> {
        Arc::new(Self {
            config: job_handler.shared_config(),
            job_handler,
        })
    }
}
