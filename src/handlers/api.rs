use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use super::job::{JobResponse, run_job};
use crate::core::job::Job;
use crate::state::AppState;

/// Terminal state of a synchronous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Body returned by `POST /runsync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSyncResponse {
    pub id: String,
    pub status: JobStatus,
    pub output: JobResponse,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "OK"}))
}

/// Run a job and wait for its result.
///
/// The HTTP status is 200 whether or not the job succeeded; the outcome is in
/// `status` and `output`. Bodies that are not a job (malformed, or over the
/// size limit) keep the rejection status and answer `{"error": ...}`.
pub async fn run_sync(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Job>, JsonRejection>,
) -> Response {
    let job = match payload {
        Ok(Json(job)) => job,
        Err(rejection) => {
            warn!(status = %rejection.status(), error = %rejection.body_text(), "Rejected job request");
            let body = JobResponse::failure(rejection.body_text());
            return (rejection.status(), Json(body)).into_response();
        }
    };

    let id = job.id.clone();
    info!(job_id = %id, "Received job");

    let output = run_job(state.job_handler.clone(), job).await;
    let status = if output.is_success() {
        JobStatus::Completed
    } else {
        JobStatus::Failed
    };

    (StatusCode::OK, Json(RunSyncResponse { id, status, output })).into_response()
}
