//! Worker HTTP API tests

mod fixtures;

use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::util::ServiceExt;
use wiremock::MockServer;

use fixtures::*;
use lipsync_worker::{AppState, WorkerConfig, routes};

fn app(config: WorkerConfig) -> axum::Router {
    let router = routes::api::create_api_router(&config);
    let state: Arc<AppState> = AppState::new(config).unwrap();
    router.with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn runsync(job: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/runsync")
        .header("content-type", "application/json")
        .body(Body::from(job.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = app(WorkerConfig::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "OK"}));
}

#[tokio::test]
async fn test_runsync_completed() {
    let server = MockServer::start().await;
    let scratch = TempDir::new().unwrap();
    mount_ready(&server).await;
    mount_analysis(&server, 200, analysis_response()).await;

    let response = app(test_config(&server, scratch.path()))
        .oneshot(runsync(json!({"id": "r1", "input": {"data": tone_wav_base64()}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], "r1");
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["output"]["data"], analysis_response());
}

#[tokio::test]
async fn test_runsync_failed() {
    let server = MockServer::start().await;
    let scratch = TempDir::new().unwrap();

    let response = app(test_config(&server, scratch.path()))
        .oneshot(runsync(json!({"id": "r2", "input": {}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "id": "r2",
            "status": "FAILED",
            "output": {"error": "No URL or base64-encoded audio provided in input."}
        })
    );
}

#[tokio::test]
async fn test_runsync_rejects_malformed_job() {
    let response = app(WorkerConfig::default())
        .oneshot(runsync(json!({"input": {"data": "AAAA"}})))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    let json = body_json(response).await;
    assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()), "{json}");
}

#[tokio::test]
async fn test_runsync_accepts_multi_megabyte_audio() {
    let server = MockServer::start().await;
    let scratch = TempDir::new().unwrap();
    mount_ready(&server).await;
    mount_analysis(&server, 200, analysis_response()).await;

    // 70 s of 16 kHz mono audio is a little over 3 MB once base64 encoded
    let samples = generate_sine_wave(SAMPLE_RATE as usize * 70, 440.0, 0.5);
    let encoded = BASE64.encode(wav_bytes(&samples, SAMPLE_RATE, 1));
    assert!(encoded.len() > 3 * 1024 * 1024);

    let response = app(test_config(&server, scratch.path()))
        .oneshot(runsync(json!({"id": "big", "input": {"data": encoded}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "COMPLETED");
}

#[tokio::test]
async fn test_runsync_over_job_limit_answers_with_error() {
    let server = MockServer::start().await;
    let scratch = TempDir::new().unwrap();
    let config = WorkerConfig {
        max_job_bytes: 1024,
        ..test_config(&server, scratch.path())
    };

    let response = app(config)
        .oneshot(runsync(json!({"id": "huge", "input": {"data": tone_wav_base64()}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = body_json(response).await;
    assert!(json["error"].is_string(), "{json}");
    assert_eq!(scratch_entries(scratch.path()), 0);
}
