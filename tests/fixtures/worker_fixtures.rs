//! Worker configuration and mock service helpers

use std::net::TcpListener;
use std::path::Path;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lipsync_worker::WorkerConfig;

/// Configuration pointing every outbound call at `server`
pub fn test_config(server: &MockServer, scratch_root: &Path) -> WorkerConfig {
    WorkerConfig {
        analysis_url: format!("{}/analyze/", server.uri()),
        readiness_url: format!("{}/docs", server.uri()),
        readiness_max_attempts: 2,
        readiness_interval_ms: 10,
        scratch_dir: Some(scratch_root.to_path_buf()),
        download_timeout_seconds: 5,
        analysis_timeout_seconds: 5,
        callback_timeout_seconds: 5,
        callback_allow_private: true,
        ..Default::default()
    }
}

/// Find a port nothing is listening on
pub fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn dead_url(path: &str) -> String {
    format!("http://127.0.0.1:{}{}", find_available_port(), path)
}

/// Typical analysis service response
pub fn analysis_response() -> Value {
    json!({
        "data_encoded_audio": "AAECAwQFBgc=",
        "data": {
            "visemes": [{"time": 0.0, "shape": "A"}, {"time": 0.12, "shape": "O"}],
            "text": "héllo wörld"
        },
        "duration": 0.5
    })
}

pub async fn mount_ready(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
}

pub async fn mount_analysis(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path("/analyze/"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Number of entries left under the scratch root
pub fn scratch_entries(root: &Path) -> usize {
    std::fs::read_dir(root).unwrap().count()
}
