//! Builds local test jobs from audio files.

use std::io;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use uuid::Uuid;

use crate::core::job::{Job, JobInput};

/// Default file the `run` command reads its job from.
pub const TEST_INPUT_FILE: &str = "test_input.json";

const FALLBACK_MIME: &str = "application/octet-stream";

/// Guess a MIME type from the file extension.
pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("wav") => "audio/x-wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("webm") => "audio/webm",
        _ => FALLBACK_MIME,
    }
}

/// Read `audio_path` and wrap it as an inline-base64 job with a fresh id.
pub fn build_test_job(audio_path: &Path) -> io::Result<Job> {
    let contents = std::fs::read(audio_path)?;

    Ok(Job {
        id: Uuid::new_v4().to_string(),
        input: JobInput {
            mime: Some(guess_mime(audio_path).to_string()),
            data: Some(BASE64.encode(contents)),
            ..Default::default()
        },
    })
}

/// Serialize `job` as pretty JSON to `output`.
pub fn write_test_job(job: &Job, output: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(job).map_err(io::Error::other)?;
    std::fs::write(output, json)
}
