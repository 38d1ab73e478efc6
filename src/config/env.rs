//! Environment variable loading.

use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, StorageConfig, WorkerConfig};

/// Non-empty, trimmed value of `key`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    env_string(key)
        .map(|value| {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    env_string(key)
        .map(|value| {
            parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

fn storage_from_env() -> Result<Option<StorageConfig>, ConfigError> {
    let Some(endpoint_url) = env_string("BUCKET_ENDPOINT_URL") else {
        return Ok(None);
    };

    let mut storage = StorageConfig::new(endpoint_url);
    storage.access_key_id = env_string("BUCKET_ACCESS_KEY_ID");
    storage.secret_access_key = env_string("BUCKET_SECRET_ACCESS_KEY");
    storage.bucket_name = env_string("BUCKET_NAME");
    if let Some(region) = env_string("BUCKET_REGION") {
        storage.region = region;
    }
    if let Some(expiry) = env_parse("BUCKET_URL_EXPIRY_SECONDS")? {
        storage.url_expiry_seconds = expiry;
    }
    Ok(Some(storage))
}

/// Defaults overridden by whatever the environment sets.
pub(super) fn from_env() -> Result<WorkerConfig, ConfigError> {
    let mut config = WorkerConfig::default();

    if let Some(host) = env_string("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse("PORT")? {
        config.port = port;
    }
    if let Some(limit) = env_parse("MAX_JOB_BYTES")? {
        config.max_job_bytes = limit;
    }

    if let Some(url) = env_string("ANALYSIS_URL") {
        config.analysis_url = url;
    }
    if let Some(rate) = env_parse("ANALYSIS_SAMPLE_RATE")? {
        config.sample_rate = rate;
    }
    if let Some(channels) = env_parse("ANALYSIS_CHANNELS")? {
        config.channels = channels;
    }
    if let Some(timeout) = env_parse("ANALYSIS_TIMEOUT_SECONDS")? {
        config.analysis_timeout_seconds = timeout;
    }

    if let Some(url) = env_string("READINESS_URL") {
        config.readiness_url = url;
    }
    if let Some(attempts) = env_parse("READINESS_MAX_ATTEMPTS")? {
        config.readiness_max_attempts = attempts;
    }
    if let Some(interval) = env_parse("READINESS_INTERVAL_MS")? {
        config.readiness_interval_ms = interval;
    }
    if let Some(required) = env_bool("REQUIRE_READY")? {
        config.require_ready = required;
    }

    if let Some(transcode) = env_bool("TRANSCODE_INPUT")? {
        config.transcode_input = transcode;
    }
    if let Some(timeout) = env_parse("DOWNLOAD_TIMEOUT_SECONDS")? {
        config.download_timeout_seconds = timeout;
    }
    if let Some(limit) = env_parse("MAX_DOWNLOAD_BYTES")? {
        config.max_download_bytes = limit;
    }
    if let Some(dir) = env_string("SCRATCH_DIR") {
        config.scratch_dir = Some(PathBuf::from(dir));
    }
    if let Some(path) = env_string("FFMPEG_PATH") {
        config.ffmpeg_path = PathBuf::from(path);
    }

    if let Some(timeout) = env_parse("CALLBACK_TIMEOUT_SECONDS")? {
        config.callback_timeout_seconds = timeout;
    }
    if let Some(allow) = env_bool("CALLBACK_ALLOW_PRIVATE")? {
        config.callback_allow_private = allow;
    }

    config.storage = storage_from_env()?;

    Ok(config)
}
