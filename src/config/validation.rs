use url::Url;

use super::{ConfigError, WorkerConfig};

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("{name} '{value}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "{name} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host().is_none() {
        return Err(ConfigError::Invalid(format!("{name} must have a host")));
    }
    Ok(())
}

fn validate_positive(name: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    Ok(())
}

pub(super) fn validate(config: &WorkerConfig) -> Result<(), ConfigError> {
    validate_http_url("analysis_url", &config.analysis_url)?;
    validate_http_url("readiness_url", &config.readiness_url)?;

    validate_positive("readiness_max_attempts", u64::from(config.readiness_max_attempts))?;
    validate_positive("readiness_interval_ms", config.readiness_interval_ms)?;
    validate_positive("sample_rate", u64::from(config.sample_rate))?;
    validate_positive("channels", u64::from(config.channels))?;
    validate_positive("download_timeout_seconds", config.download_timeout_seconds)?;
    validate_positive("max_download_bytes", config.max_download_bytes)?;
    validate_positive("max_job_bytes", config.max_job_bytes as u64)?;
    validate_positive("analysis_timeout_seconds", config.analysis_timeout_seconds)?;
    validate_positive("callback_timeout_seconds", config.callback_timeout_seconds)?;

    if let Some(storage) = &config.storage {
        validate_http_url("storage endpoint_url", &storage.endpoint_url)?;
        if storage.bucket().is_none() {
            return Err(ConfigError::Invalid(format!(
                "cannot derive a bucket name from {}; set BUCKET_NAME",
                storage.endpoint_url
            )));
        }
        if storage.access_key_id.is_some() != storage.secret_access_key.is_some() {
            return Err(ConfigError::Invalid(
                "storage access key id and secret must be set together".to_string(),
            ));
        }
        validate_positive("url_expiry_seconds", storage.url_expiry_seconds)?;
    }

    Ok(())
}
