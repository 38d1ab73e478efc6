//! Configuration module for the worker
//!
//! This module handles worker configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading and overrides
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use lipsync_worker::config::WorkerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = WorkerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = WorkerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Worker listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::{Host, Url};

mod env;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::analysis::{DEFAULT_ANALYSIS_URL, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use crate::core::readiness::{DEFAULT_INTERVAL_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_READINESS_URL};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;
/// Largest `POST /runsync` body; leaves room for base64 audio of a similar size.
pub const DEFAULT_MAX_JOB_BYTES: usize = 384 * 1024 * 1024;
pub const DEFAULT_ANALYSIS_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_CALLBACK_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";
pub const DEFAULT_BUCKET_REGION: &str = "us-east-1";
/// Presigned URLs stay valid for a week.
pub const DEFAULT_URL_EXPIRY_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: String, error: String },

    #[error("Failed to parse YAML config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Object storage settings
///
/// Present only when `BUCKET_ENDPOINT_URL` (or `storage.endpoint_url`) is
/// set; its presence switches the worker into upload mode.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub endpoint_url: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Explicit bucket. When unset the first label of the endpoint host is used
    /// and requests are addressed virtual-hosted style.
    pub bucket_name: Option<String>,
    pub region: String,
    pub url_expiry_seconds: u64,
}

impl StorageConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            access_key_id: None,
            secret_access_key: None,
            bucket_name: None,
            region: DEFAULT_BUCKET_REGION.to_string(),
            url_expiry_seconds: DEFAULT_URL_EXPIRY_SECONDS,
        }
    }

    /// Effective bucket name.
    pub fn bucket(&self) -> Option<String> {
        if let Some(name) = self.bucket_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Some(name.trim().to_string());
        }
        let url = Url::parse(&self.endpoint_url).ok()?;
        match url.host()? {
            Host::Domain(domain) if domain.contains('.') => {
                domain.split('.').next().map(str::to_string)
            }
            _ => None,
        }
    }

    /// Whether the bucket is part of the endpoint host.
    pub fn uses_virtual_hosted_style(&self) -> bool {
        self.bucket_name
            .as_deref()
            .is_none_or(|n| n.trim().is_empty())
            && self.bucket().is_some()
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "***"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("url_expiry_seconds", &self.url_expiry_seconds)
            .finish()
    }
}

/// Clear credentials from memory when the storage settings are dropped.
impl Drop for StorageConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.access_key_id {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.secret_access_key {
            secret.zeroize();
        }
    }
}

/// Worker configuration
///
/// Built once at startup and shared read-only by every job.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    // HTTP serve mode
    pub host: String,
    pub port: u16,
    /// Request body limit for submitted jobs
    pub max_job_bytes: usize,

    // Analysis service
    pub analysis_url: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub analysis_timeout_seconds: u64,

    // Readiness probe
    pub readiness_url: String,
    pub readiness_max_attempts: u32,
    pub readiness_interval_ms: u64,
    /// Fail jobs when the analysis service never becomes ready
    pub require_ready: bool,

    // Input acquisition
    pub transcode_input: bool,
    pub download_timeout_seconds: u64,
    pub max_download_bytes: u64,
    pub scratch_dir: Option<PathBuf>,
    pub ffmpeg_path: PathBuf,

    // Callback relay
    pub callback_timeout_seconds: u64,
    pub callback_allow_private: bool,

    pub storage: Option<StorageConfig>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_job_bytes: DEFAULT_MAX_JOB_BYTES,
            analysis_url: DEFAULT_ANALYSIS_URL.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            analysis_timeout_seconds: DEFAULT_ANALYSIS_TIMEOUT_SECONDS,
            readiness_url: DEFAULT_READINESS_URL.to_string(),
            readiness_max_attempts: DEFAULT_MAX_ATTEMPTS,
            readiness_interval_ms: DEFAULT_INTERVAL_MS,
            require_ready: false,
            transcode_input: true,
            download_timeout_seconds: DEFAULT_DOWNLOAD_TIMEOUT_SECONDS,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            scratch_dir: None,
            ffmpeg_path: PathBuf::from(DEFAULT_FFMPEG_PATH),
            callback_timeout_seconds: DEFAULT_CALLBACK_TIMEOUT_SECONDS,
            callback_allow_private: false,
            storage: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables over defaults.
    ///
    /// The `.env` file is loaded in `main` before this runs, so its values are
    /// already visible as environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variables as base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let mut config = env::from_env()?;
        yaml_config.apply_to(&mut config);
        validation::validate(&config)?;
        Ok(config)
    }

    /// Run validation on an already assembled configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_seconds)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_seconds)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const ENV_KEYS: &[&str] = &[
        "HOST",
        "PORT",
        "MAX_JOB_BYTES",
        "ANALYSIS_URL",
        "ANALYSIS_SAMPLE_RATE",
        "ANALYSIS_CHANNELS",
        "ANALYSIS_TIMEOUT_SECONDS",
        "READINESS_URL",
        "READINESS_MAX_ATTEMPTS",
        "READINESS_INTERVAL_MS",
        "REQUIRE_READY",
        "TRANSCODE_INPUT",
        "DOWNLOAD_TIMEOUT_SECONDS",
        "MAX_DOWNLOAD_BYTES",
        "SCRATCH_DIR",
        "FFMPEG_PATH",
        "CALLBACK_TIMEOUT_SECONDS",
        "CALLBACK_ALLOW_PRIVATE",
        "BUCKET_ENDPOINT_URL",
        "BUCKET_ACCESS_KEY_ID",
        "BUCKET_SECRET_ACCESS_KEY",
        "BUCKET_NAME",
        "BUCKET_REGION",
        "BUCKET_URL_EXPIRY_SECONDS",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        for key in ENV_KEYS {
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = WorkerConfig::from_env().unwrap();

        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.analysis_url, "http://localhost:8000/analyze/");
        assert_eq!(config.readiness_url, "http://localhost:8000/docs");
        assert_eq!(config.readiness_max_attempts, 50);
        assert_eq!(config.readiness_interval_ms, 500);
        assert_eq!(config.sample_rate, 24_000);
        assert_eq!(config.channels, 1);
        assert!(!config.require_ready);
        assert!(config.transcode_input);
        assert!(config.storage.is_none());
        assert_eq!(config.download_timeout(), Duration::from_secs(120));
        assert_eq!(config.max_download_bytes, DEFAULT_MAX_DOWNLOAD_BYTES);
        assert_eq!(config.max_job_bytes, DEFAULT_MAX_JOB_BYTES);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("PORT", "9000");
            std::env::set_var("REQUIRE_READY", "true");
            std::env::set_var("READINESS_MAX_ATTEMPTS", "3");
            std::env::set_var("TRANSCODE_INPUT", "0");
            std::env::set_var("MAX_DOWNLOAD_BYTES", "1048576");
            std::env::set_var("MAX_JOB_BYTES", "8388608");
            std::env::set_var("BUCKET_ENDPOINT_URL", "https://media.s3.example.com");
            std::env::set_var("BUCKET_ACCESS_KEY_ID", "key");
            std::env::set_var("BUCKET_SECRET_ACCESS_KEY", "secret");
        }

        let config = WorkerConfig::from_env().unwrap();

        assert_eq!(config.port, 9000);
        assert!(config.require_ready);
        assert_eq!(config.readiness_max_attempts, 3);
        assert!(!config.transcode_input);
        assert_eq!(config.max_download_bytes, 1_048_576);
        assert_eq!(config.max_job_bytes, 8_388_608);
        let storage = config.storage.as_ref().unwrap();
        assert_eq!(storage.bucket().as_deref(), Some("media"));
        assert!(storage.uses_virtual_hosted_style());
        assert_eq!(storage.secret_access_key.as_deref(), Some("secret"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("PORT", "not-a-port");
        }

        let result = WorkerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  port: 7000

readiness:
  max_attempts: 5
  required: true

storage:
  endpoint_url: "http://127.0.0.1:9000"
  bucket_name: "artifacts"
"#;
        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            std::env::set_var("PORT", "9000");
            std::env::set_var("HOST", "127.0.0.1");
        }

        let config = WorkerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.port, 7000);
        // ENV value kept where YAML is silent
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.readiness_max_attempts, 5);
        assert!(config.require_ready);
        let storage = config.storage.as_ref().unwrap();
        assert_eq!(storage.bucket().as_deref(), Some("artifacts"));
        assert!(!storage.uses_virtual_hosted_style());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = WorkerConfig::from_file(Path::new("/nonexistent/config.yaml"));

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_storage_bucket_not_derived_from_ip_or_single_label() {
        assert!(StorageConfig::new("http://127.0.0.1:9000").bucket().is_none());
        assert!(StorageConfig::new("http://minio:9000").bucket().is_none());
        assert!(StorageConfig::new("not a url").bucket().is_none());
    }

    #[test]
    fn test_storage_debug_redacts_secrets() {
        let mut storage = StorageConfig::new("https://b.example.com");
        storage.secret_access_key = Some("super-secret".to_string());

        let rendered = format!("{storage:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("***"));
    }
}
