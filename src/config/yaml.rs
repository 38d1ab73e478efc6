use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{ConfigError, StorageConfig, WorkerConfig};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables and defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///   max_job_bytes: 402653184
///
/// analysis:
///   url: "http://localhost:8000/analyze/"
///   sample_rate: 24000
///   channels: 1
///   timeout_seconds: 300
///
/// readiness:
///   url: "http://localhost:8000/docs"
///   max_attempts: 50
///   interval_ms: 500
///   required: false
///
/// input:
///   transcode: true
///   download_timeout_seconds: 120
///   max_download_bytes: 268435456
///   scratch_dir: "/tmp/worker"
///   ffmpeg_path: "/usr/bin/ffmpeg"
///
/// storage:
///   endpoint_url: "https://media.s3.example.com"
///   access_key_id: "access-key"
///   secret_access_key: "secret-key"
///   region: "us-east-1"
///   url_expiry_seconds: 604800
///
/// callback:
///   timeout_seconds: 30
///   allow_private: false
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub analysis: Option<AnalysisYaml>,
    pub readiness: Option<ReadinessYaml>,
    pub input: Option<InputYaml>,
    pub storage: Option<StorageYaml>,
    pub callback: Option<CallbackYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_job_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisYaml {
    pub url: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReadinessYaml {
    pub url: Option<String>,
    pub max_attempts: Option<u32>,
    pub interval_ms: Option<u64>,
    /// Fail jobs when the analysis service never becomes ready
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct InputYaml {
    pub transcode: Option<bool>,
    pub download_timeout_seconds: Option<u64>,
    pub max_download_bytes: Option<u64>,
    pub scratch_dir: Option<String>,
    pub ffmpeg_path: Option<String>,
}

/// Object storage configuration from YAML
///
/// Setting `endpoint_url` enables upload mode even when the environment
/// does not.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub url_expiry_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallbackYaml {
    pub timeout_seconds: Option<u64>,
    pub allow_private: Option<bool>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl StorageYaml {
    fn apply_to(self, storage: &mut Option<StorageConfig>) {
        if let Some(endpoint_url) = self.endpoint_url {
            match storage {
                Some(existing) => existing.endpoint_url = endpoint_url,
                None => *storage = Some(StorageConfig::new(endpoint_url)),
            }
        }

        // Without an endpoint there is nothing to attach credentials to
        let Some(storage) = storage.as_mut() else {
            return;
        };
        if self.access_key_id.is_some() {
            storage.access_key_id = self.access_key_id;
        }
        if self.secret_access_key.is_some() {
            storage.secret_access_key = self.secret_access_key;
        }
        if self.bucket_name.is_some() {
            storage.bucket_name = self.bucket_name;
        }
        set(&mut storage.region, self.region);
        set(&mut storage.url_expiry_seconds, self.url_expiry_seconds);
    }
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override `config` with every value present in the file.
    pub fn apply_to(self, config: &mut WorkerConfig) {
        if let Some(server) = self.server {
            set(&mut config.host, server.host);
            set(&mut config.port, server.port);
            set(&mut config.max_job_bytes, server.max_job_bytes);
        }

        if let Some(analysis) = self.analysis {
            set(&mut config.analysis_url, analysis.url);
            set(&mut config.sample_rate, analysis.sample_rate);
            set(&mut config.channels, analysis.channels);
            set(&mut config.analysis_timeout_seconds, analysis.timeout_seconds);
        }

        if let Some(readiness) = self.readiness {
            set(&mut config.readiness_url, readiness.url);
            set(&mut config.readiness_max_attempts, readiness.max_attempts);
            set(&mut config.readiness_interval_ms, readiness.interval_ms);
            set(&mut config.require_ready, readiness.required);
        }

        if let Some(input) = self.input {
            set(&mut config.transcode_input, input.transcode);
            set(
                &mut config.download_timeout_seconds,
                input.download_timeout_seconds,
            );
            set(&mut config.max_download_bytes, input.max_download_bytes);
            if let Some(dir) = input.scratch_dir {
                config.scratch_dir = Some(PathBuf::from(dir));
            }
            if let Some(path) = input.ffmpeg_path {
                config.ffmpeg_path = PathBuf::from(path);
            }
        }

        if let Some(storage) = self.storage {
            storage.apply_to(&mut config.storage);
        }

        if let Some(callback) = self.callback {
            set(&mut config.callback_timeout_seconds, callback.timeout_seconds);
            set(&mut config.callback_allow_private, callback.allow_private);
        }
    }
}
