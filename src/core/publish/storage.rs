//! Object-storage uploads for job artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, info, warn};

use super::PublishError;
use crate::config::StorageConfig;
use crate::core::scratch::{job_key, sanitize_file_name};

/// Uploads local files for a job and hands back one URL per file.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    /// Upload `files` under the job's prefix. URLs come back in input order.
    async fn upload(&self, job_id: &str, files: &[PathBuf]) -> Result<Vec<String>, PublishError>;
}

/// Object key for `file_name` under the job's prefix.
fn build_object_key(job_id: &str, file_name: &str) -> String {
    format!("{}/{}", job_key(job_id), sanitize_file_name(file_name))
}

/// [`ArtifactUploader`] backed by an `object_store` bucket.
pub struct BucketUploader {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    public_base_url: String,
    url_expiry: Duration,
}

impl BucketUploader {
    /// Uploader that reports `<public_base_url>/<key>` for every object.
    pub fn new(store: Arc<dyn ObjectStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            signer: None,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            url_expiry: Duration::from_secs(crate::config::DEFAULT_URL_EXPIRY_SECONDS),
        }
    }

    /// Report presigned GET URLs valid for `expiry` instead of plain ones.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>, expiry: Duration) -> Self {
        self.signer = Some(signer);
        self.url_expiry = expiry;
        self
    }

    /// Build an S3-compatible uploader from the storage settings.
    pub fn from_config(config: &StorageConfig) -> Result<Self, PublishError> {
        let bucket = config.bucket().ok_or_else(|| {
            PublishError::Configuration(format!(
                "cannot determine bucket name from endpoint {}",
                config.endpoint_url
            ))
        })?;
        let endpoint = config.endpoint_url.trim_end_matches('/');
        let virtual_hosted = config.uses_virtual_hosted_style();

        let mut builder = AmazonS3Builder::new()
            .with_endpoint(endpoint)
            .with_bucket_name(&bucket)
            .with_region(&config.region)
            .with_allow_http(endpoint.starts_with("http://"))
            .with_virtual_hosted_style_request(virtual_hosted);

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        let s3 = Arc::new(
            builder
                .build()
                .map_err(|e| PublishError::Configuration(e.to_string()))?,
        );

        let public_base_url = if virtual_hosted {
            endpoint.to_string()
        } else {
            format!("{endpoint}/{bucket}")
        };

        info!(bucket = %bucket, endpoint = %endpoint, "Object storage configured");

        Ok(Self::new(s3.clone(), public_base_url)
            .with_signer(s3, Duration::from_secs(config.url_expiry_seconds)))
    }

    async fn object_url(&self, path: &ObjectPath) -> String {
        if let Some(signer) = &self.signer {
            match signer.signed_url(Method::GET, path, self.url_expiry).await {
                Ok(url) => return url.to_string(),
                Err(e) => {
                    warn!(key = %path, error = %e, "Failed to presign URL, using plain object URL");
                }
            }
        }
        format!("{}/{}", self.public_base_url, path)
    }

    async fn upload_one(&self, job_id: &str, file: &Path) -> Result<String, PublishError> {
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PublishError::Upload(format!("invalid file name: {}", file.display())))?;

        let contents = tokio::fs::read(file).await.map_err(|e| PublishError::Io {
            path: file.display().to_string(),
            error: e.to_string(),
        })?;
        let size = contents.len();

        let key = build_object_key(job_id, file_name);
        let path = ObjectPath::parse(key.as_str())
            .map_err(|e| PublishError::Upload(format!("invalid object key {key}: {e}")))?;

        self.store
            .put(&path, PutPayload::from(contents))
            .await
            .map_err(|e| PublishError::Upload(e.to_string()))?;

        debug!(key = %path, bytes = size, "Uploaded artifact");
        Ok(self.object_url(&path).await)
    }
}

#[async_trait]
impl ArtifactUploader for BucketUploader {
    async fn upload(&self, job_id: &str, files: &[PathBuf]) -> Result<Vec<String>, PublishError> {
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            urls.push(self.upload_one(job_id, file).await?);
        }
        info!(job_id = %job_id, count = urls.len(), "Uploaded job artifacts");
        Ok(urls)
    }
}
