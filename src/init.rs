//! Runtime prerequisite checks.
//!
//! This module powers the `lipsync-worker init` CLI command. It verifies, before
//! the worker takes any jobs, that the scratch directory is writable, the
//! storage settings produce a usable uploader, and the ffmpeg binary needed for
//! MP3 export can be executed.
//!
//! ```text
//! $ SCRATCH_DIR=/data/scratch BUCKET_ENDPOINT_URL=https://media.s3.example.com lipsync-worker init
//! ```

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::core::audio::ffmpeg_available;
use crate::core::publish::BucketUploader;
use crate::core::scratch::ScratchFile;

/// Check every runtime prerequisite, failing on the first hard error.
pub async fn run(config: &WorkerConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    let scratch = ScratchFile::create(config.scratch_dir.as_deref())
        .context("Scratch directory is not writable")?;
    tokio::fs::write(scratch.path(), b"probe")
        .await
        .context("Failed to write into scratch directory")?;
    scratch
        .close()
        .context("Failed to remove scratch directory")?;
    info!(
        scratch_root = %config
            .scratch_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| std::env::temp_dir().display().to_string()),
        "Scratch directory is writable"
    );

    match &config.storage {
        Some(storage) => {
            BucketUploader::from_config(storage)
                .map_err(|e| anyhow!("Object storage is misconfigured: {e}"))?;
            info!(endpoint = %storage.endpoint_url, "Object storage settings are usable");
        }
        None => info!("Object storage not configured, results will be returned inline"),
    }

    if ffmpeg_available(&config.ffmpeg_path).await {
        info!(ffmpeg = %config.ffmpeg_path.display(), "ffmpeg is available");
    } else if config.has_storage() {
        return Err(anyhow!(
            "ffmpeg not found at {}; it is required to export MP3 source audio",
            config.ffmpeg_path.display()
        ));
    } else {
        warn!(
            ffmpeg = %config.ffmpeg_path.display(),
            "ffmpeg not found; MP3 source audio export will be unavailable"
        );
    }

    Ok(())
}
