//! Per-job scratch space.
//!
//! Each job gets its own temporary directory holding the materialized input
//! audio (`input.wav`) and every file derived from it. Dropping or closing the
//! [`ScratchFile`] removes the whole directory, so nothing written during a job
//! survives it.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "job-";
const INPUT_FILE_NAME: &str = "input.wav";
/// Hex digits of the id digest appended by [`job_key`].
const JOB_KEY_DIGEST_LEN: usize = 8;

/// Exclusively-owned scratch location for a single job.
#[derive(Debug)]
pub struct ScratchFile {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchFile {
    /// Allocate scratch space under `root`, or the system temp dir when `None`.
    pub fn create(root: Option<&Path>) -> io::Result<Self> {
        let dir = match root {
            Some(root) => tempfile::Builder::new()
                .prefix(SCRATCH_PREFIX)
                .tempdir_in(root)?,
            None => tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?,
        };
        let path = dir.path().join(INPUT_FILE_NAME);
        Ok(Self { dir, path })
    }

    /// Path the canonical (WAV) input audio is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Secondary-format path derived from the scratch path.
    ///
    /// `.../input.wav` becomes `.../input.mp3`; a path without the `.wav`
    /// suffix gets the extension appended instead.
    pub fn derived(&self, extension: &str) -> PathBuf {
        derive_path(&self.path, extension)
    }

    /// Path for a job artifact (result audio, result JSON) inside the scratch dir.
    pub fn artifact(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(sanitize_file_name(file_name))
    }

    /// Remove the scratch directory, reporting failures instead of ignoring them.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

pub(crate) fn derive_path(path: &Path, extension: &str) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "wav" => path.with_extension(extension),
        _ => {
            let mut raw = path.as_os_str().to_owned();
            raw.push(".");
            raw.push(extension);
            PathBuf::from(raw)
        }
    }
}

/// Make a caller-controlled string safe to use as a single file name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        format!("job{}", cleaned.replace('.', "_"))
    } else {
        cleaned
    }
}

/// Storage-safe name for a job id.
///
/// Ids that survive [`sanitize_file_name`] unchanged are used as is. Any other
/// id gets a short digest of the raw value appended, so `a/b` and `a_b` never
/// share a name.
pub fn job_key(job_id: &str) -> String {
    let cleaned = sanitize_file_name(job_id);
    if cleaned == job_id {
        return cleaned;
    }
    let digest = hex::encode(Sha256::digest(job_id.as_bytes()));
    format!("{cleaned}-{}", &digest[..JOB_KEY_DIGEST_LEN])
}
