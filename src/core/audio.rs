//! Audio normalization helpers.
//!
//! Incoming audio may be in any container symphonia can probe (MP3, OGG,
//! FLAC, MP4/AAC, WAV...). It is decoded to interleaved 16-bit PCM and
//! re-encoded as a WAV file with `hound`, which is the container the
//! analysis service expects. MP3 export is delegated to the `ffmpeg` binary.

use std::io::Cursor;
use std::path::Path;
use std::process::Stdio;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors raised while decoding or encoding audio.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode WAV: {0}")]
    Encode(String),

    #[error("ffmpeg binary not found at '{0}'")]
    FfmpegMissing(String),

    #[error("ffmpeg exited with status {status}: {stderr}")]
    FfmpegFailed { status: i32, stderr: String },

    #[error("Audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded audio as interleaved signed 16-bit samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl DecodedAudio {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Decode an in-memory audio file of any supported container.
pub fn decode(data: &[u8]) -> Result<DecodedAudio, AudioError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("probe: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("no audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("codec: {e}")))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count() as u16);
    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(format!("packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "Skipping corrupt audio frame");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("decode: {e}"))),
        };

        let spec = *decoded.spec();
        if decoded.frames() == 0 {
            continue;
        }
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if samples.is_empty() {
        return Err(AudioError::Decode("no audio samples decoded".to_string()));
    }

    let audio = DecodedAudio {
        sample_rate: sample_rate
            .ok_or_else(|| AudioError::Decode("unknown sample rate".to_string()))?,
        channels: channels.unwrap_or(1),
        samples,
    };

    debug!(
        sample_rate = audio.sample_rate,
        channels = audio.channels,
        duration_secs = audio.duration_secs(),
        "Audio decoded"
    );

    Ok(audio)
}

/// Encode decoded audio as a 16-bit PCM WAV file.
pub fn encode_wav(audio: &DecodedAudio) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + audio.samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioError::Encode(e.to_string()))?;
        for sample in &audio.samples {
            writer
                .write_sample(*sample)
                .map_err(|e| AudioError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Encode(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Decode arbitrary audio bytes and re-encode them as WAV.
pub fn transcode_to_wav(data: &[u8]) -> Result<Vec<u8>, AudioError> {
    encode_wav(&decode(data)?)
}

/// Export `input` as MP3 at `output` using ffmpeg.
pub async fn export_mp3(ffmpeg: &Path, input: &Path, output: &Path) -> Result<(), AudioError> {
    let result = Command::new(ffmpeg)
        .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(input)
        .args(["-vn", "-codec:a", "libmp3lame", "-q:a", "2"])
        .arg(output)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    let output_status = match result {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AudioError::FfmpegMissing(ffmpeg.display().to_string()));
        }
        Err(e) => return Err(AudioError::Io(e)),
    };

    if !output_status.status.success() {
        return Err(AudioError::FfmpegFailed {
            status: output_status.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output_status.stderr)
                .trim()
                .to_string(),
        });
    }

    Ok(())
}

/// Whether the given ffmpeg binary can be executed.
pub async fn ffmpeg_available(ffmpeg: &Path) -> bool {
    Command::new(ffmpeg)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
