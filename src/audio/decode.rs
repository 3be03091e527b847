/*!
 * Clip decoders.
 *
 * A decoder turns a clip file into mono `f32` samples at a requested rate.
 * `FfmpegDecoder` accepts anything ffmpeg reads (edge-tts writes MP3 bytes
 * even under a `.wav` name); `WavDecoder` reads PCM WAV in-process.
 */

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use hound::{SampleFormat, WavReader};

use crate::audio::resample::{downmix, resample};
use crate::errors::AssemblyError;
use crate::media::run_tool;

#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode `path` to mono samples at `sample_rate`
    async fn decode(&self, path: &Path, sample_rate: u32) -> Result<Vec<f32>, AssemblyError>;
}

/// Interleaved samples of a WAV file plus its layout
#[derive(Debug, Clone)]
pub struct WavData {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Read a WAV file into normalized `f32` samples
pub fn read_wav(path: &Path) -> Result<WavData, AssemblyError> {
    let decode_error = |e: hound::Error| AssemblyError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let reader = WavReader::open(path).map_err(decode_error)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode_error)?,
        (SampleFormat::Int, 8) => reader
            .into_samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<Result<_, _>>()
            .map_err(decode_error)?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32_768.0))
            .collect::<Result<_, _>>()
            .map_err(decode_error)?,
        (SampleFormat::Int, bits) => {
            let scale = (1_i64 << (bits.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(decode_error)?
        }
    };

    Ok(WavData {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

fn to_mono_at(data: WavData, path: &Path, sample_rate: u32) -> Result<Vec<f32>, AssemblyError> {
    let mono = downmix(&data.samples, data.channels);
    resample(&mono, data.sample_rate, sample_rate).map_err(|e| AssemblyError::Decode {
        path: path.to_path_buf(),
        message: format!("{:#}", e),
    })
}

/// In-process PCM WAV decoder
#[derive(Debug, Default, Clone)]
pub struct WavDecoder;

#[async_trait]
impl AudioDecoder for WavDecoder {
    async fn decode(&self, path: &Path, sample_rate: u32) -> Result<Vec<f32>, AssemblyError> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let data = read_wav(&owned)?;
            to_mono_at(data, &owned, sample_rate)
        })
        .await
        .map_err(|e| AssemblyError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    }
}

/// Decoder that transcodes through ffmpeg into a scratch WAV first
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg_path: String,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl FfmpegDecoder {
    pub fn new(ffmpeg_path: impl Into<String>, timeout: Duration, scratch_dir: impl Into<PathBuf>) -> Self {
        FfmpegDecoder {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait]
impl AudioDecoder for FfmpegDecoder {
    async fn decode(&self, path: &Path, sample_rate: u32) -> Result<Vec<f32>, AssemblyError> {
        let scratch = tempfile::Builder::new()
            .prefix("clip-")
            .suffix(".wav")
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| AssemblyError::Decode {
                path: path.to_path_buf(),
                message: format!("cannot create scratch file: {}", e),
            })?;

        let rate = sample_rate.to_string();
        run_tool(
            &self.ffmpeg_path,
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                path.as_os_str(),
                OsStr::new("-ac"),
                OsStr::new("1"),
                OsStr::new("-ar"),
                OsStr::new(&rate),
                OsStr::new("-f"),
                OsStr::new("wav"),
                scratch.path().as_os_str(),
            ],
            self.timeout,
        )
        .await?;

        let data = read_wav(scratch.path())?;
        to_mono_at(data, path, sample_rate)
    }
}
