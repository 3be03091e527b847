/*!
 * Adapters for the external media tools.
 *
 * Every collaborator is a single `ffmpeg` or `ffprobe` invocation, awaited
 * with a timeout and killed when the future is dropped. The pipeline only
 * sees the [`MediaTools`] trait, so tests can run without ffmpeg installed.
 */

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tokio::process::Command;

use crate::app_config::MediaConfig;
use crate::errors::MediaError;
use crate::timestamp::seconds_to_ms;

/// Sample rates accepted when a container only reports a bitrate
const PLAUSIBLE_SAMPLE_RATES: &[u32] = &[
    8_000, 11_025, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000, 88_200, 96_000, 176_400,
    192_000,
];

// Library version rows of the banner, e.g. `libavcodec     60. 31.102 / 60. 31.102`
static LIBRARY_VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^lib[a-z0-9_]+\s+\d+\.\s*\d+\.\s*\d+").expect("valid library version regex")
});

// Padded metadata rows under `Metadata:`, e.g. `title           : Movie`
static METADATA_ROW_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(title|encoder|handler_name|major_brand|minor_version|compatible_brands|creation_time|language|vendor_id)\s*: ")
        .expect("valid metadata row regex")
});

/// Timing facts read from the source video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceTiming {
    /// Rate every clip is resampled to
    pub sample_rate: u32,
    /// Container duration in seconds
    pub total_duration: f64,
}

impl SourceTiming {
    pub fn new(sample_rate: u32, total_duration: f64) -> Self {
        SourceTiming {
            sample_rate,
            total_duration,
        }
    }

    pub fn total_ms(&self) -> u64 {
        seconds_to_ms(self.total_duration)
    }
}

/// Media operations the pipeline needs
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Read sample rate and duration; missing values degrade to defaults
    async fn probe_source_timing(&self, video: &Path) -> Result<SourceTiming, MediaError>;

    /// Copy the original audio stream out of the video
    async fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), MediaError>;

    /// Transcode an audio file, format chosen by the destination extension
    async fn encode_audio(&self, input: &Path, dest: &Path) -> Result<(), MediaError>;

    /// Replace the video's audio with the dubbed track
    async fn combine_video_audio(&self, video: &Path, audio: &Path, dest: &Path) -> Result<(), MediaError>;

    /// Render subtitles onto the video frames
    async fn burn_subtitles(&self, video: &Path, subtitles: &Path, dest: &Path) -> Result<(), MediaError>;
}

/// `ffmpeg`/`ffprobe` backed implementation
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
    default_sample_rate: u32,
}

impl Ffmpeg {
    pub fn new(config: &MediaConfig, default_sample_rate: u32) -> Self {
        Ffmpeg {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            default_sample_rate,
        }
    }

    async fn ffmpeg<I, S>(&self, args: I) -> Result<Output, MediaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run_tool(&self.ffmpeg_path, args, self.timeout).await
    }
}

fn require(path: &Path) -> Result<(), MediaError> {
    if path.exists() {
        Ok(())
    } else {
        Err(MediaError::MissingInput(path.to_path_buf()))
    }
}

#[async_trait]
impl MediaTools for Ffmpeg {
    async fn probe_source_timing(&self, video: &Path) -> Result<SourceTiming, MediaError> {
        if !video.exists() {
            warn!(
                "Video {} not found, using {} Hz and no minimum duration",
                video.display(),
                self.default_sample_rate
            );
            return Ok(SourceTiming::new(self.default_sample_rate, 0.0));
        }

        let args: Vec<OsString> = vec![
            "-v".into(),
            "quiet".into(),
            "-print_format".into(),
            "json".into(),
            "-show_format".into(),
            "-show_streams".into(),
            video.as_os_str().to_owned(),
        ];
        let output = run_tool(&self.ffprobe_path, &args, self.timeout).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        Ok(parse_probe_output(&stdout, self.default_sample_rate))
    }

    async fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), MediaError> {
        require(video)?;
        debug!("Extracting audio from {} to {}", video.display(), dest.display());
        self.ffmpeg([
            OsStr::new("-y"),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-vn"),
            OsStr::new("-acodec"),
            OsStr::new("copy"),
            dest.as_os_str(),
        ])
        .await?;
        Ok(())
    }

    async fn encode_audio(&self, input: &Path, dest: &Path) -> Result<(), MediaError> {
        require(input)?;
        self.ffmpeg([
            OsStr::new("-y"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-vn"),
            dest.as_os_str(),
        ])
        .await?;
        Ok(())
    }

    async fn combine_video_audio(&self, video: &Path, audio: &Path, dest: &Path) -> Result<(), MediaError> {
        require(video)?;
        require(audio)?;
        self.ffmpeg([
            OsStr::new("-y"),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-i"),
            audio.as_os_str(),
            OsStr::new("-c:v"),
            OsStr::new("copy"),
            OsStr::new("-c:a"),
            OsStr::new("aac"),
            OsStr::new("-map"),
            OsStr::new("0:v:0"),
            OsStr::new("-map"),
            OsStr::new("1:a:0"),
            OsStr::new("-shortest"),
            dest.as_os_str(),
        ])
        .await?;
        Ok(())
    }

    async fn burn_subtitles(&self, video: &Path, subtitles: &Path, dest: &Path) -> Result<(), MediaError> {
        require(video)?;
        require(subtitles)?;
        let filter = subtitles_filter(subtitles);
        self.ffmpeg([
            OsStr::new("-y"),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-vf"),
            OsStr::new(&filter),
            OsStr::new("-c:a"),
            OsStr::new("copy"),
            dest.as_os_str(),
        ])
        .await?;
        Ok(())
    }
}

/// Run an external tool with a timeout. Non-zero exit becomes
/// `ExternalProcessFailed` carrying the filtered stderr.
pub async fn run_tool<I, S>(program: &str, args: I, timeout: Duration) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = tokio::select! {
        result = child => {
            result.map_err(|source| MediaError::Spawn { program: program.to_string(), source })?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(MediaError::TimedOut { program: program.to_string(), secs: timeout.as_secs() });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::ExternalProcessFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: filter_ffmpeg_stderr(&stderr),
        });
    }

    Ok(output)
}

/// Read sample rate and duration from `ffprobe -print_format json` output.
///
/// Missing or unparsable values fall back to `default_sample_rate` and a
/// zero duration with a warning.
pub fn parse_probe_output(json: &str, default_sample_rate: u32) -> SourceTiming {
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            warn!("Unreadable ffprobe output ({}), using defaults", e);
            return SourceTiming::new(default_sample_rate, 0.0);
        }
    };

    let streams = value
        .get("streams")
        .and_then(|s| s.as_array())
        .cloned()
        .unwrap_or_default();

    let stream_rate = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"))
        .and_then(|s| s.get("sample_rate"))
        .and_then(number_field)
        .map(|rate| rate as u32)
        .filter(|rate| *rate > 0);

    let format = value.get("format");
    let bitrate_rate = format
        .and_then(|f| f.get("bit_rate"))
        .and_then(number_field)
        .map(|rate| rate as u32)
        .filter(|rate| PLAUSIBLE_SAMPLE_RATES.contains(rate));

    let sample_rate = match stream_rate.or(bitrate_rate) {
        Some(rate) => rate,
        None => {
            warn!("No sample rate in media metadata, using {} Hz", default_sample_rate);
            default_sample_rate
        }
    };

    let total_duration = match format
        .and_then(|f| f.get("duration"))
        .and_then(number_field)
        .filter(|d| d.is_finite() && *d >= 0.0)
    {
        Some(duration) => duration,
        None => {
            warn!("No duration in media metadata, the dubbed track ends with the last cue");
            0.0
        }
    };

    SourceTiming::new(sample_rate, total_duration)
}

// ffprobe reports numbers as strings
fn number_field(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn subtitles_filter(path: &Path) -> String {
    let escaped = path
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'");
    format!("subtitles={}", escaped)
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .filter(|line| !LIBRARY_VERSION_REGEX.is_match(line) && !METADATA_ROW_REGEX.is_match(line))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
