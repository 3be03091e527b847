use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, warn};
use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::app_config::Config;
use crate::file_utils::{FileManager, VIDEO_EXTENSIONS};

/// One warning or error captured during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        LogEntry {
            level: level.into(),
            message: message.into(),
        }
    }
}

/// Every file the pipeline reads or writes for one video
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub video_name: String,
    /// Source video
    pub video: PathBuf,
    /// Subtitles in the source language
    pub source_subtitles: PathBuf,
    /// Subtitles in the target language; translated here when missing
    pub target_subtitles: PathBuf,
    /// Original audio stream copied out of the video
    pub extracted_audio: PathBuf,
    /// Merged dubbed track
    pub dubbed_audio: PathBuf,
    /// Video with the dubbed track
    pub dubbed_video: PathBuf,
    /// Video with target subtitles burned in
    pub subtitled_video: PathBuf,
    /// Directory of per-cue clips
    pub clips_dir: PathBuf,
    pub issues_log: PathBuf,
}

impl ArtifactPaths {
    pub fn resolve(config: &Config, video_name: &str) -> Self {
        let input = config.input_path();
        let output = config.output_path();

        let video = FileManager::find_with_extensions(&input, video_name, VIDEO_EXTENSIONS)
            .unwrap_or_else(|| input.join(format!("{}.mp4", video_name)));
        let video_ext = video
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());

        let target_name = format!("{}_{}.srt", video_name, config.target_language);
        let target_subtitles = [output.join(&target_name), input.join(&target_name)]
            .into_iter()
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| output.join(&target_name));

        let audio_ext = config.audio.output_extension.trim().trim_start_matches('.');
        let dubbed_audio = output.join(format!("{}.{}", video_name, audio_ext));
        let dubbed_stem = dubbed_audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| video_name.to_string());

        ArtifactPaths {
            video_name: video_name.to_string(),
            source_subtitles: input.join(format!("{}_{}.srt", video_name, config.source_language)),
            target_subtitles,
            extracted_audio: output.join(format!("{}.original.mka", video_name)),
            dubbed_video: output.join(format!("{}.dubbed.{}", video_name, video_ext)),
            subtitled_video: output.join(format!("{}_{}.{}", video_name, config.target_language, video_ext)),
            clips_dir: config.work_path().join(dubbed_stem),
            issues_log: output.join(format!("{}.issues.log", video_name)),
            dubbed_audio,
            video,
        }
    }

    /// Clip for the cue at `ordinal` (0-based file position)
    pub fn clip_path(&self, ordinal: usize) -> PathBuf {
        self.clips_dir.join(format!("{:04}.wav", ordinal))
    }
}

/// State shared by every stage of one pipeline run.
///
/// The scratch directory lives under the work directory and is removed
/// when the context is dropped.
pub struct PipelineContext {
    pub config: Config,
    pub paths: ArtifactPaths,
    scratch: TempDir,
    issues: Mutex<Vec<LogEntry>>,
}

impl PipelineContext {
    pub fn new(config: Config, video_name: &str) -> Result<Self> {
        let paths = ArtifactPaths::resolve(&config, video_name);

        FileManager::ensure_dir(config.output_path())?;
        FileManager::ensure_dir(&paths.clips_dir)?;

        let scratch = tempfile::Builder::new()
            .prefix(".scratch-")
            .tempdir_in(config.work_path())
            .with_context(|| format!("Failed to create scratch directory in {}", config.work_dir))?;

        Ok(PipelineContext {
            config,
            paths,
            scratch,
            issues: Mutex::new(Vec::new()),
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Log a warning and keep it for the issue log
    pub async fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.issues.lock().await.push(LogEntry::new("WARN", message));
    }

    /// Log an error and keep it for the issue log
    pub async fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.issues.lock().await.push(LogEntry::new("ERROR", message));
    }

    pub async fn issues(&self) -> Vec<LogEntry> {
        self.issues.lock().await.clone()
    }

    /// Write captured issues to the issue log; `None` when there were none
    pub async fn flush_issues(&self, run_context: &str) -> Result<Option<PathBuf>> {
        let issues = self.issues.lock().await;
        if issues.is_empty() {
            return Ok(None);
        }

        let mut content = String::new();
        content.push_str(&format!(
            "Dubbing Log - {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        content.push_str(&format!("Context: {}\n\n", run_context));
        for entry in issues.iter() {
            content.push_str(&format!("[{}] {}\n", entry.level, entry.message));
        }

        FileManager::write_to_file(&self.paths.issues_log, &content)?;
        Ok(Some(self.paths.issues_log.clone()))
    }
}
