use anyhow::{anyhow, Context, Result};
use indicatif::MultiProgress;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::audio::create_decoder;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::media::{Ffmpeg, MediaTools};
use crate::pipeline::{progress_bar, ArtifactPaths, DubbingPipeline, PipelineContext, PipelineReport, PipelineStage};
use crate::providers::{create_synthesizer, create_translator};
use crate::speech::Synthesizer;
use crate::subtitle_processor::extract_language_code;
use crate::translation::{resolve_languages, SubtitleTranslator, Translator};

// @module: Application controller for the dubbing workflow

/// Main application controller: translation, dubbing and folder runs
pub struct Controller {
    // @field: App configuration
    config: Config,
    synthesizer: Arc<dyn Synthesizer>,
    translator: Arc<dyn Translator>,
    media: Arc<dyn MediaTools>,
}

impl Controller {
    // @method: Create a new controller with the configured backends
    pub fn with_config(config: Config) -> Result<Self> {
        let synthesizer = create_synthesizer(&config);
        let translator = create_translator(&config);
        let media: Arc<dyn MediaTools> = Arc::new(Ffmpeg::new(&config.media, config.audio.default_sample_rate));
        Ok(Self::with_backends(config, synthesizer, translator, media))
    }

    /// Create a controller around explicit backends
    pub fn with_backends(
        config: Config,
        synthesizer: Arc<dyn Synthesizer>,
        translator: Arc<dyn Translator>,
        media: Arc<dyn MediaTools>,
    ) -> Self {
        Controller {
            config,
            synthesizer,
            translator,
            media,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dub one video by name
    pub async fn run(&self, video_name: &str, force_overwrite: bool) -> Result<PipelineReport> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(video_name, force_overwrite, &multi_progress).await
    }

    async fn run_with_progress(
        &self,
        video_name: &str,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<PipelineReport> {
        let start_time = Instant::now();

        let ctx = PipelineContext::new(self.config.clone(), video_name)?;
        self.ensure_target_subtitles(&ctx.paths, force_overwrite, multi_progress)
            .await?;

        let decoder = create_decoder(&self.config, ctx.scratch_dir());
        let pipeline = DubbingPipeline::new(
            ctx,
            Arc::clone(&self.synthesizer),
            Arc::clone(&self.media),
            decoder,
        )
        .with_progress(multi_progress.clone());

        let report = pipeline.run(force_overwrite).await?;

        if report.resumed_from == PipelineStage::Done && report.outputs.is_empty() {
            warn!("Skipping {}, dubbed track already exists (use -f to force overwrite)", video_name);
        } else {
            info!(
                "{}: {} generated, {} reused, {} regenerated, {} silent, {} gaps in {}",
                video_name,
                report.generated,
                report.reused,
                report.regenerated,
                report.silent,
                report.gaps.len(),
                Self::format_duration(start_time.elapsed())
            );
        }

        Ok(report)
    }

    /// Translate the source subtitles when the target ones are missing
    async fn ensure_target_subtitles(
        &self,
        paths: &ArtifactPaths,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<()> {
        if paths.target_subtitles.is_file() {
            return Ok(());
        }

        if !paths.source_subtitles.is_file() {
            return Err(anyhow!(
                "No subtitles found for {}: neither {} nor {} exists",
                paths.video_name,
                paths.target_subtitles.display(),
                paths.source_subtitles.display()
            ));
        }

        if !self.config.translation.enabled {
            return Err(anyhow!(
                "{} is missing and translation is disabled",
                paths.target_subtitles.display()
            ));
        }

        self.translate_subtitles(&paths.source_subtitles, &paths.target_subtitles, force_overwrite, multi_progress)
            .await
    }

    /// Translate one subtitle file into another
    pub async fn translate_subtitles(
        &self,
        input: &Path,
        output: &Path,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<()> {
        if output.exists() && !force_overwrite {
            warn!("Skipping translation, {} already exists (use -f to force overwrite)", output.display());
            return Ok(());
        }

        let (source_language, target_language) = resolve_languages(
            input,
            output,
            &self.config.source_language,
            &self.config.target_language,
        );

        let content = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read subtitle file: {}", input.display()))?;
        let total_lines = SubtitleTranslator::count_translatable(&content) as u64;

        info!(
            "🚀 dubwai: {} - {}",
            self.translator.name(),
            self.config.translation.get_model()
        );

        let translation_start_time = Instant::now();
        let progress = progress_bar(multi_progress, total_lines, "lines");
        progress.set_message("Translating");

        let translator = SubtitleTranslator::new(
            Arc::clone(&self.translator),
            self.config.translation.optimal_concurrent_requests(),
        );
        let result = translator
            .translate_file(input, output, &source_language, &target_language, Some(&progress))
            .await;

        match result {
            Ok(()) => {
                progress.finish_and_clear();
                info!(
                    "Translation completed in {}: {}",
                    Self::format_duration(translation_start_time.elapsed()),
                    output.display()
                );
                Ok(())
            }
            Err(e) => {
                progress.abandon();
                Err(e)
            }
        }
    }

    /// Default output for `translate`: the input name with the target language
    pub fn translated_subtitle_path(input: &Path, target_language: &str, output_dir: &Path) -> PathBuf {
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());

        let base = match extract_language_code(&file_name) {
            Some(code) if language_utils::validate_language_code(&code).is_ok() => stem
                .strip_suffix(&code)
                .map(|s| s.trim_end_matches(['_', '.']).to_string())
                .unwrap_or(stem),
            _ => stem,
        };

        output_dir.join(format!("{}_{}.srt", base, target_language))
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Dub every video in the input directory. A failing video is logged
    /// and counted; the others still run.
    pub async fn run_folder(&self, force_overwrite: bool) -> Result<()> {
        let start_time = Instant::now();
        let input_dir = self.config.input_path();

        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let names = FileManager::list_video_names(&input_dir)?;
        if names.is_empty() {
            return Err(anyhow!("No video files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = progress_bar(&multi_progress, names.len() as u64, "videos");
        folder_pb.set_message("Processing videos");

        let mut success_count = 0;
        let mut error_count = 0;
        let mut skip_count = 0;

        for name in &names {
            folder_pb.set_message(format!("Processing: {}", name));

            match self.run_with_progress(name, force_overwrite, &multi_progress).await {
                Ok(report) if report.resumed_from == PipelineStage::Done && report.outputs.is_empty() => {
                    skip_count += 1;
                }
                Ok(_) => success_count += 1,
                Err(e) => {
                    error!("Error processing {}: {:#}", name, e);
                    error_count += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        let summary_message = format!(
            "Folder processing completed: {} processed, {} skipped, {} errors",
            success_count, skip_count, error_count
        );
        info!("{}", summary_message);

        let log_file_path = self.config.output_path().join("dubwai.issues.log");
        let entry = format!(
            "{} ({}) - Duration: {}",
            summary_message,
            input_dir.display(),
            Self::format_duration(start_time.elapsed())
        );
        if let Err(e) = FileManager::append_to_log_file(&log_file_path, &entry) {
            warn!("Failed to write folder log: {:#}", e);
        }

        Ok(())
    }
}
