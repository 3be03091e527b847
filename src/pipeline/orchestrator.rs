/*!
 * Runs the dubbing stages for one video.
 *
 * The stage to resume from is derived from the artifacts on disk. Speech
 * clips are generated concurrently, then laid out on the timeline in source
 * order and exported. Optional finishing steps mux the track into the
 * video and burn the subtitles in.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar};
use log::{debug, info, warn};

use crate::app_config::FailurePolicy;
use crate::audio::{export_timeline, AudioDecoder, ClipPlacement, GeneratedClip, Timeline, TimelineAssembler};
use crate::errors::MediaError;
use crate::file_utils::FileManager;
use crate::media::{MediaTools, SourceTiming};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::progress_bar;
use crate::pipeline::state::PipelineStage;
use crate::speech::{ClipOutcome, SpeechGenerator, Synthesizer, VoiceCatalog};
use crate::subtitle_processor::{Cue, SubtitleCollection};

/// A cue left silent because its clip could not be generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipGap {
    /// 0-based position in the subtitle file
    pub ordinal: usize,
    /// Subtitle index of the cue
    pub cue_index: usize,
    pub message: String,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Stage detected when the run started
    pub resumed_from: PipelineStage,
    pub generated: usize,
    pub reused: usize,
    pub regenerated: usize,
    pub silent: usize,
    pub gaps: Vec<ClipGap>,
    /// Length of the assembled track, when assembly ran
    pub timeline_ms: Option<u64>,
    /// Files written by this run
    pub outputs: Vec<PathBuf>,
}

impl PipelineReport {
    fn new(resumed_from: PipelineStage) -> Self {
        PipelineReport {
            resumed_from,
            generated: 0,
            reused: 0,
            regenerated: 0,
            silent: 0,
            gaps: Vec::new(),
            timeline_ms: None,
            outputs: Vec::new(),
        }
    }

    fn record(&mut self, outcome: ClipOutcome) {
        match outcome {
            ClipOutcome::Generated => self.generated += 1,
            ClipOutcome::Reused => self.reused += 1,
            ClipOutcome::Regenerated => self.regenerated += 1,
            ClipOutcome::Silent => self.silent += 1,
        }
    }

    /// Whether every spoken cue got its clip
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

pub struct DubbingPipeline {
    ctx: PipelineContext,
    synthesizer: Arc<dyn Synthesizer>,
    media: Arc<dyn MediaTools>,
    decoder: Arc<dyn AudioDecoder>,
    multi_progress: Option<MultiProgress>,
}

impl DubbingPipeline {
    pub fn new(
        ctx: PipelineContext,
        synthesizer: Arc<dyn Synthesizer>,
        media: Arc<dyn MediaTools>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Self {
        DubbingPipeline {
            ctx,
            synthesizer,
            media,
            decoder,
            multi_progress: None,
        }
    }

    /// Report speech and assembly progress as bars on `multi_progress`
    pub fn with_progress(mut self, multi_progress: MultiProgress) -> Self {
        self.multi_progress = Some(multi_progress);
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run every stage that is not done yet. The issue log is written
    /// whether or not the run succeeds.
    pub async fn run(&self, force_overwrite: bool) -> Result<PipelineReport> {
        let result = self.execute(force_overwrite).await;

        if let Err(e) = &result {
            self.ctx.error(format!("{:#}", e)).await;
        }

        let run_context = format!(
            "{} - {} ({})",
            self.ctx.paths.video_name,
            self.synthesizer.name(),
            self.ctx.config.target_language
        );
        match self.ctx.flush_issues(&run_context).await {
            Ok(Some(path)) => info!("Issues written to {}", path.display()),
            Ok(None) => {}
            Err(e) => warn!("Failed to write issue log: {:#}", e),
        }

        result
    }

    async fn execute(&self, force_overwrite: bool) -> Result<PipelineReport> {
        let paths = &self.ctx.paths;
        let config = &self.ctx.config;

        if force_overwrite {
            for derived in [&paths.dubbed_audio, &paths.dubbed_video, &paths.subtitled_video] {
                if FileManager::remove_if_exists(derived)? {
                    info!("Removed {}", derived.display());
                }
            }
        }

        if !paths.target_subtitles.is_file() {
            return Err(anyhow!(
                "Target subtitles not found: {}",
                paths.target_subtitles.display()
            ));
        }
        let subtitles = SubtitleCollection::load(&paths.target_subtitles)?;
        if subtitles.cues.is_empty() {
            self.ctx
                .warn(format!("{} has no cues", paths.target_subtitles.display()))
                .await;
        }

        let stage = PipelineStage::detect(paths, &subtitles.cues, config.media.extract_original_audio);
        info!("{}: starting at {}", paths.video_name, stage);
        let mut report = PipelineReport::new(stage.clone());

        if stage == PipelineStage::NeedAudioExtraction {
            info!("Extracting original audio to {}", paths.extracted_audio.display());
            let extracted = self.media.extract_audio(&paths.video, &paths.extracted_audio).await;
            guard_output(extracted, &paths.extracted_audio).context("Audio extraction failed")?;
            report.outputs.push(paths.extracted_audio.clone());
        }

        if !paths.dubbed_audio.is_file() {
            let language = subtitles
                .language
                .clone()
                .unwrap_or_else(|| config.target_language.clone());
            let placements = self.generate_clips(&subtitles.cues, &language, &mut report).await?;

            let timing = self.media.probe_source_timing(&paths.video).await?;
            debug!("Source timing: {} Hz, {:.3} s", timing.sample_rate, timing.total_duration);

            let started = Instant::now();
            let timeline = self.assemble(&placements, &timing).await?;
            report.timeline_ms = Some(timeline.len_ms());

            export_timeline(&timeline, &paths.dubbed_audio, self.media.as_ref(), self.ctx.scratch_dir()).await?;
            info!(
                "Dubbed track {} ({} ms) assembled in {} ms",
                paths.dubbed_audio.display(),
                timeline.len_ms(),
                started.elapsed().as_millis()
            );
            report.outputs.push(paths.dubbed_audio.clone());
        }

        self.finish(&mut report).await?;

        if !report.is_complete() {
            self.ctx
                .warn(format!("{} cues were left silent", report.gaps.len()))
                .await;
        }

        Ok(report)
    }

    fn bar(&self, len: usize, message: &'static str) -> Option<ProgressBar> {
        self.multi_progress.as_ref().map(|multi| {
            let pb = progress_bar(multi, len as u64, "cues");
            pb.set_message(message);
            pb
        })
    }

    /// Speech pass: one clip per spoken cue, in parallel, returned in source order
    async fn generate_clips(
        &self,
        cues: &[Cue],
        language: &str,
        report: &mut PipelineReport,
    ) -> Result<Vec<ClipPlacement>> {
        let speech = &self.ctx.config.speech;
        let generator = SpeechGenerator::new(Arc::clone(&self.synthesizer), speech.verify_fingerprints);
        let voice = VoiceCatalog::new(&speech.voice, &speech.voices).voice_for(language);

        info!(
            "🔊 {} - {} for {} cues",
            generator.synthesizer_name(),
            voice,
            cues.len()
        );

        let pb = self.bar(cues.len(), "Generating speech");
        let generator = &generator;
        let voice = voice.as_str();
        let paths = &self.ctx.paths;

        let mut pending = stream::iter(cues.iter().enumerate())
            .map(|(ordinal, cue)| async move {
                let dest = paths.clip_path(ordinal);
                let outcome = generator.generate(&cue.text, voice, &dest).await;
                (ordinal, dest, outcome)
            })
            .buffer_unordered(speech.concurrent_requests.max(1));

        let mut clips: Vec<(usize, Option<PathBuf>)> = Vec::with_capacity(cues.len());
        while let Some((ordinal, dest, outcome)) = pending.next().await {
            if let Some(pb) = &pb {
                pb.inc(1);
            }

            match outcome {
                Ok(outcome) => {
                    report.record(outcome);
                    clips.push((ordinal, outcome.has_clip().then_some(dest)));
                }
                Err(e) => match speech.on_failure {
                    FailurePolicy::Abort => {
                        if let Some(pb) = &pb {
                            pb.abandon();
                        }
                        return Err(anyhow::Error::new(e)
                            .context(format!("Speech generation failed for cue {}", cues[ordinal].index)));
                    }
                    FailurePolicy::Skip => {
                        self.ctx
                            .warn(format!("Cue {} left silent: {}", cues[ordinal].index, e))
                            .await;
                        report.gaps.push(ClipGap {
                            ordinal,
                            cue_index: cues[ordinal].index,
                            message: e.to_string(),
                        });
                        clips.push((ordinal, None));
                    }
                },
            }
        }

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        clips.sort_by_key(|(ordinal, _)| *ordinal);
        report.gaps.sort_by_key(|gap| gap.ordinal);

        Ok(clips
            .into_iter()
            .map(|(ordinal, path)| {
                let cue = &cues[ordinal];
                ClipPlacement::new(cue.clone(), path.map(|p| GeneratedClip::for_cue(cue, p)))
            })
            .collect())
    }

    async fn assemble(
        &self,
        placements: &[ClipPlacement],
        timing: &SourceTiming,
    ) -> Result<Timeline> {
        let assembler = TimelineAssembler::new(Arc::clone(&self.decoder));
        let pb = self.bar(placements.len(), "Assembling");
        let timeline = assembler.assemble(placements, timing, pb.as_ref()).await;
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        Ok(timeline?)
    }

    /// Mux and burn-in, each skipped when its output already exists
    async fn finish(&self, report: &mut PipelineReport) -> Result<()> {
        let paths = &self.ctx.paths;
        let media = &self.ctx.config.media;

        if media.combine_video && !paths.dubbed_video.is_file() {
            info!("Combining {} into {}", paths.dubbed_audio.display(), paths.dubbed_video.display());
            let combined = self
                .media
                .combine_video_audio(&paths.video, &paths.dubbed_audio, &paths.dubbed_video)
                .await;
            guard_output(combined, &paths.dubbed_video).context("Combining video and audio failed")?;
            report.outputs.push(paths.dubbed_video.clone());
        }

        if media.burn_subtitles && !paths.subtitled_video.is_file() {
            let base = if paths.dubbed_video.is_file() {
                &paths.dubbed_video
            } else {
                &paths.video
            };
            info!("Burning subtitles into {}", paths.subtitled_video.display());
            let burned = self
                .media
                .burn_subtitles(base, &paths.target_subtitles, &paths.subtitled_video)
                .await;
            guard_output(burned, &paths.subtitled_video).context("Burning subtitles failed")?;
            report.outputs.push(paths.subtitled_video.clone());
        }

        Ok(())
    }
}

/// Drop whatever a failed tool left at `dest` so it is not taken as done
fn guard_output(result: Result<(), MediaError>, dest: &Path) -> Result<(), MediaError> {
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(dest) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove partial output {}: {}", dest.display(), e);
            }
        }
    }
    result
}
