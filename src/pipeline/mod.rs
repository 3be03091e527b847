/*!
 * The dubbing pipeline.
 *
 * - `context`: configuration, artifact paths, scratch space and the issue log
 *   of one run
 * - `state`: which stage a run resumes from
 * - `orchestrator`: runs the stages
 */

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub mod context;
pub mod orchestrator;
pub mod state;

pub use context::{ArtifactPaths, LogEntry, PipelineContext};
pub use orchestrator::{ClipGap, DubbingPipeline, PipelineReport};
pub use state::PipelineStage;

/// Add a styled bar counting `unit` to `multi`
pub fn progress_bar(multi: &MultiProgress, len: u64, unit: &str) -> ProgressBar {
    let pb = multi.add(ProgressBar::new(len));
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        ))
        .or_else(|_| {
            ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}")
        })
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("█▓▒░"));
    pb
}
