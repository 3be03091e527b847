/*!
 * Timeline assembly: places each cue's clip at its start time.
 *
 * Placements are consumed in source order. Every cue occupies exactly its
 * declared slot (clips are truncated or padded to fit), gaps before a cue
 * are silence, and the finished timeline is padded up to the video's
 * duration. The cursor never rewinds, so overlapping cues are laid out one
 * after the other instead of mixed.
 */

use std::path::PathBuf;
use std::sync::Arc;

use indicatif::ProgressBar;
use log::{debug, warn};

use crate::audio::decode::AudioDecoder;
use crate::audio::timeline::Timeline;
use crate::errors::AssemblyError;
use crate::media::SourceTiming;
use crate::subtitle_processor::Cue;
use crate::timestamp::seconds_to_ms;

/// A synthesized clip and the slot it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedClip {
    pub cue_path: PathBuf,
    pub start: f64,
    pub duration_slot: f64,
}

impl GeneratedClip {
    pub fn for_cue(cue: &Cue, cue_path: PathBuf) -> Self {
        GeneratedClip {
            cue_path,
            start: cue.start,
            duration_slot: cue.duration(),
        }
    }
}

/// A cue together with its clip; `None` leaves the slot silent
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlacement {
    pub cue: Cue,
    pub clip: Option<GeneratedClip>,
}

impl ClipPlacement {
    pub fn new(cue: Cue, clip: Option<GeneratedClip>) -> Self {
        ClipPlacement { cue, clip }
    }
}

pub struct TimelineAssembler {
    decoder: Arc<dyn AudioDecoder>,
}

impl TimelineAssembler {
    pub fn new(decoder: Arc<dyn AudioDecoder>) -> Self {
        TimelineAssembler { decoder }
    }

    /// Build the dubbed timeline at `timing.sample_rate`
    pub async fn assemble(
        &self,
        placements: &[ClipPlacement],
        timing: &SourceTiming,
        progress: Option<&ProgressBar>,
    ) -> Result<Timeline, AssemblyError> {
        let total_ms = timing.total_ms();
        let mut timeline = Timeline::with_capacity_ms(timing.sample_rate, total_ms);
        let mut overlaps = 0;

        for placement in placements {
            let cue = &placement.cue;
            let start_ms = seconds_to_ms(cue.start);
            let slot_ms = seconds_to_ms(cue.duration());

            if start_ms > timeline.len_ms() {
                timeline.pad_to(start_ms);
            } else if start_ms < timeline.len_ms() {
                overlaps += 1;
                debug!(
                    "Cue {} starts at {} ms but the timeline is already at {} ms",
                    cue.index,
                    start_ms,
                    timeline.len_ms()
                );
            }

            match &placement.clip {
                Some(clip) => {
                    let samples = self.decoder.decode(&clip.cue_path, timing.sample_rate).await?;
                    timeline.append_clip(&samples, slot_ms);
                }
                None => timeline.append_silence(slot_ms),
            }

            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        if overlaps > 0 {
            warn!("{} overlapping cues were shifted later to keep the timeline sequential", overlaps);
        }

        timeline.pad_to(total_ms);
        if timeline.len_ms() > total_ms && total_ms > 0 {
            warn!(
                "Dubbed track runs {} ms past the end of the video",
                timeline.len_ms() - total_ms
            );
        }

        Ok(timeline)
    }
}
