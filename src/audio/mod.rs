/*!
 * Audio handling for the dubbed track.
 *
 * - `decode`: clip decoders (ffmpeg or in-process WAV)
 * - `resample`: downmixing and sample-rate conversion
 * - `timeline`: the millisecond-accurate sample buffer
 * - `assembler`: places clips on the timeline
 * - `export`: writes the finished track
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, DecoderKind};

pub mod assembler;
pub mod decode;
pub mod export;
pub mod resample;
pub mod timeline;

pub use assembler::{ClipPlacement, GeneratedClip, TimelineAssembler};
pub use decode::{AudioDecoder, FfmpegDecoder, WavDecoder};
pub use export::export_timeline;
pub use timeline::Timeline;

/// Build the configured clip decoder; ffmpeg works inside `scratch_dir`
pub fn create_decoder(config: &Config, scratch_dir: &Path) -> Arc<dyn AudioDecoder> {
    match config.audio.decoder {
        DecoderKind::Ffmpeg => Arc::new(FfmpegDecoder::new(
            &config.media.ffmpeg_path,
            Duration::from_secs(config.media.timeout_secs),
            scratch_dir,
        )),
        DecoderKind::Native => Arc::new(WavDecoder),
    }
}
