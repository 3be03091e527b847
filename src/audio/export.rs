//! Writing the finished timeline to disk.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use log::debug;

use crate::audio::timeline::Timeline;
use crate::errors::AssemblyError;
use crate::file_utils::FileManager;
use crate::media::MediaTools;

fn export_error(path: &Path, message: impl Into<String>) -> AssemblyError {
    AssemblyError::Export {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Write samples as 16-bit PCM mono
pub fn write_wav(samples: &[f32], sample_rate: u32, path: &Path) -> Result<(), AssemblyError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| export_error(path, e.to_string()))?;
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| export_error(path, e.to_string()))?;
    }
    writer.finalize().map_err(|e| export_error(path, e.to_string()))
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("wav"))
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Write the timeline to `dest`.
///
/// `.wav` destinations are written directly; anything else is rendered to a
/// scratch WAV and encoded by the media toolkit. The destination only
/// appears once it is complete.
pub async fn export_timeline(
    timeline: &Timeline,
    dest: &Path,
    media: &dyn MediaTools,
    scratch_dir: &Path,
) -> Result<(), AssemblyError> {
    if let Some(parent) = dest.parent() {
        FileManager::ensure_dir(parent).map_err(|e| export_error(dest, format!("{:#}", e)))?;
    }

    if is_wav(dest) {
        let partial = partial_path(dest);
        write_wav(timeline.samples(), timeline.sample_rate(), &partial)?;
        std::fs::rename(&partial, dest).map_err(|e| export_error(dest, e.to_string()))?;
        return Ok(());
    }

    let scratch_wav = scratch_dir.join("timeline.wav");
    write_wav(timeline.samples(), timeline.sample_rate(), &scratch_wav)?;

    let file_name = dest
        .file_name()
        .ok_or_else(|| export_error(dest, "destination has no file name"))?;
    let scratch_out = scratch_dir.join(file_name);

    debug!("Encoding {} to {}", scratch_wav.display(), scratch_out.display());
    media.encode_audio(&scratch_wav, &scratch_out).await?;

    FileManager::move_file(&scratch_out, dest).map_err(|e| export_error(dest, format!("{:#}", e)))?;
    let _ = std::fs::remove_file(&scratch_wav);

    Ok(())
}
