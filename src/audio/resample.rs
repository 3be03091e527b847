//! Channel mixing and sample-rate conversion.

use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};

const CHUNK_FRAMES: usize = 1024;

/// Mix interleaved audio down to mono by averaging channels
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// The output holds `ceil(len * to_rate / from_rate)` samples with the
/// resampler's delay removed, so the clip keeps its duration.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected = (samples.len() as u128 * to_rate as u128).div_ceil(from_rate as u128) as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_FRAMES,
        2,
        1,
    )
    .context("Failed to create resampler")?;
    let delay = resampler.output_delay();

    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);
    let mut position = 0;

    while position < samples.len() {
        let needed = resampler.input_frames_next();
        let end = (position + needed).min(samples.len());
        let wave = [&samples[position..end]];

        let frames = if wave[0].len() == needed {
            resampler.process(&wave[..], None)
        } else {
            resampler.process_partial(Some(&wave[..]), None)
        }
        .context("Resampling failed")?;

        output.extend_from_slice(&frames[0]);
        position = end;
    }

    // Flush the delay line
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .context("Resampler flush failed")?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    let mut trimmed: Vec<f32> = output.into_iter().skip(delay).collect();
    trimmed.resize(expected, 0.0);
    Ok(trimmed)
}
