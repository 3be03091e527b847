/*!
 * Tests for timeline assembly and export
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use dubwai::audio::decode::WavDecoder;
use dubwai::audio::{ClipPlacement, GeneratedClip, TimelineAssembler, export_timeline};
use dubwai::media::SourceTiming;
use dubwai::subtitle_processor::Cue;

use crate::common;
use crate::common::mock_media::MockMedia;

const RATE: u32 = common::TEST_SAMPLE_RATE;

fn placement(dir: &Path, cue: Cue, clip_ms: Option<u64>) -> Result<ClipPlacement> {
    let clip = match clip_ms {
        Some(ms) => {
            let path = dir.join(format!("{:04}.wav", cue.index));
            common::write_wav_tone(&path, RATE, ms, 0.5)?;
            Some(GeneratedClip::for_cue(&cue, path))
        }
        None => None,
    };
    Ok(ClipPlacement::new(cue, clip))
}

fn assembler() -> TimelineAssembler {
    TimelineAssembler::new(Arc::new(WavDecoder))
}

fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|s| *s == 0.0)
}

fn is_tone(samples: &[f32]) -> bool {
    samples.iter().all(|s| *s > 0.4)
}

#[tokio::test]
async fn test_assemble_withGapAndTail_shouldPlaceClipsAtCueStarts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let placements = vec![
        placement(temp_dir.path(), Cue::new(1, 0.0, 1.0, "one"), Some(1000))?,
        placement(temp_dir.path(), Cue::new(2, 2.0, 3.0, "two"), Some(1000))?,
    ];

    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 3.5), None)
        .await?;
    let samples = timeline.samples();

    assert_eq!(samples.len(), 56_000);
    assert_eq!(timeline.len_ms(), 3_500);
    assert!(is_tone(&samples[..16_000]));
    assert!(is_silent(&samples[16_000..32_000]));
    assert!(is_tone(&samples[32_000..48_000]));
    assert!(is_silent(&samples[48_000..]));
    Ok(())
}

#[tokio::test]
async fn test_assemble_withClipLongerThanSlot_shouldTruncateToSlot() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let placements = vec![placement(temp_dir.path(), Cue::new(1, 0.0, 1.0, "long"), Some(1500))?];

    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 0.0), None)
        .await?;

    assert_eq!(timeline.samples().len(), 16_000);
    assert!(is_tone(timeline.samples()));
    Ok(())
}

#[tokio::test]
async fn test_assemble_withClipShorterThanSlot_shouldPadSlot() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let placements = vec![placement(temp_dir.path(), Cue::new(1, 0.5, 1.5, "short"), Some(250))?];

    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 2.0), None)
        .await?;
    let samples = timeline.samples();

    assert_eq!(samples.len(), 32_000);
    assert!(is_silent(&samples[..8_000]));
    assert!(is_tone(&samples[8_000..12_000]));
    assert!(is_silent(&samples[12_000..]));
    Ok(())
}

#[tokio::test]
async fn test_assemble_withOverlappingCues_shouldSerializeThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let placements = vec![
        placement(temp_dir.path(), Cue::new(1, 0.0, 2.0, "first"), Some(2000))?,
        placement(temp_dir.path(), Cue::new(2, 1.0, 2.0, "second"), Some(1000))?,
    ];

    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 0.0), None)
        .await?;

    // second cue starts where the first one ends
    assert_eq!(timeline.len_ms(), 3_000);
    assert_eq!(timeline.samples().len(), 48_000);
    assert!(is_tone(timeline.samples()));
    Ok(())
}

#[tokio::test]
async fn test_assemble_withCuesPastVideoEnd_shouldNotTruncate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let placements = vec![placement(temp_dir.path(), Cue::new(1, 1.0, 3.0, "late"), Some(2000))?];

    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 2.0), None)
        .await?;

    assert_eq!(timeline.len_ms(), 3_000);
    assert_eq!(timeline.samples().len(), 48_000);
    Ok(())
}

#[tokio::test]
async fn test_assemble_withMissingClip_shouldLeaveSlotSilent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let placements = vec![
        placement(temp_dir.path(), Cue::new(1, 0.0, 1.0, "spoken"), Some(1000))?,
        placement(temp_dir.path(), Cue::new(2, 1.0, 2.0, "failed"), None)?,
    ];

    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 2.0), None)
        .await?;

    assert!(is_tone(timeline.slice_ms(0, 1_000)));
    assert!(is_silent(timeline.slice_ms(1_000, 2_000)));
    Ok(())
}

#[tokio::test]
async fn test_assemble_withDifferentClipRate_shouldResampleToSourceRate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cue = Cue::new(1, 0.0, 1.0, "resampled");
    let path = temp_dir.path().join("0001.wav");
    common::write_wav_tone(&path, 8_000, 1000, 0.5)?;
    let placements = vec![ClipPlacement::new(cue.clone(), Some(GeneratedClip::for_cue(&cue, path)))];

    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 1.0), None)
        .await?;

    assert_eq!(timeline.sample_rate(), RATE);
    assert_eq!(timeline.samples().len(), 16_000);
    Ok(())
}

#[tokio::test]
async fn test_assemble_withUnreadableClip_shouldReturnDecodeError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cue = Cue::new(1, 0.0, 1.0, "broken");
    let path = common::create_test_file(temp_dir.path(), "0001.wav", "not a wav")?;
    let placements = vec![ClipPlacement::new(cue.clone(), Some(GeneratedClip::for_cue(&cue, path)))];

    let result = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 1.0), None)
        .await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_export_timeline_withWavDestination_shouldWriteDirectly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let placements = vec![placement(temp_dir.path(), Cue::new(1, 0.0, 0.5, "hi"), Some(500))?];
    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 1.0), None)
        .await?;
    let media = MockMedia::new(RATE, 1.0);
    let dest = temp_dir.path().join("out").join("dubbed.wav");

    export_timeline(&timeline, &dest, &media, temp_dir.path()).await?;

    let (rate, samples) = common::read_wav_samples(&dest)?;
    assert_eq!(rate, RATE);
    assert_eq!(samples.len(), 16_000);
    assert!(media.calls().is_empty());
    assert!(!temp_dir.path().join("out").join("dubbed.wav.part").exists());
    Ok(())
}

#[tokio::test]
async fn test_export_timeline_withOtherExtension_shouldEncodeThroughMediaTools() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let scratch = temp_dir.path().join("scratch");
    std::fs::create_dir_all(&scratch)?;
    let placements = vec![placement(temp_dir.path(), Cue::new(1, 0.0, 0.5, "hi"), Some(500))?];
    let timeline = assembler()
        .assemble(&placements, &SourceTiming::new(RATE, 1.0), None)
        .await?;
    let media = MockMedia::new(RATE, 1.0);
    let dest = temp_dir.path().join("dubbed.mka");

    export_timeline(&timeline, &dest, &media, &scratch).await?;

    assert!(dest.exists());
    assert_eq!(media.calls(), vec!["encode".to_string()]);
    Ok(())
}
