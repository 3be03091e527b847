/*!
 * End-to-end pipeline runs against mock speech and media backends
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use dubwai::app_config::{Config, FailurePolicy};
use dubwai::audio::decode::WavDecoder;
use dubwai::pipeline::{ArtifactPaths, DubbingPipeline, PipelineContext, PipelineStage};
use dubwai::providers::mock::MockSynthesizer;

use crate::common;
use crate::common::mock_media::MockMedia;

const VIDEO: &str = "movie";
const DURATION: f64 = 5.5;

fn media() -> Arc<MockMedia> {
    Arc::new(MockMedia::new(common::TEST_SAMPLE_RATE, DURATION))
}

fn pipeline(config: &Config, synth: &MockSynthesizer, media: &Arc<MockMedia>) -> Result<DubbingPipeline> {
    let ctx = PipelineContext::new(config.clone(), VIDEO)?;
    Ok(DubbingPipeline::new(
        ctx,
        Arc::new(synth.clone()),
        media.clone(),
        Arc::new(WavDecoder),
    ))
}

fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|s| *s == 0.0)
}

// Index of the sample at `ms` at the test rate
fn at(ms: usize) -> usize {
    ms * common::TEST_SAMPLE_RATE as usize / 1000
}

#[tokio::test]
async fn test_run_withFreshVideo_shouldGenerateAndAssembleTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::setup_video(&config, VIDEO)?;
    let synth = MockSynthesizer::working();
    let media = media();

    let report = pipeline(&config, &synth, &media)?.run(false).await?;

    let paths = ArtifactPaths::resolve(&config, VIDEO);
    assert_eq!(
        report.resumed_from,
        PipelineStage::NeedSpeechGeneration { missing: vec![0, 1, 2, 3] }
    );
    assert_eq!(report.generated, 4);
    assert_eq!(synth.calls(), 4);
    assert_eq!(report.timeline_ms, Some(5_500));
    assert_eq!(report.outputs, vec![paths.dubbed_audio.clone()]);
    assert!(report.is_complete());
    assert_eq!(media.calls(), vec!["probe".to_string()]);

    let (rate, samples) = common::read_wav_samples(&paths.dubbed_audio)?;
    assert_eq!(rate, common::TEST_SAMPLE_RATE);
    assert_eq!(samples.len(), at(5_500));
    assert!(samples[..at(500)].iter().all(|s| *s > 0.4));
    assert!(is_silent(&samples[at(500)..at(1_500)]));
    assert!(samples[at(3_000)..at(3_500)].iter().all(|s| *s > 0.4));
    assert!(is_silent(&samples[at(5_000)..]));

    for ordinal in 0..4 {
        assert!(paths.clip_path(ordinal).is_file());
    }
    assert!(!paths.issues_log.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withAllClipsOnDisk_shouldResumeAtAssembly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::setup_video(&config, VIDEO)?;
    let paths = ArtifactPaths::resolve(&config, VIDEO);
    fs::create_dir_all(&paths.clips_dir)?;
    for ordinal in 0..4 {
        common::write_wav_tone(&paths.clip_path(ordinal), common::TEST_SAMPLE_RATE, 400, 0.25)?;
    }
    let synth = MockSynthesizer::working();

    let report = pipeline(&config, &synth, &media())?.run(false).await?;

    assert_eq!(report.resumed_from, PipelineStage::NeedAssembly);
    assert_eq!(report.reused, 4);
    assert_eq!(synth.calls(), 0);

    let (_, samples) = common::read_wav_samples(&paths.dubbed_audio)?;
    assert!(samples[..at(400)].iter().all(|s| (*s - 0.25).abs() < 0.01));
    Ok(())
}

#[tokio::test]
async fn test_run_withSomeClipsOnDisk_shouldOnlyGenerateMissingOnes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::setup_video(&config, VIDEO)?;
    let paths = ArtifactPaths::resolve(&config, VIDEO);
    fs::create_dir_all(&paths.clips_dir)?;
    common::write_wav_tone(&paths.clip_path(0), common::TEST_SAMPLE_RATE, 400, 0.25)?;
    common::write_wav_tone(&paths.clip_path(2), common::TEST_SAMPLE_RATE, 400, 0.25)?;
    let synth = MockSynthesizer::working();

    let report = pipeline(&config, &synth, &media())?.run(false).await?;

    assert_eq!(
        report.resumed_from,
        PipelineStage::NeedSpeechGeneration { missing: vec![1, 3] }
    );
    assert_eq!(report.reused, 2);
    assert_eq!(report.generated, 2);
    assert_eq!(synth.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_withSkipPolicy_shouldLeaveFailedCueSilent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.speech.on_failure = FailurePolicy::Skip;
    common::setup_video(&config, VIDEO)?;
    let synth = MockSynthesizer::failing_on(&["How are you?"]);

    let report = pipeline(&config, &synth, &media())?.run(false).await?;

    let paths = ArtifactPaths::resolve(&config, VIDEO);
    assert!(!report.is_complete());
    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.gaps[0].ordinal, 1);
    assert_eq!(report.gaps[0].cue_index, 2);
    assert_eq!(report.generated, 3);
    assert!(!paths.clip_path(1).exists());

    let (_, samples) = common::read_wav_samples(&paths.dubbed_audio)?;
    assert!(is_silent(&samples[at(1_500)..at(2_500)]));
    assert!(samples[at(3_000)..at(3_500)].iter().all(|s| *s > 0.4));

    let log = fs::read_to_string(&paths.issues_log)?;
    assert!(log.starts_with("Dubbing Log - "));
    assert!(log.contains("[WARN] Cue 2 left silent"));
    Ok(())
}

#[tokio::test]
async fn test_run_withAbortPolicy_shouldFailWithoutTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::setup_video(&config, VIDEO)?;
    let synth = MockSynthesizer::failing_on(&["Goodbye."]);
    let media = media();

    let result = pipeline(&config, &synth, &media)?.run(false).await;

    let paths = ArtifactPaths::resolve(&config, VIDEO);
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Speech generation failed for cue 6"));
    assert!(!paths.dubbed_audio.exists());
    assert!(!media.calls().contains(&"probe".to_string()));

    let log = fs::read_to_string(&paths.issues_log)?;
    assert!(log.contains("[ERROR]"));
    Ok(())
}

#[tokio::test]
async fn test_run_afterTextChange_shouldRegenerateStaleClipOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::setup_video(&config, VIDEO)?;
    let synth = MockSynthesizer::working();
    pipeline(&config, &synth, &media())?.run(false).await?;

    let paths = ArtifactPaths::resolve(&config, VIDEO);
    let edited = common::SAMPLE_SRT.replace("How are you?", "How have you been?");
    fs::write(&paths.target_subtitles, edited)?;

    let report = pipeline(&config, &synth, &media())?.run(true).await?;

    assert_eq!(report.regenerated, 1);
    assert_eq!(report.reused, 3);
    assert_eq!(synth.calls(), 5);
    assert!(paths.dubbed_audio.is_file());
    Ok(())
}

#[tokio::test]
async fn test_run_withForceOverwrite_shouldReassembleFromExistingClips() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::setup_video(&config, VIDEO)?;
    let synth = MockSynthesizer::working();
    pipeline(&config, &synth, &media())?.run(false).await?;

    let report = pipeline(&config, &synth, &media())?.run(true).await?;

    assert_eq!(report.resumed_from, PipelineStage::NeedAssembly);
    assert_eq!(report.reused, 4);
    assert_eq!(report.generated, 0);
    assert_eq!(report.timeline_ms, Some(5_500));
    assert_eq!(synth.calls(), 4);
    Ok(())
}

#[tokio::test]
async fn test_run_twice_shouldBeDoneOnSecondRun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::setup_video(&config, VIDEO)?;
    let synth = MockSynthesizer::working();
    pipeline(&config, &synth, &media())?.run(false).await?;
    let media = media();

    let report = pipeline(&config, &synth, &media)?.run(false).await?;

    assert_eq!(report.resumed_from, PipelineStage::Done);
    assert!(report.outputs.is_empty());
    assert_eq!(report.timeline_ms, None);
    assert_eq!(synth.calls(), 4);
    assert!(media.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_withExtractionEnabled_shouldExtractFirst() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.media.extract_original_audio = true;
    common::setup_video(&config, VIDEO)?;
    let media = media();

    let report = pipeline(&config, &MockSynthesizer::working(), &media)?
        .run(false)
        .await?;

    let paths = ArtifactPaths::resolve(&config, VIDEO);
    assert_eq!(report.resumed_from, PipelineStage::NeedAudioExtraction);
    assert_eq!(media.calls(), vec!["extract".to_string(), "probe".to_string()]);
    assert!(paths.extracted_audio.is_file());
    assert_eq!(report.outputs[0], paths.extracted_audio);
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingExtraction_shouldStopBeforeSpeech() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.media.extract_original_audio = true;
    common::setup_video(&config, VIDEO)?;
    let synth = MockSynthesizer::working();
    let media = Arc::new(MockMedia::new(common::TEST_SAMPLE_RATE, DURATION).failing_extraction());

    let result = pipeline(&config, &synth, &media)?.run(false).await;

    let paths = ArtifactPaths::resolve(&config, VIDEO);
    assert!(result.is_err());
    assert_eq!(synth.calls(), 0);
    assert!(!paths.extracted_audio.exists());
    assert!(!paths.dubbed_audio.exists());
    assert!(fs::read_to_string(&paths.issues_log)?.contains("Audio extraction failed"));
    Ok(())
}

#[tokio::test]
async fn test_run_withFinishingSteps_shouldCombineAndBurn() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.media.combine_video = true;
    config.media.burn_subtitles = true;
    common::setup_video(&config, VIDEO)?;
    let media = media();

    let report = pipeline(&config, &MockSynthesizer::working(), &media)?
        .run(false)
        .await?;

    let paths = ArtifactPaths::resolve(&config, VIDEO);
    assert_eq!(
        media.calls(),
        vec!["probe".to_string(), "combine".to_string(), "burn".to_string()]
    );
    assert!(paths.dubbed_video.is_file());
    assert!(paths.subtitled_video.is_file());
    assert_eq!(
        report.outputs,
        vec![paths.dubbed_audio.clone(), paths.dubbed_video.clone(), paths.subtitled_video.clone()]
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withoutTargetSubtitles_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    common::create_test_file(&config.input_path(), "movie.mp4", "video")?;

    let result = pipeline(&config, &MockSynthesizer::working(), &media())?
        .run(false)
        .await;

    assert!(format!("{:#}", result.unwrap_err()).contains("Target subtitles not found"));
    Ok(())
}
