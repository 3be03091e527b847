/*!
 * Tests for subtitle parsing and writing
 */

use anyhow::Result;
use dubwai::errors::SubtitleError;
use dubwai::subtitle_processor::{Cue, SubtitleCollection, extract_language_code, parse_subtitles};

use crate::common;

#[test]
fn test_parse_subtitles_withSample_shouldKeepIndicesAndText() -> Result<()> {
    let cues = parse_subtitles(common::SAMPLE_SRT)?;

    assert_eq!(cues.len(), 4);
    assert_eq!(cues.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2, 5, 6]);
    assert_eq!(cues[2].text, "I am fine, thank you.");
    assert!((cues[1].start - 1.5).abs() < 1e-9);
    assert!((cues[1].duration() - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_parse_subtitles_withUnsortedStarts_shouldPreserveFileOrder() -> Result<()> {
    let content = "1\n00:00:05,000 --> 00:00:06,000\nLater\n\n2\n00:00:01,000 --> 00:00:02,000\nEarlier\n";
    let cues = parse_subtitles(content)?;

    assert_eq!(cues[0].text, "Later");
    assert_eq!(cues[1].text, "Earlier");
    Ok(())
}

#[test]
fn test_parse_subtitles_twice_shouldYieldIdenticalCues() -> Result<()> {
    let content = "3\n00:00:09,000 --> 00:00:10,000\nThird  block\n\n\
                   1\n00:00:01,000 --> 00:00:02,500\nFirst\nline two\n\n\
                   2\n00:00:04,250 --> 00:00:05,000\nSecond\n";

    let first = parse_subtitles(content)?;
    let second = parse_subtitles(content)?;

    assert_eq!(first, second);
    assert_eq!(first.iter().map(|c| c.index).collect::<Vec<_>>(), vec![3, 1, 2]);
    Ok(())
}

#[test]
fn test_extract_language_code_withWordTag_shouldReturnWholeTag() {
    assert_eq!(extract_language_code("video_english.srt").as_deref(), Some("english"));
    assert_eq!(extract_language_code("video_en.srt").as_deref(), Some("en"));
    assert_eq!(extract_language_code("video_e.srt"), None);
}

#[test]
fn test_parse_subtitles_withEndBeforeStart_shouldFail() {
    let content = "1\n00:00:02,000 --> 00:00:01,000\nBackwards\n";
    let err = parse_subtitles(content).unwrap_err();
    assert!(matches!(err, SubtitleError::MalformedSubtitleBlock { block: 1, .. }));
}

#[test]
fn test_parse_subtitles_withZeroLengthCue_shouldFail() {
    let content = "1\n00:00:02,000 --> 00:00:02,000\nInstant\n";
    assert!(parse_subtitles(content).is_err());
}

#[test]
fn test_parse_subtitles_withDuplicateIndex_shouldFail() {
    let content = "1\n00:00:00,000 --> 00:00:01,000\nA\n\n1\n00:00:02,000 --> 00:00:03,000\nB\n";
    let err = parse_subtitles(content).unwrap_err();
    assert!(matches!(err, SubtitleError::MalformedSubtitleBlock { block: 2, .. }));
}

#[test]
fn test_parse_subtitles_withMissingArrow_shouldFail() {
    let content = "1\n00:00:00,000 00:00:01,000\nA\n";
    assert!(matches!(
        parse_subtitles(content),
        Err(SubtitleError::MalformedSubtitleBlock { .. })
    ));
}

#[test]
fn test_parse_subtitles_withBadTimestamp_shouldReportTimestamp() {
    let content = "1\n00:00:00.000 --> 00:00:01,000\nA\n";
    assert!(matches!(
        parse_subtitles(content),
        Err(SubtitleError::MalformedTimestamp { .. })
    ));
}

#[test]
fn test_parse_subtitles_withEmptyContent_shouldReturnNoCues() -> Result<()> {
    assert!(parse_subtitles("")?.is_empty());
    assert!(parse_subtitles("\n\n  \n")?.is_empty());
    Ok(())
}

#[test]
fn test_load_withLanguageSuffix_shouldDetectLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "movie_fr.srt")?;

    let collection = SubtitleCollection::load(&path)?;

    assert_eq!(collection.language.as_deref(), Some("fr"));
    assert_eq!(collection.cues.len(), 4);
    assert!((collection.last_end() - 5.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_load_withMissingFile_shouldReturnIoError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let err = SubtitleCollection::load(temp_dir.path().join("absent.srt")).unwrap_err();
    assert!(matches!(err, SubtitleError::Io { .. }));
    Ok(())
}

#[test]
fn test_write_to_srt_thenLoad_shouldPreserveCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("out_de.srt");

    let mut collection = SubtitleCollection::new(path.clone(), Some("de".to_string()));
    collection.cues.push(Cue::new(3, 0.25, 1.75, "Guten Tag"));
    collection.cues.push(Cue::new(9, 62.5, 64.001, "Auf Wiedersehen"));
    collection.write_to_srt(&path)?;

    let reloaded = SubtitleCollection::load(&path)?;
    assert_eq!(reloaded.cues, collection.cues);
    assert_eq!(reloaded.language.as_deref(), Some("de"));
    Ok(())
}
