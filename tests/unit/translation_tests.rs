/*!
 * Tests for line-for-line subtitle translation
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use dubwai::providers::mock::{MockBehavior, MockTranslator};
use dubwai::subtitle_processor::SubtitleCollection;
use dubwai::translation::{SubtitleTranslator, resolve_languages};

use crate::common;

#[tokio::test]
async fn test_translate_text_shouldKeepStructureVerbatim() -> Result<()> {
    let mock = MockTranslator::working();
    let translator = SubtitleTranslator::new(Arc::new(mock.clone()), 3);

    let translated = translator
        .translate_text(common::SAMPLE_SRT, "en", "fr", None)
        .await?;

    let original: Vec<&str> = common::SAMPLE_SRT.lines().collect();
    let lines: Vec<&str> = translated.lines().collect();
    assert_eq!(lines.len(), original.len());
    assert_eq!(lines[0], "1");
    assert_eq!(lines[1], "00:00:00,000 --> 00:00:01,000");
    assert_eq!(lines[2], "[fr] Hello there.");
    assert_eq!(lines[10], "[fr] I am fine,");
    assert_eq!(lines[11], "[fr] thank you.");
    assert_eq!(mock.calls(), SubtitleTranslator::count_translatable(common::SAMPLE_SRT));
    Ok(())
}

#[tokio::test]
async fn test_translate_text_withEmptyResponses_shouldKeepOriginalLines() -> Result<()> {
    let translator = SubtitleTranslator::new(Arc::new(MockTranslator::new(MockBehavior::Empty)), 2);

    let translated = translator
        .translate_text(common::SAMPLE_SRT, "en", "fr", None)
        .await?;

    assert_eq!(translated, common::SAMPLE_SRT);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_shouldWriteSameNumberOfCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie_en.srt")?;
    let output = temp_dir.path().join("out").join("movie_fr.srt");
    let translator = SubtitleTranslator::new(Arc::new(MockTranslator::working()), 2);

    translator.translate_file(&input, &output, "en", "fr", None).await?;

    let source = SubtitleCollection::load(&input)?;
    let target = SubtitleCollection::load(&output)?;
    assert_eq!(target.cues.len(), source.cues.len());
    for (src, tgt) in source.cues.iter().zip(&target.cues) {
        assert_eq!(src.index, tgt.index);
        assert_eq!(src.start, tgt.start);
        assert_eq!(src.end, tgt.end);
        assert!(tgt.text.starts_with("[fr] "));
    }
    assert!(!temp_dir.path().join("out").join("movie_fr.srt.part").exists());
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withFailingBackend_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie_en.srt")?;
    let output = temp_dir.path().join("movie_fr.srt");
    let translator = SubtitleTranslator::new(Arc::new(MockTranslator::failing()), 2);

    let result = translator.translate_file(&input, &output, "en", "fr", None).await;

    assert!(result.is_err());
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMalformedSource_shouldFailBeforeTranslating() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "bad_en.srt", "1\nnot a timing line\nHi\n")?;
    let mock = MockTranslator::working();
    let translator = SubtitleTranslator::new(Arc::new(mock.clone()), 2);

    let result = translator
        .translate_file(&input, &temp_dir.path().join("bad_fr.srt"), "en", "fr", None)
        .await;

    assert!(result.is_err());
    assert_eq!(mock.calls(), 0);
    Ok(())
}

#[test]
fn test_resolve_languages_withoutCodes_shouldUseDefaults() {
    let (src, tgt) = resolve_languages(Path::new("movie.srt"), Path::new("movie_final.srt"), "en", "km");
    assert_eq!(src, "en");
    assert_eq!(tgt, "km");
}

#[test]
fn test_resolve_languages_withCodes_shouldUseFilenames() {
    let (src, tgt) = resolve_languages(Path::new("movie_ja.srt"), Path::new("movie.pt-BR.srt"), "en", "km");
    assert_eq!(src, "ja");
    assert_eq!(tgt, "pt-BR");
}
