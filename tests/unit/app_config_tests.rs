/*!
 * Tests for configuration loading, saving and validation
 */

use anyhow::Result;

use dubwai::app_config::{Config, DecoderKind, FailurePolicy, SpeechProvider, TranslationProvider};

use crate::common;

#[test]
fn test_default_config_shouldHaveExpectedValues() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "km");
    assert_eq!(config.speech.provider, SpeechProvider::Edge);
    assert_eq!(config.speech.on_failure, FailurePolicy::Abort);
    assert!(config.speech.verify_fingerprints);
    assert_eq!(config.audio.decoder, DecoderKind::Ffmpeg);
    assert_eq!(config.audio.output_extension, "wav");
    assert!(config.media.extract_original_audio);
    assert!(!config.media.combine_video);
    assert!(config.translation.enabled);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
}

#[test]
fn test_save_and_load_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");
    let mut config = common::test_config(temp_dir.path());
    config.speech.on_failure = FailurePolicy::Skip;
    config.speech.voices.insert("fr".to_string(), "fr-FR-HenriNeural".to_string());

    config.save_to_file(&path)?;
    let loaded = Config::from_file(&path)?;

    assert_eq!(loaded.target_language, "fr");
    assert_eq!(loaded.audio.decoder, DecoderKind::Native);
    assert_eq!(loaded.speech.on_failure, FailurePolicy::Skip);
    assert_eq!(loaded.speech.voices.get("fr").map(String::as_str), Some("fr-FR-HenriNeural"));
    assert_eq!(loaded.work_path(), config.work_path());
    Ok(())
}

#[test]
fn test_from_file_withMinimalJson_shouldApplyDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{"target_language": "ja", "media": {"combine_video": true}}"#,
    )?;

    let config = Config::from_file(&path)?;

    assert_eq!(config.target_language, "ja");
    assert!(config.media.combine_video);
    assert_eq!(config.media.ffmpeg_path, "ffmpeg");
    assert_eq!(config.speech.concurrent_requests, 4);
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn test_from_file_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::from_file(&path).is_err());
    assert!(Config::from_file(temp_dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let mut config = Config::default();
    config.target_language = "zz9".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.speech.concurrent_requests = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.audio.output_extension = " . ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withAnthropicWithoutKey_shouldFailOnlyWhenTranslating() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    assert!(config.validate().is_err());

    config.translation.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_translation_config_shouldResolveProviderSettings() {
    let mut config = Config::default();
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");

    config.translation.provider = TranslationProvider::Anthropic;
    assert_eq!(config.translation.get_endpoint(), "https://api.anthropic.com");
    assert!(config.translation.get_timeout_secs() > 0);
    assert!(config.translation.optimal_concurrent_requests() >= 1);

    config.translation.available_providers.clear();
    assert_eq!(config.translation.get_api_key(), "");
    assert!(!config.translation.get_model().is_empty());
}
