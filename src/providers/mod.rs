/*!
 * Backends for the external speech and translation services.
 *
 * Speech synthesis:
 * - `edge_tts`: the `edge-tts` command line tool
 * - `openai_speech`: an OpenAI-compatible `/audio/speech` endpoint
 *
 * Translation:
 * - `ollama`: local LLM server
 * - `anthropic`: Anthropic messages API
 *
 * `mock` holds deterministic stand-ins for both used by the tests.
 */

use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, SpeechProvider, TranslationProvider};
use crate::speech::Synthesizer;
use crate::translation::Translator;

pub mod anthropic;
pub mod edge_tts;
pub mod mock;
pub mod ollama;
pub mod openai_speech;

/// Build the configured speech backend
pub fn create_synthesizer(config: &Config) -> Arc<dyn Synthesizer> {
    let speech = &config.speech;
    let timeout = Duration::from_secs(speech.timeout_secs);

    match speech.provider {
        SpeechProvider::Edge => Arc::new(edge_tts::EdgeTts::new(&speech.edge_command, timeout)),
        SpeechProvider::OpenAI => Arc::new(openai_speech::OpenAiSpeech::new(
            &speech.api_key,
            &speech.endpoint,
            &speech.model,
            timeout,
        )),
    }
}

/// Build the configured translation backend
pub fn create_translator(config: &Config) -> Arc<dyn Translator> {
    let translation = &config.translation;
    let common = &translation.common;
    let timeout = Duration::from_secs(translation.get_timeout_secs());

    match translation.provider {
        TranslationProvider::Ollama => Arc::new(
            ollama::Ollama::new(
                translation.get_endpoint(),
                translation.get_model(),
                &common.system_prompt,
                common.temperature,
                timeout,
            )
            .with_retries(common.retry_count, common.retry_backoff_ms),
        ),
        TranslationProvider::Anthropic => Arc::new(anthropic::Anthropic::new(
            translation.get_api_key(),
            translation.get_endpoint(),
            translation.get_model(),
            &common.system_prompt,
            common.temperature,
            timeout,
        )),
    }
}
