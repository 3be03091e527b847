use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::Serialize;

use crate::errors::{ProviderError, SpeechError};
use crate::speech::Synthesizer;

/// Voice used when a neural voice name is not understood by the endpoint
pub const DEFAULT_OPENAI_VOICE: &str = "alloy";

const OPENAI_VOICES: &[&str] = &["alloy", "ash", "coral", "echo", "fable", "onyx", "nova", "sage", "shimmer"];

/// Client for an OpenAI-compatible `/audio/speech` endpoint
pub struct OpenAiSpeech {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

/// Speech request body
#[derive(Debug, Serialize)]
pub struct SpeechRequest {
    model: String,
    voice: String,
    input: String,
    response_format: String,
}

impl SpeechRequest {
    pub fn new(model: impl Into<String>, voice: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            voice: voice.into(),
            input: input.into(),
            response_format: "wav".to_string(),
        }
    }
}

impl OpenAiSpeech {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.endpoint.trim_end_matches('/'))
    }

    /// Map catalog voices (`km-KH-PisethNeural`) onto the endpoint's names
    pub fn resolve_voice(voice: &str) -> &'static str {
        OPENAI_VOICES
            .iter()
            .find(|v| v.eq_ignore_ascii_case(voice.trim()))
            .copied()
            .unwrap_or(DEFAULT_OPENAI_VOICE)
    }

    /// Request speech audio bytes
    pub async fn request_audio(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .post(self.speech_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Speech API error ({}): {}", status, message);
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ProviderError::AuthenticationError(message));
            }
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Synthesizer for OpenAiSpeech {
    fn name(&self) -> &str {
        "openai-speech"
    }

    async fn synthesize(&self, text: &str, voice: &str, dest: &Path) -> Result<(), SpeechError> {
        let request = SpeechRequest::new(&self.model, Self::resolve_voice(voice), text);
        let audio = self
            .request_audio(&request)
            .await
            .map_err(|e| SpeechError::synthesis(dest, e.to_string()))?;

        tokio::fs::write(dest, &audio)
            .await
            .map_err(|source| SpeechError::Io {
                path: dest.to_path_buf(),
                source,
            })
    }
}
