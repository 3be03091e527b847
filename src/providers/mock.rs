/*!
 * Mock backends for testing.
 *
 * `MockSynthesizer` writes real WAV files so the decoder and assembler can
 * run on its output, and `MockTranslator` tags each line it is given.
 * Both count their calls and can be told to misbehave:
 * - `working()` always succeeds
 * - `failing()` always errors
 * - `intermittent(n)` fails every Nth call
 * - `failing_on(texts)` fails only for the given texts
 */

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::errors::{ProviderError, SpeechError};
use crate::speech::Synthesizer;
use crate::translation::Translator;

/// Amplitude of every sample the mock synthesizer writes
pub const MOCK_TONE_LEVEL: f32 = 0.5;

/// Behavior mode for the mock backends
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with an error
    Failing,
    /// Fails intermittently (every Nth call)
    Intermittent { fail_every: usize },
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
    /// Succeeds without producing output
    Empty,
    /// Fails when the text is one of these
    FailOn(Vec<String>),
}

impl MockBehavior {
    fn should_fail(&self, call: usize, text: &str) -> bool {
        match self {
            MockBehavior::Failing => true,
            MockBehavior::Intermittent { fail_every } => {
                *fail_every > 0 && call % fail_every == fail_every - 1
            }
            MockBehavior::FailOn(texts) => texts.iter().any(|t| t == text),
            _ => false,
        }
    }

    async fn delay(&self) {
        if let MockBehavior::Slow { delay_ms } = self {
            tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
        }
    }
}

/// Synthesizer that writes constant-level mono WAV clips
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    behavior: MockBehavior,
    call_count: Arc<AtomicUsize>,
    sample_rate: u32,
    clip_ms: u64,
}

impl MockSynthesizer {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            sample_rate: 16_000,
            clip_ms: 500,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing_on(texts: &[&str]) -> Self {
        Self::new(MockBehavior::FailOn(texts.iter().map(|t| t.to_string()).collect()))
    }

    /// Length of every clip written
    pub fn with_clip_ms(mut self, clip_ms: u64) -> Self {
        self.clip_ms = clip_ms;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Number of synthesize calls so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn write_tone(&self, dest: &Path) -> Result<(), SpeechError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let to_error = |e: hound::Error| SpeechError::synthesis(dest, e.to_string());

        let mut writer = WavWriter::create(dest, spec).map_err(to_error)?;
        let samples = self.clip_ms * self.sample_rate as u64 / 1000;
        let value = (MOCK_TONE_LEVEL * i16::MAX as f32) as i16;
        for _ in 0..samples {
            writer.write_sample(value).map_err(to_error)?;
        }
        writer.finalize().map_err(to_error)
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, text: &str, _voice: &str, dest: &Path) -> Result<(), SpeechError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.behavior.delay().await;

        if self.behavior.should_fail(call, text) {
            return Err(SpeechError::synthesis(dest, format!("mock failure for '{}'", text)));
        }

        if self.behavior == MockBehavior::Empty {
            return std::fs::write(dest, b"").map_err(|source| SpeechError::Io {
                path: dest.to_path_buf(),
                source,
            });
        }

        self.write_tone(dest)
    }
}

/// Translator that prefixes every line with the target language
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    call_count: Arc<AtomicUsize>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, text: &str, _source_language: &str, target_language: &str) -> Result<String, ProviderError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.behavior.delay().await;

        if self.behavior.should_fail(call, text) {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated server error".to_string(),
            });
        }

        match self.behavior {
            MockBehavior::Empty => Ok(String::new()),
            _ => Ok(format!("[{}] {}", target_language, text)),
        }
    }
}
