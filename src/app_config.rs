use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles loading, validating and saving the dubbing settings.
/// Every field carries a serde default so partial files load cleanly.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), used when the subtitle filename has none
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO), used when the subtitle filename has none
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Directory holding the source video and subtitles
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// Directory receiving the dubbed artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding per-cue speech clips
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional file mirroring every log line
    #[serde(default)]
    pub log_file: Option<String>,

    /// Speech synthesis settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Audio decoding and export settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// ffmpeg/ffprobe settings and finishing steps
    #[serde(default)]
    pub media: MediaConfig,

    /// Subtitle translation settings
    #[serde(default)]
    pub translation: TranslationConfig,
}

/// Speech synthesis backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    // @provider: edge-tts command line tool
    #[default]
    Edge,
    // @provider: OpenAI-compatible /audio/speech endpoint
    OpenAI,
}

impl std::fmt::Display for SpeechProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edge => write!(f, "edge"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for SpeechProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "edge" | "edge-tts" => Ok(Self::Edge),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid speech provider: {}", s)),
        }
    }
}

/// What to do when one cue fails to synthesize
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run before assembly
    #[default]
    Abort,
    /// Record the gap and leave the slot silent
    Skip,
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    // @field: Backend
    #[serde(default)]
    pub provider: SpeechProvider,

    // @field: Explicit voice; empty means pick by target language
    #[serde(default)]
    pub voice: String,

    // @field: Language code -> voice overrides
    #[serde(default)]
    pub voices: HashMap<String, String>,

    // @field: edge-tts executable
    #[serde(default = "default_edge_command")]
    pub edge_command: String,

    // @field: OpenAI-compatible endpoint
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    // @field: API key
    #[serde(default)]
    pub api_key: String,

    // @field: Speech model for the HTTP backend
    #[serde(default = "default_speech_model")]
    pub model: String,

    // @field: Max concurrent synthesis jobs
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds per clip
    #[serde(default = "default_speech_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Regenerate clips whose fingerprint sidecar differs
    #[serde(default = "default_true")]
    pub verify_fingerprints: bool,

    // @field: Failure policy
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            voice: String::new(),
            voices: HashMap::new(),
            edge_command: default_edge_command(),
            endpoint: default_openai_endpoint(),
            api_key: String::new(),
            model: default_speech_model(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_speech_timeout_secs(),
            verify_fingerprints: true,
            on_failure: FailurePolicy::default(),
        }
    }
}

/// How speech clips are decoded before assembly
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    /// Transcode through ffmpeg, accepts any container
    #[default]
    Ffmpeg,
    /// Read PCM WAV in-process
    Native,
}

/// Audio configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default)]
    pub decoder: DecoderKind,

    /// Extension of the dubbed track; `wav` is written directly, others via ffmpeg
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Sample rate used when the video does not report one
    #[serde(default = "default_sample_rate")]
    pub default_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderKind::default(),
            output_extension: default_output_extension(),
            default_sample_rate: default_sample_rate(),
        }
    }
}

/// External media tool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Timeout seconds for one ffmpeg/ffprobe invocation
    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,

    /// Extract the original audio track before dubbing
    #[serde(default = "default_true")]
    pub extract_original_audio: bool,

    /// Mux the dubbed track into a copy of the video
    #[serde(default)]
    pub combine_video: bool,

    /// Burn the target subtitles into a copy of the video
    #[serde(default)]
    pub burn_subtitles: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_media_timeout_secs(),
            extract_original_audio: true,
            combine_video: false,
            burn_subtitles: false,
        }
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: Anthropic
    Anthropic,
}

impl TranslationProvider {
    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_timeout_secs(),
            },
            TranslationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_anthropic_timeout_secs(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translate the source subtitles when the target file is missing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "km".to_string()
}

fn default_input_dir() -> String {
    ".".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_work_dir() -> String {
    "tmp".to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_anthropic_timeout_secs() -> u64 {
    60
}

fn default_speech_timeout_secs() -> u64 {
    120
}

fn default_media_timeout_secs() -> u64 {
    600
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_edge_command() -> String {
    "edge-tts".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_output_extension() -> String {
    "wav".to_string()
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional subtitle translator. Translate the following subtitle line from {source_language} to {target_language}. Reply with the translation only, on a single line, keeping it short enough to be spoken in the same time.".to_string()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)
            .context("Invalid source_language")?;
        crate::language_utils::validate_language_code(&self.target_language)
            .context("Invalid target_language")?;

        if self.speech.concurrent_requests == 0 {
            return Err(anyhow!("speech.concurrent_requests must be greater than 0"));
        }
        if self.speech.provider == SpeechProvider::OpenAI && self.speech.api_key.is_empty() {
            return Err(anyhow!("speech.api_key is required for the OpenAI speech provider"));
        }
        if self.audio.default_sample_rate == 0 {
            return Err(anyhow!("audio.default_sample_rate must be greater than 0"));
        }
        if self.audio.output_extension.trim().trim_start_matches('.').is_empty() {
            return Err(anyhow!("audio.output_extension must not be empty"));
        }
        if self.media.timeout_secs == 0 {
            return Err(anyhow!("media.timeout_secs must be greater than 0"));
        }

        if self.translation.enabled
            && self.translation.provider == TranslationProvider::Anthropic
            && self.translation.get_api_key().is_empty()
        {
            return Err(anyhow!("Translation API key is required for Anthropic provider"));
        }

        Ok(())
    }

    pub fn input_path(&self) -> PathBuf {
        PathBuf::from(&self.input_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn work_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            work_dir: default_work_dir(),
            log_level: LogLevel::default(),
            log_file: None,
            speech: SpeechConfig::default(),
            audio: AudioConfig::default(),
            media: MediaConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

impl TranslationConfig {
    pub fn optimal_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests.max(1))
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::Anthropic),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
