/*!
 * # dubwai - subtitle-synchronized dubbing
 *
 * Turns a video's subtitle track into a dubbed audio track: one synthesized
 * speech clip per cue, laid out on a timeline that matches the video.
 *
 * ## Features
 *
 * - Strict SRT parsing with block-level error reporting
 * - Optional line-for-line subtitle translation (Ollama, Anthropic)
 * - Speech synthesis through `edge-tts` or an OpenAI-compatible endpoint
 * - Resumable runs: every artifact on disk is reused, stale clips are
 *   detected through fingerprints
 * - Millisecond-exact timeline assembly, padded to the video's duration
 * - Optional muxing into the video and subtitle burn-in via ffmpeg
 *
 * ## Architecture
 *
 * - `timestamp`: `HH:MM:SS,mmm` parsing and formatting
 * - `subtitle_processor`: subtitle files and cues
 * - `speech`: clip generation and voice selection
 * - `audio`: decoding, resampling, the timeline and its assembly
 * - `media`: ffmpeg and ffprobe adapters
 * - `translation`: subtitle translation
 * - `pipeline`: the resumable per-video workflow
 * - `providers`: speech and translation backends
 * - `app_config`, `app_controller`, `file_utils`, `language_utils`, `errors`
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod pipeline;
pub mod providers;
pub mod speech;
pub mod subtitle_processor;
pub mod timestamp;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AssemblyError, MediaError, ProviderError, SpeechError, SubtitleError};
pub use language_utils::{get_language_name, language_codes_match, normalize_code};
pub use pipeline::{DubbingPipeline, PipelineReport, PipelineStage};
pub use subtitle_processor::{Cue, SubtitleCollection};
pub use timestamp::{format_timestamp, parse_timestamp};
