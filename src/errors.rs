/*!
 * Error types for the dubwai application.
 *
 * Each pipeline component has its own error enum, defined with the thiserror
 * crate. The controller and the CLI work with `anyhow` and wrap these.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading subtitle files
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A timestamp does not follow the `HH:MM:SS,mmm` grammar
    #[error("Malformed timestamp '{value}': {reason}")]
    MalformedTimestamp {
        /// The offending text
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// A cue block is structurally invalid
    #[error("Malformed subtitle block {block}: {reason}")]
    MalformedSubtitleBlock {
        /// 1-based position of the block in the file
        block: usize,
        /// What is wrong with it
        reason: String,
    },

    /// The subtitle file could not be read
    #[error("Failed to read subtitle file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SubtitleError {
    pub(crate) fn timestamp(value: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn block(block: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSubtitleBlock {
            block,
            reason: reason.into(),
        }
    }
}

/// Errors raised while synthesizing a speech clip
#[derive(Error, Debug)]
pub enum SpeechError {
    /// The speech collaborator failed or produced no usable audio
    #[error("Speech synthesis failed for {dest:?}: {message}")]
    SynthesisFailed {
        /// Destination clip path
        dest: PathBuf,
        /// Collaborator diagnostic
        message: String,
    },

    /// Filesystem error around the clip or its fingerprint
    #[error("Clip file error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpeechError {
    pub fn synthesis(dest: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SynthesisFailed {
            dest: dest.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by external media tools (ffmpeg, ffprobe)
#[derive(Error, Debug)]
pub enum MediaError {
    /// The tool ran and exited with a failure status
    #[error("{program} failed ({status}): {stderr}")]
    ExternalProcessFailed {
        program: String,
        status: String,
        /// Filtered diagnostic output of the process
        stderr: String,
    },

    /// The tool could not be started at all
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool did not finish in time and was killed
    #[error("{program} timed out after {secs} seconds")]
    TimedOut { program: String, secs: u64 },

    /// A file the tool needed is missing
    #[error("Media file not found: {0:?}")]
    MissingInput(PathBuf),
}

/// Errors raised while building or exporting the dubbed timeline
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// A clip could not be decoded
    #[error("Failed to decode clip {path:?}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The timeline could not be written
    #[error("Failed to export timeline to {path:?}: {message}")]
    Export { path: PathBuf, message: String },

    /// An ffmpeg step inside assembly failed
    #[error("Media error during assembly: {0}")]
    Media(#[from] MediaError),
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}
