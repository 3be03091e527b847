use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::timestamp::{format_timestamp, parse_timestamp};

// @module: Subtitle parsing and writing

// @const: Language tag right before the .srt extension
static LANGUAGE_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[_.]([A-Za-z]{2,}(?:-[A-Za-z]{2})?)\.srt$").expect("valid language code regex")
});

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    // @field: Index as written in the file
    pub index: usize,

    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Normalized single-line text
    pub text: String,
}

impl Cue {
    pub fn new(index: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Cue {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Length of the cue's slot in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(
            f,
            "{} --> {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Cues of one subtitle file, in file order
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Parsed cues
    pub cues: Vec<Cue>,

    /// Language tag taken from the filename, if any
    pub language: Option<String>,
}

impl SubtitleCollection {
    /// Create an empty collection
    pub fn new(source_file: PathBuf, language: Option<String>) -> Self {
        SubtitleCollection {
            source_file,
            cues: Vec::new(),
            language,
        }
    }

    /// Read and parse a subtitle file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SubtitleError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let cues = parse_subtitles(&content)?;
        let language = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(extract_language_code);

        debug!("Parsed {} cues from {}", cues.len(), path.display());

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            cues,
            language,
        })
    }

    /// Write cues to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

        for cue in &self.cues {
            write!(file, "{}", cue)?;
        }

        Ok(())
    }

    /// End of the last cue in seconds, 0 for an empty collection
    pub fn last_end(&self) -> f64 {
        self.cues.iter().map(|cue| cue.end).fold(0.0, f64::max)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Language: {}", self.language.as_deref().unwrap_or("unknown"))?;
        writeln!(f, "Cues: {}", self.cues.len())?;
        Ok(())
    }
}

/// Parse subtitle text into cues, preserving file order.
///
/// Blocks are separated by blank lines. Each block needs an index line, a
/// `start --> end` line and at least one text line; text lines are joined
/// with every whitespace run collapsed to one space.
pub fn parse_subtitles(content: &str) -> Result<Vec<Cue>, SubtitleError> {
    let normalized = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut cues = Vec::new();
    let mut seen = HashSet::new();
    let mut block_number = 0;

    for raw_block in normalized.split("\n\n") {
        if raw_block.trim().is_empty() {
            continue;
        }
        block_number += 1;

        let block = raw_block.trim_matches('\n');
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < 3 {
            return Err(SubtitleError::block(
                block_number,
                format!("expected at least 3 lines, found {}", lines.len()),
            ));
        }

        let index_line = lines[0].trim();
        let index: usize = index_line.parse().map_err(|_| {
            SubtitleError::block(block_number, format!("index '{}' is not an integer", index_line))
        })?;
        if index == 0 {
            return Err(SubtitleError::block(block_number, "index must be positive"));
        }
        if !seen.insert(index) {
            return Err(SubtitleError::block(block_number, format!("duplicate index {}", index)));
        }

        let (start_text, end_text) = lines[1]
            .split_once("-->")
            .ok_or_else(|| SubtitleError::block(block_number, "missing '-->' in timing line"))?;
        let start = parse_timestamp(start_text)?;
        let end = parse_timestamp(end_text)?;
        if end <= start {
            return Err(SubtitleError::block(
                block_number,
                format!("end {} is not after start {}", end_text.trim(), start_text.trim()),
            ));
        }

        let text = collapse_whitespace(&lines[2..].join(" "));
        if text.is_empty() {
            warn!("Subtitle {} has no text, its slot will be silent", index);
        }

        cues.push(Cue {
            index,
            start,
            end,
            text,
        });
    }

    Ok(cues)
}

/// Language tag before the `.srt` extension (`video_km.srt` -> `km`)
pub fn extract_language_code(filename: &str) -> Option<String> {
    LANGUAGE_CODE_REGEX
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
