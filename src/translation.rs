/*!
 * Line-for-line subtitle translation.
 *
 * Index and timing lines are copied verbatim; every other non-empty line is
 * sent to a [`Translator`] on its own. Responses are flattened to a single
 * line so the block structure of the file never changes, and the result is
 * parsed back before it is written.
 */

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use log::{info, warn};

use crate::errors::ProviderError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::subtitle_processor::{collapse_whitespace, extract_language_code, parse_subtitles};

/// Text translation backend
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Translate one line of text
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String, ProviderError>;
}

/// Fill `{source_language}` and `{target_language}` with English language names
pub fn build_system_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    let name = |code: &str| language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string());
    template
        .replace("{source_language}", &name(source_language))
        .replace("{target_language}", &name(target_language))
}

/// Lines that are structure rather than dialogue
pub fn is_passthrough_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.chars().all(|c| c.is_ascii_digit()) || trimmed.contains("-->")
}

/// Source and target languages for a subtitle pair: filename codes first,
/// then the configured defaults
pub fn resolve_languages(
    source_path: &Path,
    target_path: &Path,
    default_source: &str,
    default_target: &str,
) -> (String, String) {
    let code_of = |path: &Path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(extract_language_code)
            .filter(|code| language_utils::validate_language_code(code).is_ok())
    };
    (
        code_of(source_path).unwrap_or_else(|| default_source.to_string()),
        code_of(target_path).unwrap_or_else(|| default_target.to_string()),
    )
}

pub struct SubtitleTranslator {
    translator: Arc<dyn Translator>,
    concurrent_requests: usize,
}

impl SubtitleTranslator {
    pub fn new(translator: Arc<dyn Translator>, concurrent_requests: usize) -> Self {
        Self {
            translator,
            concurrent_requests: concurrent_requests.max(1),
        }
    }

    /// Number of lines `translate_text` would send
    pub fn count_translatable(content: &str) -> usize {
        content.lines().filter(|line| !is_passthrough_line(line)).count()
    }

    /// Translate subtitle text, keeping every structural line as is
    pub async fn translate_text(
        &self,
        content: &str,
        source_language: &str,
        target_language: &str,
        progress: Option<&ProgressBar>,
    ) -> Result<String, ProviderError> {
        let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
        let mut lines: Vec<String> = normalized.lines().map(str::to_string).collect();

        let pending: Vec<(usize, String)> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !is_passthrough_line(line))
            .map(|(i, line)| (i, line.trim().to_string()))
            .collect();

        let translator = &self.translator;
        let results: Vec<(usize, String, Result<String, ProviderError>)> = stream::iter(pending)
            .map(|(i, line)| async move {
                let result = translator.translate(&line, source_language, target_language).await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                (i, line, result)
            })
            .buffered(self.concurrent_requests)
            .collect()
            .await;

        for (i, original, result) in results {
            let translated = collapse_whitespace(&result?);
            if translated.is_empty() {
                warn!("Empty translation for '{}', keeping the original line", original);
                lines[i] = original;
            } else {
                lines[i] = translated;
            }
        }

        let mut output = lines.join("\n");
        output.push('\n');
        Ok(output)
    }

    /// Translate a subtitle file into `output`
    pub async fn translate_file(
        &self,
        input: &Path,
        output: &Path,
        source_language: &str,
        target_language: &str,
        progress: Option<&ProgressBar>,
    ) -> Result<()> {
        let content = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read subtitle file: {}", input.display()))?;
        let source_cues = parse_subtitles(&content)
            .with_context(|| format!("Invalid source subtitles: {}", input.display()))?;

        info!(
            "Translating {} from {} to {} with {}",
            input.display(),
            source_language,
            target_language,
            self.translator.name()
        );

        let translated = self
            .translate_text(&content, source_language, target_language, progress)
            .await?;

        let translated_cues = parse_subtitles(&translated)
            .context("Translated subtitles are not valid")?;
        if translated_cues.len() != source_cues.len() {
            return Err(anyhow!(
                "Translation changed the number of cues ({} -> {})",
                source_cues.len(),
                translated_cues.len()
            ));
        }

        let mut partial = output.as_os_str().to_owned();
        partial.push(".part");
        FileManager::write_to_file(&partial, &translated)?;
        FileManager::move_file(&partial, output)?;

        Ok(())
    }
}
