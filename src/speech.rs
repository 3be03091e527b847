/*!
 * Speech clip generation.
 *
 * [`SpeechGenerator`] turns one cue's text into one audio file through a
 * [`Synthesizer`] backend. Generation is idempotent per destination: an
 * existing clip is reused, a fingerprint sidecar detects clips whose text
 * or voice has changed since they were made, and output is written to a
 * `.part` file that is renamed into place only once it is complete.
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::errors::SpeechError;
use crate::language_utils;

/// Voice used when nothing else matches
pub const DEFAULT_VOICE: &str = "km-KH-PisethNeural";

/// Built-in language -> neural voice map
pub const VOICE_MAP: &[(&str, &str)] = &[
    ("ar", "ar-SA-ZariyahNeural"),
    ("de", "de-DE-KatjaNeural"),
    ("en", "en-US-AriaNeural"),
    ("es", "es-ES-ElviraNeural"),
    ("fr", "fr-FR-DeniseNeural"),
    ("hi", "hi-IN-SwaraNeural"),
    ("id", "id-ID-GadisNeural"),
    ("it", "it-IT-ElsaNeural"),
    ("ja", "ja-JP-NanamiNeural"),
    ("km", "km-KH-PisethNeural"),
    ("ko", "ko-KR-SunHiNeural"),
    ("pt", "pt-BR-FranciscaNeural"),
    ("ru", "ru-RU-SvetlanaNeural"),
    ("th", "th-TH-PremwadeeNeural"),
    ("vi", "vi-VN-HoaiMyNeural"),
    ("zh", "zh-CN-XiaoxiaoNeural"),
];

/// Text-to-speech backend
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Synthesize `text` with `voice` into the file at `dest`
    async fn synthesize(&self, text: &str, voice: &str, dest: &Path) -> Result<(), SpeechError>;
}

/// What `generate` did for one cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    /// A new clip was synthesized
    Generated,
    /// An existing clip was kept
    Reused,
    /// An existing clip was stale and replaced
    Regenerated,
    /// The text was empty; no clip exists
    Silent,
}

impl ClipOutcome {
    /// Whether a clip file exists after this outcome
    pub fn has_clip(&self) -> bool {
        !matches!(self, ClipOutcome::Silent)
    }
}

/// NFC-normalize, turn the Khmer khan into a pause, trim
pub fn prepare_text(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    normalized.replace('\u{17D4}', "  ").trim().to_string()
}

/// SHA-256 over voice and prepared text
pub fn fingerprint(prepared_text: &str, voice: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(voice.as_bytes());
    hasher.update([0u8]);
    hasher.update(prepared_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Path of the fingerprint sidecar for a clip
pub fn fingerprint_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn io_error(path: &Path, source: std::io::Error) -> SpeechError {
    SpeechError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub struct SpeechGenerator {
    synthesizer: Arc<dyn Synthesizer>,
    verify_fingerprints: bool,
}

impl SpeechGenerator {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, verify_fingerprints: bool) -> Self {
        SpeechGenerator {
            synthesizer,
            verify_fingerprints,
        }
    }

    pub fn synthesizer_name(&self) -> &str {
        self.synthesizer.name()
    }

    /// Materialize the clip for `text` at `dest`
    pub async fn generate(&self, text: &str, voice: &str, dest: &Path) -> Result<ClipOutcome, SpeechError> {
        let prepared = prepare_text(text);
        if prepared.is_empty() {
            return Ok(ClipOutcome::Silent);
        }

        let expected = fingerprint(&prepared, voice);
        let sidecar = fingerprint_path(dest);
        let mut outcome = ClipOutcome::Generated;

        if dest.exists() {
            if !self.verify_fingerprints || !sidecar.exists() {
                return Ok(ClipOutcome::Reused);
            }
            let recorded = fs::read_to_string(&sidecar).map_err(|e| io_error(&sidecar, e))?;
            if recorded.trim() == expected {
                return Ok(ClipOutcome::Reused);
            }
            debug!("Clip {} is stale, regenerating", dest.display());
            fs::remove_file(dest).map_err(|e| io_error(dest, e))?;
            outcome = ClipOutcome::Regenerated;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let partial = partial_path(dest);
        if partial.exists() {
            fs::remove_file(&partial).map_err(|e| io_error(&partial, e))?;
        }

        if let Err(e) = self.synthesizer.synthesize(&prepared, voice, &partial).await {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        let written = fs::metadata(&partial).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            let _ = fs::remove_file(&partial);
            return Err(SpeechError::synthesis(
                dest,
                format!("{} produced no audio", self.synthesizer.name()),
            ));
        }

        fs::rename(&partial, dest).map_err(|e| io_error(dest, e))?;
        if let Err(e) = fs::write(&sidecar, &expected) {
            warn!("Could not write fingerprint {}: {}", sidecar.display(), e);
        }

        Ok(outcome)
    }
}

/// Resolves the voice used for a language
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    explicit: Option<String>,
    overrides: HashMap<String, String>,
}

impl VoiceCatalog {
    /// `explicit` wins over everything when non-empty; `overrides` are keyed
    /// by language code in any form `normalize_code` understands
    pub fn new(explicit: &str, overrides: &HashMap<String, String>) -> Self {
        let explicit = Some(explicit.trim().to_string()).filter(|v| !v.is_empty());
        let overrides = overrides
            .iter()
            .map(|(code, voice)| (normalize_or_lower(code), voice.clone()))
            .collect();
        VoiceCatalog { explicit, overrides }
    }

    pub fn voice_for(&self, language: &str) -> String {
        if let Some(voice) = &self.explicit {
            return voice.clone();
        }

        let code = normalize_or_lower(language);
        if let Some(voice) = self.overrides.get(&code) {
            return voice.clone();
        }

        VOICE_MAP
            .iter()
            .find(|(lang, _)| *lang == code)
            .map(|(_, voice)| voice.to_string())
            .unwrap_or_else(|| DEFAULT_VOICE.to_string())
    }

    /// Every language with a known voice, overrides applied
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut merged: HashMap<String, String> = VOICE_MAP
            .iter()
            .map(|(lang, voice)| (lang.to_string(), voice.to_string()))
            .collect();
        merged.extend(self.overrides.clone());

        let mut entries: Vec<(String, String)> = merged.into_iter().collect();
        entries.sort();
        entries
    }
}

fn normalize_or_lower(code: &str) -> String {
    language_utils::normalize_code(code).unwrap_or_else(|_| language_utils::primary_subtag(code))
}
