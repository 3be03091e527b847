use std::fmt;

use crate::pipeline::context::ArtifactPaths;
use crate::speech::prepare_text;
use crate::subtitle_processor::Cue;

/// Where a run resumes, derived from which artifacts already exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    /// The original audio has not been extracted yet
    NeedAudioExtraction,
    /// These cue ordinals have no clip on disk
    NeedSpeechGeneration { missing: Vec<usize> },
    /// Every clip exists but the merged track does not
    NeedAssembly,
    /// The merged track exists
    Done,
}

impl PipelineStage {
    /// First missing artifact wins
    pub fn detect(paths: &ArtifactPaths, cues: &[Cue], extract_audio: bool) -> Self {
        if extract_audio && !paths.extracted_audio.is_file() {
            return PipelineStage::NeedAudioExtraction;
        }

        if paths.dubbed_audio.is_file() {
            return PipelineStage::Done;
        }

        let missing = missing_clips(paths, cues);
        if !missing.is_empty() {
            return PipelineStage::NeedSpeechGeneration { missing };
        }

        PipelineStage::NeedAssembly
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::NeedAudioExtraction => "audio extraction",
            PipelineStage::NeedSpeechGeneration { .. } => "speech generation",
            PipelineStage::NeedAssembly => "assembly",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::NeedSpeechGeneration { missing } => {
                write!(f, "{} ({} clips missing)", self.name(), missing.len())
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Ordinals of spoken cues whose clip file is absent
pub fn missing_clips(paths: &ArtifactPaths, cues: &[Cue]) -> Vec<usize> {
    cues.iter()
        .enumerate()
        .filter(|(_, cue)| !prepare_text(&cue.text).is_empty())
        .filter(|(ordinal, _)| !paths.clip_path(*ordinal).is_file())
        .map(|(ordinal, _)| ordinal)
        .collect()
}
