use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::errors::{MediaError, SpeechError};
use crate::media::run_tool;
use crate::speech::Synthesizer;

/// Speech through the `edge-tts` command line tool
#[derive(Debug, Clone)]
pub struct EdgeTts {
    command: String,
    timeout: Duration,
}

impl EdgeTts {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Synthesizer for EdgeTts {
    fn name(&self) -> &str {
        "edge-tts"
    }

    async fn synthesize(&self, text: &str, voice: &str, dest: &Path) -> Result<(), SpeechError> {
        debug!("edge-tts {} -> {}", voice, dest.display());

        // `--text=` keeps lines starting with '-' from parsing as flags
        let text_arg = format!("--text={}", text);
        let result = run_tool(
            &self.command,
            [
                OsStr::new("--voice"),
                OsStr::new(voice),
                OsStr::new(&text_arg),
                OsStr::new("--write-media"),
                dest.as_os_str(),
            ],
            self.timeout,
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(MediaError::ExternalProcessFailed { status, stderr, .. }) => Err(SpeechError::synthesis(
                dest,
                format!("edge-tts exited with {}: {}", status, stderr),
            )),
            Err(e) => Err(SpeechError::synthesis(dest, e.to_string())),
        }
    }
}
