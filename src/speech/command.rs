//! Speech through an external TTS program such as `espeak-ng` or `say`

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Notify;

use super::{Result, SpeechError, SpeechProvider};

/// How to invoke the external speech program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechSettings {
    /// Program to run, looked up on `PATH`
    pub program: String,
    /// Extra arguments placed before the text
    pub args: Vec<String>,
    /// Flag taking a words-per-minute value (e.g. `-s`), omitted if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_flag: Option<String>,
    /// Flag taking a voice name (e.g. `-v`), omitted if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_flag: Option<String>,
    /// Speaking speed at rate 1.0
    pub words_per_minute: u32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            args: Vec::new(),
            rate_flag: Some("-s".to_string()),
            voice_flag: Some("-v".to_string()),
            words_per_minute: 160,
        }
    }
}

impl SpeechSettings {
    /// Arguments for one utterance
    pub fn build_args(&self, text: &str, voice_hint: Option<&str>, rate: f32) -> Vec<String> {
        let mut args = self.args.clone();

        if let (Some(flag), Some(voice)) = (&self.voice_flag, voice_hint) {
            args.push(flag.clone());
            args.push(voice.to_string());
        }

        if let Some(flag) = &self.rate_flag {
            let wpm = (self.words_per_minute as f32 * rate).round().max(1.0) as u32;
            args.push(flag.clone());
            args.push(wpm.to_string());
        }

        args.push(text.to_string());
        args
    }
}

/// Runs one child process per utterance
pub struct CommandSpeech {
    settings: SpeechSettings,
    cancel: Notify,
}

impl CommandSpeech {
    pub fn new(settings: SpeechSettings) -> Self {
        Self {
            settings,
            cancel: Notify::new(),
        }
    }
}

#[async_trait]
impl SpeechProvider for CommandSpeech {
    async fn speak(&self, text: &str, voice_hint: Option<&str>, rate: f32) -> Result<()> {
        // Register before spawning so a cancel racing the spawn is not lost
        let cancelled = self.cancel.notified();

        let mut child = Command::new(&self.settings.program)
            .args(self.settings.build_args(text, voice_hint, rate))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.settings.program.clone(),
                source,
            })?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(SpeechError::Failed(format!("{} exited with {}", self.settings.program, status)))
                }
            }
            _ = cancelled => {
                log::debug!("Cancelling utterance '{}'", text);
                let _ = child.kill().await;
                Err(SpeechError::Cancelled)
            }
        }
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }
}
