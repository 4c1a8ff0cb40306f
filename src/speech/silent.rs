use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{Result, SpeechError, SpeechProvider};

/// Time budget per character at rate 1.0
const MILLIS_PER_CHAR: u64 = 70;
const MIN_UTTERANCE_MS: u64 = 300;

/// Stands in for a TTS backend by waiting as long as the text would take to say
#[derive(Default)]
pub struct SilentSpeech {
    cancel: Notify,
}

impl SilentSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn estimate(text: &str, rate: f32) -> Duration {
        let base = (text.chars().count() as u64 * MILLIS_PER_CHAR).max(MIN_UTTERANCE_MS);
        let rate = if rate > 0.0 { rate } else { 1.0 };
        Duration::from_millis((base as f32 / rate).round() as u64)
    }
}

#[async_trait]
impl SpeechProvider for SilentSpeech {
    async fn speak(&self, text: &str, _voice_hint: Option<&str>, rate: f32) -> Result<()> {
        let cancelled = self.cancel.notified();
        tokio::select! {
            _ = tokio::time::sleep(Self::estimate(text, rate)) => Ok(()),
            _ = cancelled => Err(SpeechError::Cancelled),
        }
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }
}
