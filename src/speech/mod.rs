//! Speech synthesis capability used during playback
//!
//! The engine only needs two things from a text-to-speech backend: speak a
//! phrase and resolve when it has finished, and stop whatever is playing.

mod command;
mod silent;

use async_trait::async_trait;
use thiserror::Error;

pub use command::{CommandSpeech, SpeechSettings};
pub use silent::SilentSpeech;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Failed to start speech program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Speech failed: {0}")]
    Failed(String),

    #[error("Speech cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SpeechError>;

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Speak `text` and resolve once the utterance has finished (or failed).
    ///
    /// `voice_hint` is backend specific (a voice or language name) and
    /// `rate` is a multiplier where 1.0 is the backend's normal speed.
    async fn speak(&self, text: &str, voice_hint: Option<&str>, rate: f32) -> Result<()>;

    /// Stop the utterance in flight, if any. Never blocks.
    fn cancel(&self);
}
