use serde::Serialize;
use uuid::Uuid;

use super::models::Session;
use crate::scheduler::LearningStage;

/// Notifications published by the session engine, in playback order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    SessionStarted {
        session_id: Uuid,
        working_set_size: usize,
        repetitions: u32,
    },
    #[serde(rename_all = "camelCase")]
    ItemPlaybackStarted {
        session_id: Uuid,
        item_id: Uuid,
        word_index: usize,
        repetition_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    ItemPlaybackCompleted {
        session_id: Uuid,
        item_id: Uuid,
        exposure_count: u32,
        learning_stage: LearningStage,
        /// Stage changed during this playback
        stage_changed: bool,
    },
    #[serde(rename_all = "camelCase")]
    SessionPaused {
        session_id: Uuid,
        word_index: usize,
        repetition_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    SessionResumed {
        session_id: Uuid,
        word_index: usize,
        repetition_index: u32,
    },
    /// The item update could not be saved; the session is paused on that item
    #[serde(rename_all = "camelCase")]
    PlaybackFailed {
        session_id: Uuid,
        item_id: Uuid,
        error: String,
    },
    SessionCompleted { session: Session },
    SessionStopped { session: Session },
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::SessionStarted { session_id, .. }
            | Self::ItemPlaybackStarted { session_id, .. }
            | Self::ItemPlaybackCompleted { session_id, .. }
            | Self::SessionPaused { session_id, .. }
            | Self::SessionResumed { session_id, .. }
            | Self::PlaybackFailed { session_id, .. } => *session_id,
            Self::SessionCompleted { session } | Self::SessionStopped { session } => session.id,
        }
    }
}
