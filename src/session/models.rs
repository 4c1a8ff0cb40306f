//! Data models for passive playback sessions

use std::ops::RangeInclusive;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const REPETITIONS_RANGE: RangeInclusive<u32> = 2..=5;
pub const MAX_ITEMS_RANGE: RangeInclusive<usize> = 10..=25;
pub const SPEECH_RATE_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Playback settings for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Full passes over the working set
    #[serde(default = "default_repetitions")]
    pub repetitions_per_session: u32,
    /// Gap between source and target audio
    #[serde(default = "default_word_pause_ms")]
    pub word_pause_ms: u64,
    /// Gap after the target audio, before the next item
    #[serde(default = "default_inter_word_pause_ms")]
    pub inter_word_pause_ms: u64,
    #[serde(default = "default_max_items")]
    pub max_items_per_session: usize,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    /// Completed playbacks after which an item counts as mastered
    #[serde(default = "default_exposures_before_mastery")]
    pub exposures_before_mastery: u32,
    /// Voice hint passed to the speech backend for source text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_voice: Option<String>,
    /// Voice hint passed to the speech backend for target text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_voice: Option<String>,
}

fn default_repetitions() -> u32 {
    3
}

fn default_word_pause_ms() -> u64 {
    1500
}

fn default_inter_word_pause_ms() -> u64 {
    2500
}

fn default_max_items() -> usize {
    20
}

fn default_speech_rate() -> f32 {
    1.0
}

fn default_exposures_before_mastery() -> u32 {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repetitions_per_session: default_repetitions(),
            word_pause_ms: default_word_pause_ms(),
            inter_word_pause_ms: default_inter_word_pause_ms(),
            max_items_per_session: default_max_items(),
            speech_rate: default_speech_rate(),
            exposures_before_mastery: default_exposures_before_mastery(),
            source_voice: None,
            target_voice: None,
        }
    }
}

impl SessionConfig {
    /// Check every option against its recognized range
    pub fn validate(&self) -> Result<(), String> {
        if !REPETITIONS_RANGE.contains(&self.repetitions_per_session) {
            return Err(format!(
                "repetitionsPerSession must be between {} and {}, got {}",
                REPETITIONS_RANGE.start(),
                REPETITIONS_RANGE.end(),
                self.repetitions_per_session
            ));
        }
        if !MAX_ITEMS_RANGE.contains(&self.max_items_per_session) {
            return Err(format!(
                "maxItemsPerSession must be between {} and {}, got {}",
                MAX_ITEMS_RANGE.start(),
                MAX_ITEMS_RANGE.end(),
                self.max_items_per_session
            ));
        }
        if !SPEECH_RATE_RANGE.contains(&self.speech_rate) {
            return Err(format!(
                "speechRate must be between {} and {}, got {}",
                SPEECH_RATE_RANGE.start(),
                SPEECH_RATE_RANGE.end(),
                self.speech_rate
            ));
        }
        if self.exposures_before_mastery == 0 {
            return Err("exposuresBeforeMastery must be at least 1".to_string());
        }
        Ok(())
    }

    /// Copy with every option forced into its recognized range
    pub fn clamped(&self) -> Self {
        let speech_rate = if self.speech_rate.is_nan() {
            default_speech_rate()
        } else {
            self.speech_rate
                .clamp(*SPEECH_RATE_RANGE.start(), *SPEECH_RATE_RANGE.end())
        };

        Self {
            repetitions_per_session: self
                .repetitions_per_session
                .clamp(*REPETITIONS_RANGE.start(), *REPETITIONS_RANGE.end()),
            max_items_per_session: self
                .max_items_per_session
                .clamp(*MAX_ITEMS_RANGE.start(), *MAX_ITEMS_RANGE.end()),
            speech_rate,
            exposures_before_mastery: self.exposures_before_mastery.max(1),
            ..self.clone()
        }
    }

    pub fn word_pause(&self) -> Duration {
        Duration::from_millis(self.word_pause_ms)
    }

    pub fn inter_word_pause(&self) -> Duration {
        Duration::from_millis(self.inter_word_pause_ms)
    }
}

/// Record of one playback run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Each played item once, in the order first played
    #[serde(default)]
    pub item_ids_played: Vec<Uuid>,
    /// Full passes over the working set
    #[serde(default)]
    pub repetitions_completed: u32,
    #[serde(default)]
    pub completed_normally: bool,
}

impl Session {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            ended_at: None,
            item_ids_played: Vec::new(),
            repetitions_completed: 0,
            completed_normally: false,
        }
    }

    /// Note that an item was played. Returns false if it was already recorded.
    pub fn record_played(&mut self, item_id: Uuid) -> bool {
        if self.item_ids_played.contains(&item_id) {
            return false;
        }
        self.item_ids_played.push(item_id);
        true
    }

    pub fn finish(&mut self, ended_at: DateTime<Utc>, completed_normally: bool) {
        self.ended_at = Some(ended_at);
        self.completed_normally = completed_normally;
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Lifecycle state of the session engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Active,
    Paused,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Position of the playback cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub state: EngineState,
    pub word_index: usize,
    pub repetition_index: u32,
    pub working_set_size: usize,
    pub repetitions_per_session: u32,
}
