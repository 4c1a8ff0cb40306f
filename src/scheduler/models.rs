//! Spaced repetition state shared by the scheduler and the session engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Passive-learning progression of an item.
///
/// Stages only move forward; the one way back is an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearningStage {
    /// Never played or reviewed
    New,
    /// Heard at least once in a playback session
    PassiveLearning,
    /// Reached the exposure threshold, handed to spaced review
    Mastered,
    /// Reviewed successfully after mastery
    LongTermReview,
}

impl Default for LearningStage {
    fn default() -> Self {
        Self::New
    }
}

impl LearningStage {
    /// Whether items in this stage are picked for playback sessions
    pub fn is_session_eligible(self) -> bool {
        matches!(self, Self::New | Self::PassiveLearning)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PassiveLearning => "passive",
            Self::Mastered => "mastered",
            Self::LongTermReview => "review",
        }
    }
}

impl std::fmt::Display for LearningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for LearningStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "passive" | "passive_learning" => Ok(Self::PassiveLearning),
            "mastered" => Ok(Self::Mastered),
            "review" | "long_term_review" => Ok(Self::LongTermReview),
            other => Err(format!("unknown learning stage '{}'", other)),
        }
    }
}

/// Spaced repetition record embedded in every vocabulary item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    /// Current interval in days
    #[serde(default)]
    pub interval_days: u32,
    /// Consecutive successful reviews; reset to 0 on failure
    #[serde(default)]
    pub repetition_count: u32,
    /// SM-2 ease factor, never below 1.3
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub learning_stage: LearningStage,
    /// Full passive playbacks heard so far
    #[serde(default)]
    pub exposure_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastered_at: Option<DateTime<Utc>>,
}

pub(crate) fn default_ease_factor() -> f64 {
    super::algorithm::INITIAL_EASE_FACTOR
}

/// Interval in days each UI rating would produce
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalPreview {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}
