//! Data models for vocabulary items

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::{self, LearningStage, ScheduleState};

/// A learnable source/target pair with its schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: Uuid,
    pub source_text: String,
    pub target_text: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub schedule_state: ScheduleState,
    /// Bumped by the store on every successful save
    #[serde(default)]
    pub version: u64,
}

impl VocabularyItem {
    pub fn new(source_text: String, target_text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_text,
            target_text,
            tags: BTreeSet::new(),
            schedule_state: scheduler::create_initial(now),
            version: 0,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| {
                let t: String = t.into();
                t.trim().to_string()
            })
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn stage(&self) -> LearningStage {
        self.schedule_state.learning_stage
    }
}

/// Counts of items per learning stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_items: usize,
    pub new_items: usize,
    pub passive_learning_items: usize,
    pub mastered_items: usize,
    pub long_term_review_items: usize,
    /// Items whose next review time has passed
    pub due_items: usize,
}

impl ProgressSummary {
    pub fn count(&self, stage: LearningStage) -> usize {
        match stage {
            LearningStage::New => self.new_items,
            LearningStage::PassiveLearning => self.passive_learning_items,
            LearningStage::Mastered => self.mastered_items,
            LearningStage::LongTermReview => self.long_term_review_items,
        }
    }
}
