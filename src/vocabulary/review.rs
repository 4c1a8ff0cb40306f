//! Review, reset and query operations on top of any `VocabularyStore`

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{ProgressSummary, VocabularyItem};
use super::storage::{Result, StoreError, VocabularyStore};
use crate::scheduler::{self, algorithm::PASSING_QUALITY, LearningStage};

/// Attempts for a read-modify-write before a version conflict is surfaced
pub const MAX_SAVE_ATTEMPTS: usize = 3;

/// Read an item, apply `update`, and save it.
///
/// If another writer saved the item in between, the item is re-read and
/// `update` is applied again to the fresh copy.
pub fn update_item<F>(store: &dyn VocabularyStore, id: Uuid, mut update: F) -> Result<VocabularyItem>
where
    F: FnMut(&mut VocabularyItem),
{
    let mut attempt = 1;
    loop {
        let mut item = store.get(id)?;
        update(&mut item);

        match store.save(&item) {
            Err(StoreError::VersionConflict { .. }) if attempt < MAX_SAVE_ATTEMPTS => {
                log::debug!("Retrying update of item {} after conflict (attempt {})", id, attempt);
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Validate and add a new vocabulary pair
pub fn add_item(
    store: &dyn VocabularyStore,
    source_text: &str,
    target_text: &str,
    tags: &[String],
    now: DateTime<Utc>,
) -> Result<VocabularyItem> {
    let source_text = source_text.trim();
    let target_text = target_text.trim();
    if source_text.is_empty() {
        return Err(StoreError::InvalidItem("source text is empty".to_string()));
    }
    if target_text.is_empty() {
        return Err(StoreError::InvalidItem("target text is empty".to_string()));
    }

    let item = VocabularyItem::new(source_text.to_string(), target_text.to_string(), now)
        .with_tags(tags.iter().cloned());
    let item = store.insert(item)?;
    log::info!("Added item {} ({} -> {})", item.id, item.source_text, item.target_text);
    Ok(item)
}

/// Submit a graded review for an item.
///
/// A successful review of a mastered item moves it into long-term review.
pub fn review_item(
    store: &dyn VocabularyStore,
    id: Uuid,
    quality: u8,
    now: DateTime<Utc>,
) -> Result<VocabularyItem> {
    let item = update_item(store, id, |item| {
        let mut next = scheduler::advance(&item.schedule_state, quality, now);
        if quality >= PASSING_QUALITY && next.learning_stage == LearningStage::Mastered {
            next.learning_stage = LearningStage::LongTermReview;
        }
        item.schedule_state = next;
    })?;

    log::info!(
        "Reviewed item {} with quality {}: next review in {}",
        id,
        quality,
        scheduler::algorithm::format_interval(item.schedule_state.interval_days)
    );
    Ok(item)
}

/// Put an item back to the state of a freshly created one
pub fn reset_item(store: &dyn VocabularyStore, id: Uuid, now: DateTime<Utc>) -> Result<VocabularyItem> {
    let item = update_item(store, id, |item| {
        let created_at = item.schedule_state.created_at;
        item.schedule_state = scheduler::create_initial(now);
        item.schedule_state.created_at = created_at;
    })?;
    log::info!("Reset item {}", id);
    Ok(item)
}

/// Items due for review, most overdue first
pub fn due_items(store: &dyn VocabularyStore, now: DateTime<Utc>) -> Result<Vec<VocabularyItem>> {
    let mut due: Vec<VocabularyItem> = store
        .load_all()?
        .into_iter()
        .filter(|item| scheduler::is_due(&item.schedule_state, now))
        .collect();

    due.sort_by(|a, b| a.schedule_state.next_review_at.cmp(&b.schedule_state.next_review_at));
    Ok(due)
}

pub fn progress_summary(items: &[VocabularyItem], now: DateTime<Utc>) -> ProgressSummary {
    let mut summary = ProgressSummary {
        total_items: items.len(),
        ..Default::default()
    };

    for item in items {
        match item.stage() {
            LearningStage::New => summary.new_items += 1,
            LearningStage::PassiveLearning => summary.passive_learning_items += 1,
            LearningStage::Mastered => summary.mastered_items += 1,
            LearningStage::LongTermReview => summary.long_term_review_items += 1,
        }

        if scheduler::is_due(&item.schedule_state, now) {
            summary.due_items += 1;
        }
    }

    summary
}
