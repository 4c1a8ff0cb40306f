//! SM-2 Spaced Repetition Algorithm
//!
//! Implementation of the SuperMemo 2 algorithm for calculating
//! review intervals from self-graded recall.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation
//!
//! Every function here is pure: the caller passes `now`.

use chrono::{DateTime, Duration, Utc};

use super::models::{IntervalPreview, LearningStage, ScheduleState};

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor of a freshly created item
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Ease penalty applied on a failed review
pub const FAILURE_EASE_PENALTY: f64 = 0.2;

/// Lowest quality that counts as a successful recall
pub const PASSING_QUALITY: u8 = 3;

/// Longest interval a review can schedule (about 100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Fresh schedule for a new item, due immediately
pub fn create_initial(now: DateTime<Utc>) -> ScheduleState {
    ScheduleState {
        interval_days: 0,
        repetition_count: 0,
        ease_factor: INITIAL_EASE_FACTOR,
        next_review_at: now,
        last_reviewed_at: None,
        created_at: now,
        updated_at: now,
        learning_stage: LearningStage::New,
        exposure_count: 0,
        last_session_at: None,
        mastered_at: None,
    }
}

/// Apply one graded review and return the updated schedule.
///
/// Learning stage and exposure fields are left alone; stage changes belong
/// to the callers that know why the review happened.
pub fn advance(state: &ScheduleState, quality: u8, now: DateTime<Utc>) -> ScheduleState {
    let quality = quality.min(5);
    let mut next = state.clone();

    // Stored files may carry an ease factor below the floor
    let ease_factor = state.ease_factor.max(MIN_EASE_FACTOR);

    if quality >= PASSING_QUALITY {
        next.repetition_count = state.repetition_count.saturating_add(1);
        next.interval_days = match next.repetition_count {
            1 => 1,
            2 => 6,
            _ => ((state.interval_days as f64 * ease_factor).round() as u32).max(1),
        }
        .min(MAX_INTERVAL_DAYS);

        // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
        let q = (5 - quality) as f64;
        next.ease_factor = (ease_factor + (0.1 - q * (0.08 + q * 0.02))).max(MIN_EASE_FACTOR);
    } else {
        next.repetition_count = 0;
        next.interval_days = 1;
        next.ease_factor = (ease_factor - FAILURE_EASE_PENALTY).max(MIN_EASE_FACTOR);
    }

    next.next_review_at = now + Duration::days(next.interval_days as i64);
    next.last_reviewed_at = Some(now);
    next.updated_at = now;
    next
}

/// Hand an item that reached its exposure threshold over to spaced review.
///
/// The item becomes due one day later as if it had just passed a first review.
pub fn graduate(state: &ScheduleState, now: DateTime<Utc>) -> ScheduleState {
    let mut next = state.clone();
    next.learning_stage = LearningStage::Mastered;
    next.mastered_at = Some(now);
    next.interval_days = 1;
    next.repetition_count = 0;
    next.next_review_at = now + Duration::days(1);
    next.updated_at = now;
    next
}

/// Check if the item is due for review
pub fn is_due(state: &ScheduleState, now: DateTime<Utc>) -> bool {
    state.next_review_at <= now
}

/// Never reviewed
pub fn is_new(state: &ScheduleState) -> bool {
    state.repetition_count == 0 && state.last_reviewed_at.is_none()
}

pub fn is_learned(state: &ScheduleState, threshold: u32) -> bool {
    state.repetition_count >= threshold
}

/// Calculate the preview intervals for each UI rating
/// Used to show users what interval each rating would give
pub fn preview_intervals(state: &ScheduleState, now: DateTime<Utc>) -> IntervalPreview {
    IntervalPreview {
        again: advance(state, ui_rating_to_quality(1), now).interval_days,
        hard: advance(state, ui_rating_to_quality(2), now).interval_days,
        good: advance(state, ui_rating_to_quality(3), now).interval_days,
        easy: advance(state, ui_rating_to_quality(4), now).interval_days,
    }
}

/// Map UI rating (1-4: Again, Hard, Good, Easy) to SM-2 quality (0-5)
pub fn ui_rating_to_quality(rating: u8) -> u8 {
    match rating {
        1 => 1, // Again -> quality 1 (incorrect but recognized)
        2 => 3, // Hard -> quality 3 (correct with difficulty)
        3 => 4, // Good -> quality 4 (correct with hesitation)
        4 => 5, // Easy -> quality 5 (perfect)
        _ => 4, // Default to Good
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
