use chrono::{DateTime, Local, Utc};

use lingodrill_lib::scheduler::algorithm::format_interval;
use lingodrill_lib::scheduler::LearningStage;
use lingodrill_lib::vocabulary::{ProgressSummary, VocabularyItem};

use crate::app::short_id;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

fn stage_color(stage: LearningStage) -> &'static str {
    match stage {
        LearningStage::New => Color::CYAN,
        LearningStage::PassiveLearning => Color::YELLOW,
        LearningStage::Mastered => Color::GREEN,
        LearningStage::LongTermReview => Color::MAGENTA,
    }
}

/// Stage label padded to a fixed width so rows line up
pub fn render_stage(stage: LearningStage, use_color: bool) -> String {
    paint(&format!("{:<8}", stage.label()), stage_color(stage), use_color)
}

/// How far away a review time is, e.g. "in 3d" or "2w overdue"
pub fn render_due(next_review_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (next_review_at - now).num_days();
    if next_review_at <= now {
        if days == 0 {
            "due".to_string()
        } else {
            format!("{} overdue", format_interval(days.unsigned_abs() as u32))
        }
    } else if days == 0 {
        "today".to_string()
    } else {
        format!("in {}", format_interval(days as u32))
    }
}

/// One line per item: id, stage, pair, exposures, next review
pub fn render_item_line(item: &VocabularyItem, now: DateTime<Utc>, use_color: bool) -> String {
    let state = &item.schedule_state;
    let mut line = format!(
        "{}  {}  {} = {}",
        paint(&short_id(item), Color::GRAY, use_color),
        render_stage(state.learning_stage, use_color),
        paint(&item.source_text, Color::BOLD, use_color),
        item.target_text,
    );

    if state.exposure_count > 0 {
        line.push_str(&paint(&format!("  x{}", state.exposure_count), Color::DIM, use_color));
    }

    if !item.tags.is_empty() {
        let tags = item.tags.iter().map(|t| format!("#{}", t)).collect::<Vec<_>>().join(" ");
        line.push_str(&format!("  {}", paint(&tags, Color::BLUE, use_color)));
    }

    if matches!(state.learning_stage, LearningStage::Mastered | LearningStage::LongTermReview) {
        line.push_str(&paint(
            &format!("  ({})", render_due(state.next_review_at, now)),
            Color::DIM,
            use_color,
        ));
    }

    line
}

pub fn render_summary(summary: &ProgressSummary, use_color: bool) -> Vec<String> {
    let mut lines = vec![paint(&format!("{} items", summary.total_items), Color::BOLD, use_color)];

    for stage in [
        LearningStage::New,
        LearningStage::PassiveLearning,
        LearningStage::Mastered,
        LearningStage::LongTermReview,
    ] {
        lines.push(format!("  {} {:>5}", render_stage(stage, use_color), summary.count(stage)));
    }

    let due = format!("  {:<8} {:>5}", "due", summary.due_items);
    if summary.due_items > 0 {
        lines.push(paint(&due, Color::RED, use_color));
    } else {
        lines.push(due);
    }

    lines
}

pub fn local_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
