use anyhow::{Context, Result};
use chrono::Utc;

use lingodrill_lib::scheduler::algorithm::{format_interval, ui_rating_to_quality};
use lingodrill_lib::vocabulary;

use crate::app::{short_id, App};
use crate::OutputFormat;

pub fn run_review(app: &App, query: &str, rating: u8, format: &OutputFormat) -> Result<()> {
    let item = app.find_item(query)?;
    let quality = ui_rating_to_quality(rating);

    let item = vocabulary::review_item(app.store.as_ref(), item.id, quality, Utc::now())
        .with_context(|| format!("Failed to review '{}'", item.source_text))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        OutputFormat::Plain => {
            let state = &item.schedule_state;
            println!(
                "{} {} [{}] next review in {} (ease {:.2})",
                short_id(&item),
                item.source_text,
                state.learning_stage,
                format_interval(state.interval_days),
                state.ease_factor,
            );
        }
    }

    Ok(())
}

pub fn run_reset(app: &App, query: &str, format: &OutputFormat) -> Result<()> {
    let item = app.find_item(query)?;

    let item = vocabulary::reset_item(app.store.as_ref(), item.id, Utc::now())
        .with_context(|| format!("Failed to reset '{}'", item.source_text))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        OutputFormat::Plain => {
            println!("Reset {} {}", short_id(&item), item.source_text);
        }
    }

    Ok(())
}
