use anyhow::{Context, Result};
use chrono::Utc;

use lingodrill_lib::vocabulary;

use crate::app::{short_id, App};
use crate::OutputFormat;

pub fn run(
    app: &App,
    source: &str,
    target: &str,
    tags: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let tags: Vec<String> = tags
        .map(|tag_str| {
            tag_str.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let item = vocabulary::add_item(app.store.as_ref(), source, target, &tags, Utc::now())
        .context("Failed to add item")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        OutputFormat::Plain => {
            println!("Added {} {} = {}", short_id(&item), item.source_text, item.target_text);
        }
    }

    Ok(())
}
