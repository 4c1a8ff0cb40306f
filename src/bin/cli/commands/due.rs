use anyhow::{Context, Result};
use chrono::Utc;

use lingodrill_lib::scheduler::algorithm::{format_interval, preview_intervals};
use lingodrill_lib::vocabulary;

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let now = Utc::now();
    let due = vocabulary::due_items(app.store.as_ref(), now)
        .context("Failed to load due items")?;

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = due.iter().map(|item| {
                serde_json::json!({
                    "item": item,
                    "preview": preview_intervals(&item.schedule_state, now),
                })
            }).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing due.");
                return Ok(());
            }
            for item in &due {
                let preview = preview_intervals(&item.schedule_state, now);
                println!("{}", terminal::render_item_line(item, now, use_color));
                println!(
                    "{}",
                    terminal::paint(
                        &format!(
                            "          again {}  hard {}  good {}  easy {}",
                            format_interval(preview.again),
                            format_interval(preview.hard),
                            format_interval(preview.good),
                            format_interval(preview.easy),
                        ),
                        Color::GRAY,
                        use_color,
                    )
                );
            }
        }
    }

    Ok(())
}
