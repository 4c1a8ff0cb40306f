use anyhow::Result;
use chrono::Utc;

use lingodrill_lib::vocabulary;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let items = app.list_items()?;
    let summary = vocabulary::progress_summary(&items, Utc::now());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Plain => {
            for line in terminal::render_summary(&summary, use_color) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
