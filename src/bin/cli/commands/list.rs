use anyhow::{anyhow, Result};
use chrono::Utc;

use lingodrill_lib::scheduler::LearningStage;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(
    app: &App,
    stage: Option<&str>,
    tag: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let stage: Option<LearningStage> = stage
        .map(|s| s.parse::<LearningStage>().map_err(|e: String| anyhow!(e)))
        .transpose()?;

    let items: Vec<_> = app.list_items()?
        .into_iter()
        .filter(|item| stage.map_or(true, |s| item.stage() == s))
        .filter(|item| tag.map_or(true, |t| item.tags.iter().any(|it| it.eq_ignore_ascii_case(t))))
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Plain => {
            if items.is_empty() {
                println!("No vocabulary items.");
                return Ok(());
            }
            let now = Utc::now();
            for item in &items {
                println!("{}", terminal::render_item_line(item, now, use_color));
            }
        }
    }

    Ok(())
}
