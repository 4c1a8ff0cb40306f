use anyhow::{Context, Result};

use lingodrill_lib::VocabularyStore;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(app: &App, limit: usize, format: &OutputFormat) -> Result<()> {
    let mut sessions = app.store.list_sessions().context("Failed to list sessions")?;
    sessions.truncate(limit);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        OutputFormat::Plain => {
            if sessions.is_empty() {
                println!("No sessions yet.");
                return Ok(());
            }
            for session in &sessions {
                let status = match (session.ended_at, session.completed_normally) {
                    (None, _) => "unfinished",
                    (Some(_), true) => "completed",
                    (Some(_), false) => "stopped",
                };
                let duration = session.ended_at
                    .map(|end| format!("{}m{:02}s", (end - session.started_at).num_minutes(),
                        (end - session.started_at).num_seconds() % 60))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:<10} {:>3} items  {} reps  {}",
                    terminal::local_time(session.started_at),
                    status,
                    session.item_ids_played.len(),
                    session.repetitions_completed,
                    duration,
                );
            }
        }
    }

    Ok(())
}
