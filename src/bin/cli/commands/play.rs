use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use lingodrill_lib::session::Session;
use lingodrill_lib::speech::{CommandSpeech, SilentSpeech, SpeechProvider};
use lingodrill_lib::vocabulary::VocabularyItem;
use lingodrill_lib::{SessionConfig, SessionEngine, SessionEvent, SystemClock};

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

/// Command-line values that take precedence over the config file
pub struct Overrides {
    pub repetitions: Option<u32>,
    pub max_items: Option<usize>,
    pub rate: Option<f32>,
}

impl Overrides {
    fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(repetitions) = self.repetitions {
            config.repetitions_per_session = repetitions;
        }
        if let Some(max_items) = self.max_items {
            config.max_items_per_session = max_items;
        }
        if let Some(rate) = self.rate {
            config.speech_rate = rate;
        }
        config
    }
}

pub fn run(
    app: &App,
    overrides: Overrides,
    silent: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let config = overrides.apply(app.config.session.clone());

    let speech: Arc<dyn SpeechProvider> = if silent {
        Arc::new(SilentSpeech::new())
    } else {
        Arc::new(CommandSpeech::new(app.config.speech.clone()))
    };

    let items: HashMap<Uuid, VocabularyItem> = app.list_items()?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(async {
        let engine = SessionEngine::new(app.store.clone(), speech, Arc::new(SystemClock));
        let printer = EventPrinter { items: &items, format, use_color };
        drive(&engine, config, &printer).await
    });

    // A pending stdin read would otherwise block shutdown until the next Enter
    runtime.shutdown_background();
    result
}

/// Run one session to its end, relaying keyboard commands and Ctrl-C
async fn drive(engine: &SessionEngine, config: SessionConfig, printer: &EventPrinter<'_>) -> Result<()> {
    let mut events = engine.subscribe();
    engine.start(config).context("Failed to start session")?;

    if matches!(printer.format, OutputFormat::Plain) {
        println!("{}", terminal::paint("p + Enter pauses/resumes, q + Enter or Ctrl-C stops", Color::GRAY, printer.use_color));
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut failure: Option<String> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Dropped {} session events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                printer.print(&event)?;

                match event {
                    SessionEvent::SessionCompleted { .. } | SessionEvent::SessionStopped { .. } => break,
                    SessionEvent::PlaybackFailed { error, .. } => {
                        failure = Some(error);
                        engine.stop();
                    }
                    _ => {}
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match line.trim() {
                        "p" => {
                            if !engine.pause() {
                                engine.resume();
                            }
                        }
                        "q" => {
                            engine.stop();
                        }
                        "" => {}
                        other => log::debug!("Ignoring input '{}'", other),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        log::warn!("Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                engine.stop();
            }
        }
    }

    if let Some(error) = failure {
        bail!("Playback stopped because progress could not be saved: {}", error);
    }
    Ok(())
}

struct EventPrinter<'a> {
    items: &'a HashMap<Uuid, VocabularyItem>,
    format: &'a OutputFormat,
    use_color: bool,
}

impl EventPrinter<'_> {
    fn print(&self, event: &SessionEvent) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
            OutputFormat::Plain => {
                if let Some(line) = self.plain_line(event) {
                    println!("{}", line);
                }
            }
        }
        Ok(())
    }

    fn plain_line(&self, event: &SessionEvent) -> Option<String> {
        let c = self.use_color;
        match event {
            SessionEvent::SessionStarted { working_set_size, repetitions, .. } => Some(terminal::paint(
                &format!("Playing {} items, {} repetitions", working_set_size, repetitions),
                Color::BOLD,
                c,
            )),
            SessionEvent::ItemPlaybackStarted { item_id, word_index, repetition_index, .. } => {
                let (source, target) = self.items.get(item_id)
                    .map(|item| (item.source_text.as_str(), item.target_text.as_str()))
                    .unwrap_or(("?", "?"));
                Some(format!(
                    "{} {} = {}",
                    terminal::paint(&format!("[{}:{:>2}]", repetition_index + 1, word_index + 1), Color::GRAY, c),
                    source,
                    target,
                ))
            }
            SessionEvent::ItemPlaybackCompleted { learning_stage, stage_changed: true, .. } => Some(format!(
                "        {} {}",
                terminal::paint("->", Color::GRAY, c),
                terminal::render_stage(*learning_stage, c),
            )),
            SessionEvent::ItemPlaybackCompleted { .. } => None,
            SessionEvent::SessionPaused { .. } => Some(terminal::paint("Paused", Color::YELLOW, c)),
            SessionEvent::SessionResumed { .. } => Some(terminal::paint("Resumed", Color::YELLOW, c)),
            SessionEvent::PlaybackFailed { error, .. } => {
                Some(terminal::paint(&format!("Playback failed: {}", error), Color::RED, c))
            }
            SessionEvent::SessionCompleted { session } => Some(summary_line("Completed", session, c)),
            SessionEvent::SessionStopped { session } => Some(summary_line("Stopped", session, c)),
        }
    }
}

fn summary_line(label: &str, session: &Session, use_color: bool) -> String {
    format!(
        "{}: {} items played, {} repetitions",
        terminal::paint(label, Color::BOLD, use_color),
        session.item_ids_played.len(),
        session.repetitions_completed,
    )
}
