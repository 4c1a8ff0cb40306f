mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lingodrill-cli", about = "Vocabulary drills with spaced repetition and audio playback", version)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Add a vocabulary pair
    Add {
        /// Text in the language being learned
        source: String,
        /// Translation
        target: String,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// List vocabulary items
    List {
        /// Only items in this stage (new, passive, mastered, review)
        #[arg(long)]
        stage: Option<String>,
        /// Only items with this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// List items due for review
    Due,

    /// Grade a review of an item
    Review {
        /// Item id (or id prefix, or source text)
        item: String,
        /// 1 = again, 2 = hard, 3 = good, 4 = easy
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        rating: u8,
    },

    /// Reset an item to new
    Reset {
        /// Item id (or id prefix, or source text)
        item: String,
    },

    /// Show progress per learning stage
    Stats,

    /// Run a passive playback session
    Play {
        /// Passes over the working set (2-5)
        #[arg(long)]
        repetitions: Option<u32>,
        /// Items per session (10-25)
        #[arg(long)]
        max_items: Option<usize>,
        /// Speech rate multiplier (0.5-2.0)
        #[arg(long)]
        rate: Option<f32>,
        /// Don't call the speech program, just wait as long as speaking would take
        #[arg(long)]
        silent: bool,
    },

    /// List past playback sessions
    Sessions {
        /// Maximum sessions to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Configuration file helpers
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();

    let command = match cli.command {
        Command::Config(subcmd) => {
            let path = app::App::resolve_config_path(cli.config.as_deref())?;
            return match subcmd {
                ConfigCommand::Init { force } => commands::config::run_init(&path, force),
                ConfigCommand::Show => commands::config::run_show(&path, &cli.format),
            };
        }
        command => command,
    };

    let app = app::App::new(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match command {
        Command::Add { source, target, tags } => {
            commands::add::run(&app, &source, &target, tags.as_deref(), &cli.format)?;
        }
        Command::List { stage, tag } => {
            commands::list::run(&app, stage.as_deref(), tag.as_deref(), &cli.format, use_color)?;
        }
        Command::Due => {
            commands::due::run(&app, &cli.format, use_color)?;
        }
        Command::Review { item, rating } => {
            commands::review::run_review(&app, &item, rating, &cli.format)?;
        }
        Command::Reset { item } => {
            commands::review::run_reset(&app, &item, &cli.format)?;
        }
        Command::Stats => {
            commands::stats::run(&app, &cli.format, use_color)?;
        }
        Command::Play { repetitions, max_items, rate, silent } => {
            let overrides = commands::play::Overrides { repetitions, max_items, rate };
            commands::play::run(&app, overrides, silent, &cli.format, use_color)?;
        }
        Command::Sessions { limit } => {
            commands::sessions::run(&app, limit, &cli.format)?;
        }
        Command::Config(_) => {}
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
