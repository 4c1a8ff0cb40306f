use std::path::Path;

use anyhow::{bail, Context, Result};

use lingodrill_lib::AppConfig;

use crate::OutputFormat;

pub fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Config already exists at {} (use --force to overwrite)", path.display());
    }

    AppConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn run_show(path: &Path, format: &OutputFormat) -> Result<()> {
    let config = AppConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Plain => {
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
