//! Application configuration (`config.toml`)
//!
//! ```toml
//! data_dir = "/home/me/vocab"   # optional
//!
//! [session]
//! repetitionsPerSession = 3
//! wordPauseMs = 1500
//! sourceVoice = "de"
//!
//! [speech]
//! program = "espeak-ng"
//! wordsPerMinute = 160
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionConfig;
use crate::speech::SpeechSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub session: SessionConfig,
    pub speech: SpeechSettings,
}

impl AppConfig {
    /// Default config path (`~/.config/lingodrill/config.toml` on Linux)
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("lingodrill").join("config.toml"))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Load the config at `path`, falling back to defaults if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.session.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
