use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use lingodrill_lib::vocabulary::{JsonVocabularyStore, VocabularyItem, VocabularyStore};
use lingodrill_lib::AppConfig;

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub store: Arc<JsonVocabularyStore>,
}

impl App {
    /// Load the config and open the vocabulary store
    ///
    /// Data directory precedence: `--data-dir`, then `data_dir` in the config,
    /// then the platform default.
    pub fn new(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_config_path(config_path)?;
        let config = AppConfig::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let data_dir = match (data_dir, &config.data_dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => JsonVocabularyStore::default_data_dir()
                .context("Failed to get data directory")?,
        };

        let store = JsonVocabularyStore::new(data_dir)
            .context("Failed to open vocabulary store")?;
        log::debug!("Using vocabulary store at {}", store.base_path().display());

        Ok(Self {
            config,
            config_path,
            store: Arc::new(store),
        })
    }

    pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => AppConfig::default_path().context("Failed to get config directory"),
        }
    }

    pub fn list_items(&self) -> Result<Vec<VocabularyItem>> {
        self.store.load_all().context("Failed to load vocabulary")
    }

    /// Find an item by id, id prefix, or source text (case-insensitive prefix match)
    pub fn find_item(&self, query: &str) -> Result<VocabularyItem> {
        let items = self.list_items()?;
        let query_lower = query.trim().to_lowercase();

        if query_lower.is_empty() {
            bail!("Empty item query");
        }

        // Exact id or exact source text first
        if let Some(item) = items.iter().find(|i| {
            i.id.to_string() == query_lower || i.source_text.to_lowercase() == query_lower
        }) {
            return Ok(item.clone());
        }

        // Prefix match
        let matches: Vec<&VocabularyItem> = items
            .iter()
            .filter(|i| {
                i.id.to_string().starts_with(&query_lower)
                    || i.source_text.to_lowercase().starts_with(&query_lower)
            })
            .collect();

        match matches.len() {
            0 => bail!("No vocabulary item matching '{}'", query),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous item '{}'. Matches:\n{}",
                query,
                matches
                    .iter()
                    .map(|i| format!("  - {} {} = {}", short_id(i), i.source_text, i.target_text))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }
}

/// First eight characters of an item id, enough to address it on the command line
pub fn short_id(item: &VocabularyItem) -> String {
    item.id.to_string()[..8].to_string()
}
