//! Storage for vocabulary items and finished sessions
//!
//! Directory structure:
//! ```text
//! {data-dir}/vocabulary/
//! ├── items/
//! │   └── {item-id}.json     # One file per vocabulary item
//! └── sessions/
//!     └── {session-id}.json  # Finished playback sessions
//! ```
//!
//! Every save is a compare-and-swap on the item's `version`, so a stale
//! read-modify-write fails with `VersionConflict` instead of silently
//! overwriting a newer change.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use super::models::VocabularyItem;
use crate::session::Session;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Item already exists: {0}")]
    ItemExists(Uuid),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Item {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict { id: Uuid, expected: u64, found: u64 },

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence contract used by the session engine and review operations
pub trait VocabularyStore: Send + Sync {
    /// All items, oldest first
    fn load_all(&self) -> Result<Vec<VocabularyItem>>;

    fn get(&self, id: Uuid) -> Result<VocabularyItem>;

    /// Add a new item. Returns it with its first version assigned.
    fn insert(&self, item: VocabularyItem) -> Result<VocabularyItem>;

    /// Replace an item if nobody saved it since `item` was read.
    /// Returns the stored item with its bumped version.
    fn save(&self, item: &VocabularyItem) -> Result<VocabularyItem>;

    fn save_session(&self, session: &Session) -> Result<()>;

    /// Finished sessions, most recent first
    fn list_sessions(&self) -> Result<Vec<Session>>;
}

fn sort_items(items: &mut [VocabularyItem]) {
    items.sort_by(|a, b| {
        a.schedule_state
            .created_at
            .cmp(&b.schedule_state.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn sort_sessions(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
}

fn check_version(stored: &VocabularyItem, incoming: &VocabularyItem) -> Result<()> {
    if stored.version != incoming.version {
        log::warn!(
            "Rejecting stale write for item {} (version {} != {})",
            incoming.id,
            incoming.version,
            stored.version
        );
        return Err(StoreError::VersionConflict {
            id: incoming.id,
            expected: incoming.version,
            found: stored.version,
        });
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// File-backed store, one JSON document per item
pub struct JsonVocabularyStore {
    base_path: PathBuf,
    /// Serializes every write so version checks and writes are atomic
    write_lock: Mutex<()>,
}

impl JsonVocabularyStore {
    /// Open (and create if needed) the store under `data_dir`
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let store = Self {
            base_path: data_dir.join("vocabulary"),
            write_lock: Mutex::new(()),
        };
        store.init()?;
        Ok(store)
    }

    /// Default data directory (`~/.local/share/lingodrill` on Linux)
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("lingodrill"))
            .ok_or(StoreError::DataDirNotFound)
    }

    fn init(&self) -> Result<()> {
        fs::create_dir_all(self.items_dir())?;
        fs::create_dir_all(self.sessions_dir())?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn items_dir(&self) -> PathBuf {
        self.base_path.join("items")
    }

    fn sessions_dir(&self) -> PathBuf {
        self.base_path.join("sessions")
    }

    fn item_path(&self, id: Uuid) -> PathBuf {
        self.items_dir().join(format!("{}.json", id))
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.sessions_dir().join(format!("{}.json", id))
    }

    fn read_item(&self, id: Uuid) -> Result<VocabularyItem> {
        let path = self.item_path(id);
        if !path.exists() {
            return Err(StoreError::ItemNotFound(id));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_item(&self, item: &VocabularyItem) -> Result<()> {
        fs::write(self.item_path(item.id), serde_json::to_string_pretty(item)?)?;
        Ok(())
    }

    fn read_dir_json<T: serde::de::DeserializeOwned>(&self, dir: &Path) -> Result<Vec<T>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut values = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                values.push(serde_json::from_str(&content)?);
            }
        }
        Ok(values)
    }
}

impl VocabularyStore for JsonVocabularyStore {
    fn load_all(&self) -> Result<Vec<VocabularyItem>> {
        let mut items: Vec<VocabularyItem> = self.read_dir_json(&self.items_dir())?;
        sort_items(&mut items);
        Ok(items)
    }

    fn get(&self, id: Uuid) -> Result<VocabularyItem> {
        self.read_item(id)
    }

    fn insert(&self, mut item: VocabularyItem) -> Result<VocabularyItem> {
        let _guard = lock(&self.write_lock);
        if self.item_path(item.id).exists() {
            return Err(StoreError::ItemExists(item.id));
        }
        item.version = 1;
        self.write_item(&item)?;
        Ok(item)
    }

    fn save(&self, item: &VocabularyItem) -> Result<VocabularyItem> {
        let _guard = lock(&self.write_lock);
        let stored = self.read_item(item.id)?;
        check_version(&stored, item)?;

        let mut updated = item.clone();
        updated.version = stored.version + 1;
        self.write_item(&updated)?;
        Ok(updated)
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        let _guard = lock(&self.write_lock);
        fs::write(
            self.session_path(session.id),
            serde_json::to_string_pretty(session)?,
        )?;
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.read_dir_json(&self.sessions_dir())?;
        sort_sessions(&mut sessions);
        Ok(sessions)
    }
}

/// Store kept entirely in memory, for embedding and tests
#[derive(Default)]
pub struct MemoryVocabularyStore {
    items: Mutex<HashMap<Uuid, VocabularyItem>>,
    sessions: Mutex<Vec<Session>>,
}

impl MemoryVocabularyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `items`
    pub fn with_items(items: impl IntoIterator<Item = VocabularyItem>) -> Result<Self> {
        let store = Self::new();
        for item in items {
            store.insert(item)?;
        }
        Ok(store)
    }
}

impl VocabularyStore for MemoryVocabularyStore {
    fn load_all(&self) -> Result<Vec<VocabularyItem>> {
        let mut items: Vec<VocabularyItem> = lock(&self.items).values().cloned().collect();
        sort_items(&mut items);
        Ok(items)
    }

    fn get(&self, id: Uuid) -> Result<VocabularyItem> {
        lock(&self.items)
            .get(&id)
            .cloned()
            .ok_or(StoreError::ItemNotFound(id))
    }

    fn insert(&self, mut item: VocabularyItem) -> Result<VocabularyItem> {
        let mut items = lock(&self.items);
        if items.contains_key(&item.id) {
            return Err(StoreError::ItemExists(item.id));
        }
        item.version = 1;
        items.insert(item.id, item.clone());
        Ok(item)
    }

    fn save(&self, item: &VocabularyItem) -> Result<VocabularyItem> {
        let mut items = lock(&self.items);
        let stored = items.get(&item.id).ok_or(StoreError::ItemNotFound(item.id))?;
        check_version(stored, item)?;

        let mut updated = item.clone();
        updated.version = stored.version + 1;
        items.insert(updated.id, updated.clone());
        Ok(updated)
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        let mut sessions = lock(&self.sessions);
        sessions.retain(|s| s.id != session.id);
        sessions.push(session.clone());
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = lock(&self.sessions).clone();
        sort_sessions(&mut sessions);
        Ok(sessions)
    }
}
