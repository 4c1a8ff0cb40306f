//! Test doubles shared by the unit tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::session::Session;
use crate::speech::{self, SpeechError, SpeechProvider};
use crate::vocabulary::storage::{self, StoreError};
use crate::vocabulary::{MemoryVocabularyStore, VocabularyItem, VocabularyStore};

pub fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Records what it was asked to say; each utterance takes `delay`
pub struct ScriptedSpeech {
    delay: Duration,
    spoken: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    cancels: AtomicUsize,
}

impl ScriptedSpeech {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            spoken: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            cancels: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for ScriptedSpeech {
    async fn speak(&self, text: &str, _voice_hint: Option<&str>, _rate: f32) -> speech::Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.lock().unwrap().contains(text) {
            return Err(SpeechError::Failed(format!("cannot say '{}'", text)));
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory store whose item saves can be switched to fail
pub struct FlakyStore {
    inner: MemoryVocabularyStore,
    fail_saves: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: MemoryVocabularyStore) -> Self {
        Self {
            inner,
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl VocabularyStore for FlakyStore {
    fn load_all(&self) -> storage::Result<Vec<VocabularyItem>> {
        self.inner.load_all()
    }

    fn get(&self, id: Uuid) -> storage::Result<VocabularyItem> {
        self.inner.get(id)
    }

    fn insert(&self, item: VocabularyItem) -> storage::Result<VocabularyItem> {
        self.inner.insert(item)
    }

    fn save(&self, item: &VocabularyItem) -> storage::Result<VocabularyItem> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.save(item)
    }

    fn save_session(&self, session: &Session) -> storage::Result<()> {
        self.inner.save_session(session)
    }

    fn list_sessions(&self) -> storage::Result<Vec<Session>> {
        self.inner.list_sessions()
    }
}
