//! Session Engine
//!
//! Plays a bounded working set of vocabulary items in timed audio cycles.
//! Each item plays as four steps (source text, short pause, target text,
//! longer pause); every fully played item gets one more exposure and may move
//! to the next learning stage.
//!
//! Playback runs in a spawned tokio task. `pause` and `stop` cancel that task
//! at whatever step it is suspended in and cancel the speech backend, so the
//! in-flight utterance is cut off rather than waited for. All bookkeeping
//! happens under the engine lock, never across an await point.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::events::SessionEvent;
use super::models::{EngineState, Progress, Session, SessionConfig};
use crate::clock::Clock;
use crate::scheduler::{self, LearningStage, ScheduleState};
use crate::speech::{SpeechError, SpeechProvider};
use crate::vocabulary::{self, ProgressSummary, StoreError, VocabularyItem, VocabularyStore};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A session is already active")]
    SessionAlreadyActive,

    #[error("No eligible items to play")]
    NoEligibleItems,

    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Pick the items a session will play.
///
/// Items still in `NEW` or `PASSIVE_LEARNING` are preferred. If there are
/// none, every item is eligible. Either way the set is capped at `max_items`.
pub fn select_working_set(items: Vec<VocabularyItem>, max_items: usize) -> Vec<VocabularyItem> {
    let total = items.len();
    let (mut eligible, rest): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.stage().is_session_eligible());

    if eligible.is_empty() {
        log::info!("No new or learning items among {}, using the whole collection", total);
        eligible = rest;
    }

    eligible.truncate(max_items);
    eligible
}

/// Record one completed playback on a schedule.
///
/// Returns true when the learning stage changed.
pub fn apply_exposure(state: &mut ScheduleState, exposures_before_mastery: u32, now: DateTime<Utc>) -> bool {
    let before = state.learning_stage;
    state.exposure_count += 1;

    if before.is_session_eligible() && state.exposure_count >= exposures_before_mastery {
        *state = scheduler::graduate(state, now);
    } else if before == LearningStage::New {
        state.learning_stage = LearningStage::PassiveLearning;
    }

    state.last_session_at = Some(now);
    state.updated_at = now;
    state.learning_stage != before
}

/// The session in progress and its playback cursor
struct ActiveRun {
    session: Session,
    config: SessionConfig,
    working_set: Vec<VocabularyItem>,
    word_index: usize,
    repetition_index: u32,
    /// Cancelled on pause/stop; replaced on resume
    cancel: CancellationToken,
}

impl ActiveRun {
    fn progress(&self, state: EngineState) -> Progress {
        Progress {
            state,
            word_index: self.word_index,
            repetition_index: self.repetition_index,
            working_set_size: self.working_set.len(),
            repetitions_per_session: self.config.repetitions_per_session,
        }
    }
}

#[derive(Default)]
struct EngineInner {
    state: EngineState,
    run: Option<ActiveRun>,
}

/// Everything one item's four playback steps need
struct PlannedItem {
    item_id: Uuid,
    source_text: String,
    target_text: String,
    source_voice: Option<String>,
    target_voice: Option<String>,
    rate: f32,
    word_pause: std::time::Duration,
    inter_word_pause: std::time::Duration,
}

enum StepOutcome {
    Continue,
    Halt,
}

struct Shared {
    store: Arc<dyn VocabularyStore>,
    speech: Arc<dyn SpeechProvider>,
    clock: Arc<dyn Clock>,
    inner: Mutex<EngineInner>,
    events: broadcast::Sender<SessionEvent>,
    state_tx: watch::Sender<EngineState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_state(&self, inner: &mut EngineInner, state: EngineState) {
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    fn persist_session(&self, session: &Session) {
        if let Err(e) = self.store.save_session(session) {
            log::error!("Failed to save session {}: {}", session.id, e);
        }
    }

    /// Announce the item under the cursor and describe how to play it
    fn begin_item(&self, token: &CancellationToken) -> Option<PlannedItem> {
        let inner = self.lock();
        if token.is_cancelled() || inner.state != EngineState::Active {
            return None;
        }
        let run = inner.run.as_ref()?;
        let item = run.working_set.get(run.word_index)?;

        self.emit(SessionEvent::ItemPlaybackStarted {
            session_id: run.session.id,
            item_id: item.id,
            word_index: run.word_index,
            repetition_index: run.repetition_index,
        });

        Some(PlannedItem {
            item_id: item.id,
            source_text: item.source_text.clone(),
            target_text: item.target_text.clone(),
            source_voice: run.config.source_voice.clone(),
            target_voice: run.config.target_voice.clone(),
            rate: run.config.speech_rate,
            word_pause: run.config.word_pause(),
            inter_word_pause: run.config.inter_word_pause(),
        })
    }

    async fn speak(&self, text: &str, voice: Option<&str>, rate: f32) {
        match self.speech.speak(text, voice, rate).await {
            Ok(()) | Err(SpeechError::Cancelled) => {}
            Err(e) => log::warn!("Speech failed for '{}', continuing: {}", text, e),
        }
    }

    async fn play_item(&self, planned: &PlannedItem) {
        self.speak(&planned.source_text, planned.source_voice.as_deref(), planned.rate)
            .await;
        tokio::time::sleep(planned.word_pause).await;
        self.speak(&planned.target_text, planned.target_voice.as_deref(), planned.rate)
            .await;
        tokio::time::sleep(planned.inter_word_pause).await;
    }

    /// Count the exposure, record the item and move the cursor
    fn complete_item(&self, token: &CancellationToken, planned: &PlannedItem) -> StepOutcome {
        let mut inner = self.lock();
        // A pause may have landed between the last step and this lock
        if token.is_cancelled() || inner.state != EngineState::Active {
            return StepOutcome::Halt;
        }
        let Some(run) = inner.run.as_mut() else {
            return StepOutcome::Halt;
        };

        let now = self.clock.now();
        let threshold = run.config.exposures_before_mastery;
        let session_id = run.session.id;

        // The save runs under the engine lock so a pause or stop cannot land
        // between persisting the exposure and moving the cursor. It is one
        // small file write, so callers of pause/stop wait at most that long.
        let mut stage_changed = false;
        let updated = vocabulary::update_item(self.store.as_ref(), planned.item_id, |item| {
            stage_changed = apply_exposure(&mut item.schedule_state, threshold, now);
        });

        match updated {
            Ok(item) => {
                if item.stage() == LearningStage::Mastered && stage_changed {
                    log::info!("Item {} mastered after {} exposures", item.id, item.schedule_state.exposure_count);
                }

                run.session.record_played(item.id);
                self.emit(SessionEvent::ItemPlaybackCompleted {
                    session_id,
                    item_id: item.id,
                    exposure_count: item.schedule_state.exposure_count,
                    learning_stage: item.stage(),
                    stage_changed,
                });
                run.working_set[run.word_index] = item;
            }
            Err(StoreError::ItemNotFound(id)) => {
                log::warn!("Item {} disappeared from the store, skipping it", id);
            }
            Err(e) => {
                log::error!("Failed to save item {}: {}", planned.item_id, e);
                self.emit(SessionEvent::PlaybackFailed {
                    session_id,
                    item_id: planned.item_id,
                    error: e.to_string(),
                });
                run.cancel.cancel();
                self.emit(SessionEvent::SessionPaused {
                    session_id,
                    word_index: run.word_index,
                    repetition_index: run.repetition_index,
                });
                self.set_state(&mut inner, EngineState::Paused);
                return StepOutcome::Halt;
            }
        }

        run.word_index += 1;
        if run.word_index >= run.working_set.len() {
            run.word_index = 0;
            run.repetition_index += 1;
            run.session.repetitions_completed = run.repetition_index;
        }

        if run.repetition_index < run.config.repetitions_per_session {
            return StepOutcome::Continue;
        }

        let Some(mut run) = inner.run.take() else {
            return StepOutcome::Halt;
        };
        run.session.finish(now, true);
        log::info!(
            "Session {} completed: {} items, {} repetitions",
            run.session.id,
            run.session.item_ids_played.len(),
            run.session.repetitions_completed
        );
        self.persist_session(&run.session);
        self.set_state(&mut inner, EngineState::Idle);
        self.emit(SessionEvent::SessionCompleted { session: run.session });
        StepOutcome::Halt
    }
}

async fn playback_loop(shared: Arc<Shared>, token: CancellationToken) {
    loop {
        let Some(planned) = shared.begin_item(&token) else {
            return;
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = shared.play_item(&planned) => {}
        }

        match shared.complete_item(&token, &planned) {
            StepOutcome::Continue => {}
            StepOutcome::Halt => return,
        }
    }
}

/// Drives passive playback sessions; at most one session at a time
pub struct SessionEngine {
    shared: Arc<Shared>,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn VocabularyStore>,
        speech: Arc<dyn SpeechProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, _) = watch::channel(EngineState::Idle);
        Self {
            shared: Arc::new(Shared {
                store,
                speech,
                clock,
                inner: Mutex::new(EngineInner::default()),
                events,
                state_tx,
            }),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> EngineState {
        self.shared.lock().state
    }

    /// Start a new session and begin playing its first item.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, config: SessionConfig) -> Result<Session> {
        config.validate().map_err(SessionError::InvalidConfig)?;

        let mut inner = self.shared.lock();
        if inner.state != EngineState::Idle {
            return Err(SessionError::SessionAlreadyActive);
        }

        let items = self.shared.store.load_all()?;
        let working_set = select_working_set(items, config.max_items_per_session);
        if working_set.is_empty() {
            return Err(SessionError::NoEligibleItems);
        }

        let session = Session::new(self.shared.clock.now());
        let token = CancellationToken::new();
        log::info!(
            "Starting session {} with {} items x {} repetitions",
            session.id,
            working_set.len(),
            config.repetitions_per_session
        );

        self.shared.emit(SessionEvent::SessionStarted {
            session_id: session.id,
            working_set_size: working_set.len(),
            repetitions: config.repetitions_per_session,
        });
        inner.run = Some(ActiveRun {
            session: session.clone(),
            config,
            working_set,
            word_index: 0,
            repetition_index: 0,
            cancel: token.clone(),
        });
        self.shared.set_state(&mut inner, EngineState::Active);
        drop(inner);

        tokio::spawn(playback_loop(Arc::clone(&self.shared), token));
        Ok(session)
    }

    /// Pause playback, cutting off the current utterance.
    ///
    /// Returns false (and does nothing) unless a session is playing.
    pub fn pause(&self) -> bool {
        let mut inner = self.shared.lock();
        if inner.state != EngineState::Active {
            return false;
        }
        let Some(run) = inner.run.as_ref() else {
            return false;
        };

        run.cancel.cancel();
        self.shared.speech.cancel();
        log::info!("Session {} paused at item {}", run.session.id, run.word_index);
        self.shared.emit(SessionEvent::SessionPaused {
            session_id: run.session.id,
            word_index: run.word_index,
            repetition_index: run.repetition_index,
        });
        self.shared.set_state(&mut inner, EngineState::Paused);
        true
    }

    /// Resume a paused session. The current item replays from its first step.
    ///
    /// Returns false (and does nothing) unless a session is paused.
    pub fn resume(&self) -> bool {
        let mut inner = self.shared.lock();
        if inner.state != EngineState::Paused {
            return false;
        }
        let Some(run) = inner.run.as_mut() else {
            return false;
        };

        let token = CancellationToken::new();
        run.cancel = token.clone();
        log::info!("Session {} resumed at item {}", run.session.id, run.word_index);
        self.shared.emit(SessionEvent::SessionResumed {
            session_id: run.session.id,
            word_index: run.word_index,
            repetition_index: run.repetition_index,
        });
        self.shared.set_state(&mut inner, EngineState::Active);
        drop(inner);

        tokio::spawn(playback_loop(Arc::clone(&self.shared), token));
        true
    }

    /// Stop the session early and return its finalized record.
    ///
    /// Returns `None` if no session is active or paused.
    pub fn stop(&self) -> Option<Session> {
        let mut inner = self.shared.lock();
        if inner.state == EngineState::Idle {
            return None;
        }
        let mut run = inner.run.take()?;

        run.cancel.cancel();
        self.shared.speech.cancel();
        run.session.finish(self.shared.clock.now(), false);
        log::info!(
            "Session {} stopped after {} items",
            run.session.id,
            run.session.item_ids_played.len()
        );

        self.shared.persist_session(&run.session);
        self.shared.set_state(&mut inner, EngineState::Idle);
        self.shared.emit(SessionEvent::SessionStopped {
            session: run.session.clone(),
        });
        Some(run.session)
    }

    /// Playback cursor. All zeros while idle.
    pub fn get_progress(&self) -> Progress {
        let inner = self.shared.lock();
        match inner.run.as_ref() {
            Some(run) => run.progress(inner.state),
            None => Progress {
                state: inner.state,
                word_index: 0,
                repetition_index: 0,
                working_set_size: 0,
                repetitions_per_session: 0,
            },
        }
    }

    /// Snapshot of the session in progress
    pub fn current_session(&self) -> Option<Session> {
        self.shared.lock().run.as_ref().map(|run| run.session.clone())
    }

    /// Item counts per learning stage across the whole collection
    pub fn get_progress_summary(&self) -> Result<ProgressSummary> {
        let items = self.shared.store.load_all()?;
        Ok(vocabulary::progress_summary(&items, self.shared.clock.now()))
    }

    /// Wait until no session is active or paused
    pub async fn wait_until_idle(&self) {
        let mut rx = self.shared.state_tx.subscribe();
        let _ = rx.wait_for(|state| *state == EngineState::Idle).await;
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        let inner = self.shared.lock();
        if let Some(run) = inner.run.as_ref() {
            run.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::testing::{t0, FlakyStore, ManualClock, ScriptedSpeech};
    use crate::vocabulary::{MemoryVocabularyStore, VocabularyStore};

    struct Harness {
        engine: SessionEngine,
        store: Arc<FlakyStore>,
        speech: Arc<ScriptedSpeech>,
        clock: Arc<ManualClock>,
    }

    fn harness(items: Vec<VocabularyItem>, utterance: Duration) -> Harness {
        let store = Arc::new(FlakyStore::new(MemoryVocabularyStore::with_items(items).unwrap()));
        let speech = Arc::new(ScriptedSpeech::new(utterance));
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = SessionEngine::new(store.clone(), speech.clone(), clock.clone());
        Harness { engine, store, speech, clock }
    }

    fn items(pairs: &[(&str, &str)]) -> Vec<VocabularyItem> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (source, target))| {
                VocabularyItem::new(
                    source.to_string(),
                    target.to_string(),
                    t0() + ChronoDuration::seconds(i as i64),
                )
            })
            .collect()
    }

    fn config(repetitions: u32) -> SessionConfig {
        SessionConfig {
            repetitions_per_session: repetitions,
            word_pause_ms: 500,
            inter_word_pause_ms: 500,
            max_items_per_session: 10,
            ..Default::default()
        }
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn with_stage(mut item: VocabularyItem, stage: LearningStage, exposures: u32) -> VocabularyItem {
        item.schedule_state.learning_stage = stage;
        item.schedule_state.exposure_count = exposures;
        item
    }

    #[test]
    fn test_working_set_excludes_graduated_items() {
        let all = vec![
            with_stage(items(&[("a", "1")]).remove(0), LearningStage::Mastered, 5),
            with_stage(items(&[("b", "2")]).remove(0), LearningStage::New, 0),
            with_stage(items(&[("c", "3")]).remove(0), LearningStage::LongTermReview, 5),
            with_stage(items(&[("d", "4")]).remove(0), LearningStage::PassiveLearning, 2),
        ];

        let selected = select_working_set(all, 10);
        let sources: Vec<&str> = selected.iter().map(|i| i.source_text.as_str()).collect();
        assert_eq!(sources, vec!["b", "d"]);
    }

    #[test]
    fn test_working_set_falls_back_and_truncates() {
        let mastered: Vec<VocabularyItem> = items(&[("a", "1"), ("b", "2"), ("c", "3")])
            .into_iter()
            .map(|i| with_stage(i, LearningStage::Mastered, 5))
            .collect();
        assert_eq!(select_working_set(mastered, 2).len(), 2);

        let fresh = items(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let selected = select_working_set(fresh, 2);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].source_text, "a");

        assert!(select_working_set(Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_apply_exposure_promotes_new_items() {
        let mut state = scheduler::create_initial(t0());
        assert!(apply_exposure(&mut state, 5, t0()));
        assert_eq!(state.learning_stage, LearningStage::PassiveLearning);
        assert_eq!(state.exposure_count, 1);
        assert_eq!(state.last_session_at, Some(t0()));

        assert!(!apply_exposure(&mut state, 5, t0()));
        assert_eq!(state.learning_stage, LearningStage::PassiveLearning);
    }

    #[test]
    fn test_apply_exposure_graduates_at_threshold() {
        let now = t0() + ChronoDuration::days(2);
        let mut state = scheduler::create_initial(t0());
        state.learning_stage = LearningStage::PassiveLearning;
        state.exposure_count = 4;
        state.repetition_count = 3;
        state.interval_days = 20;

        assert!(apply_exposure(&mut state, 5, now));
        assert_eq!(state.learning_stage, LearningStage::Mastered);
        assert_eq!(state.mastered_at, Some(now));
        assert_eq!(state.repetition_count, 0);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.next_review_at, now + ChronoDuration::days(1));

        // Already mastered items only count exposures
        let later = now + ChronoDuration::hours(1);
        assert!(!apply_exposure(&mut state, 5, later));
        assert_eq!(state.exposure_count, 6);
        assert_eq!(state.mastered_at, Some(now));
    }

    #[test]
    fn test_apply_exposure_threshold_of_one_skips_passive_stage() {
        let mut state = scheduler::create_initial(t0());
        assert!(apply_exposure(&mut state, 1, t0()));
        assert_eq!(state.learning_stage, LearningStage::Mastered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_items_fails() {
        let h = harness(Vec::new(), Duration::ZERO);
        let result = h.engine.start(config(2));
        assert!(matches!(result, Err(SessionError::NoEligibleItems)));
        assert_eq!(h.engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejects_invalid_config() {
        let h = harness(items(&[("hund", "dog")]), Duration::ZERO);
        let result = h.engine.start(SessionConfig {
            repetitions_per_session: 9,
            ..Default::default()
        });
        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
        assert_eq!(h.engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_runs_to_completion() {
        let h = harness(items(&[("hund", "dog"), ("katze", "cat")]), Duration::from_millis(100));
        let mut rx = h.engine.subscribe();

        let session = h.engine.start(config(2)).unwrap();
        h.engine.wait_until_idle().await;

        assert_eq!(
            h.speech.spoken(),
            vec!["hund", "dog", "katze", "cat", "hund", "dog", "katze", "cat"]
        );

        let stored = h.store.load_all().unwrap();
        for item in &stored {
            assert_eq!(item.schedule_state.exposure_count, 2);
            assert_eq!(item.stage(), LearningStage::PassiveLearning);
            assert_eq!(item.schedule_state.last_session_at, Some(t0()));
        }

        let sessions = h.store.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        let finished = &sessions[0];
        assert_eq!(finished.id, session.id);
        assert!(finished.completed_normally);
        assert_eq!(finished.ended_at, Some(t0()));
        assert_eq!(finished.repetitions_completed, 2);
        assert_eq!(finished.item_ids_played, vec![stored[0].id, stored[1].id]);

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(SessionEvent::SessionStarted { working_set_size: 2, .. })));
        assert!(matches!(events.last(), Some(SessionEvent::SessionCompleted { .. })));
        let started = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::ItemPlaybackStarted { .. }))
            .count();
        let completed = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::ItemPlaybackCompleted { .. }))
            .count();
        assert_eq!(started, 4);
        assert_eq!(completed, 4);

        assert_eq!(h.engine.state(), EngineState::Idle);
        assert_eq!(h.engine.get_progress().working_set_size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_graduates_and_leaves_working_set() {
        let mut pairs = items(&[("hund", "dog"), ("katze", "cat")]);
        pairs[0] = with_stage(pairs[0].clone(), LearningStage::PassiveLearning, 4);
        let graduating = pairs[0].id;
        let h = harness(pairs, Duration::ZERO);
        let mut rx = h.engine.subscribe();

        h.engine.start(config(2)).unwrap();
        h.engine.wait_until_idle().await;

        let item = h.store.get(graduating).unwrap();
        let state = &item.schedule_state;
        assert_eq!(state.learning_stage, LearningStage::Mastered);
        assert_eq!(state.repetition_count, 0);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.mastered_at, Some(t0()));
        assert_eq!(state.next_review_at, t0() + ChronoDuration::days(1));

        let promoted = drain(&mut rx).into_iter().any(|e| {
            matches!(
                e,
                SessionEvent::ItemPlaybackCompleted {
                    item_id,
                    learning_stage: LearningStage::Mastered,
                    stage_changed: true,
                    ..
                } if item_id == graduating
            )
        });
        assert!(promoted);

        h.engine.start(config(2)).unwrap();
        let progress = h.engine.get_progress();
        assert_eq!(progress.working_set_size, 1);
        let session = h.engine.stop().unwrap();
        assert!(!session.item_ids_played.contains(&graduating));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_active_or_paused_is_rejected() {
        let h = harness(items(&[("hund", "dog"), ("katze", "cat")]), Duration::from_millis(1000));

        let session = h.engine.start(config(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        let before = h.engine.get_progress();
        assert_eq!(before.word_index, 1);

        assert!(matches!(h.engine.start(config(2)), Err(SessionError::SessionAlreadyActive)));
        assert_eq!(h.engine.get_progress(), before);
        assert_eq!(h.engine.current_session().unwrap().id, session.id);

        assert!(h.engine.pause());
        assert!(matches!(h.engine.start(config(2)), Err(SessionError::SessionAlreadyActive)));
        assert_eq!(h.engine.get_progress().word_index, 1);
        assert_eq!(h.engine.state(), EngineState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_restart_current_item() {
        let h = harness(items(&[("hund", "dog"), ("katze", "cat")]), Duration::from_millis(1000));
        let mut rx = h.engine.subscribe();

        h.engine.start(config(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(1700)).await;
        assert_eq!(h.speech.spoken(), vec!["hund", "dog"]);

        assert!(h.engine.pause());
        assert_eq!(h.speech.cancel_count(), 1);
        assert!(!h.engine.pause());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.speech.spoken(), vec!["hund", "dog"]);
        let progress = h.engine.get_progress();
        assert_eq!((progress.word_index, progress.repetition_index), (0, 0));
        assert_eq!(progress.state, EngineState::Paused);
        assert_eq!(h.store.load_all().unwrap()[0].schedule_state.exposure_count, 0);

        assert!(h.engine.resume());
        assert!(!h.engine.resume());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.speech.spoken(), vec!["hund", "dog", "hund"]);
        let progress = h.engine.get_progress();
        assert_eq!((progress.word_index, progress.repetition_index), (0, 0));

        h.engine.wait_until_idle().await;
        let stored = h.store.load_all().unwrap();
        assert!(stored.iter().all(|i| i.schedule_state.exposure_count == 2));

        let events = drain(&mut rx);
        let paused = events.iter().position(|e| matches!(e, SessionEvent::SessionPaused { .. }));
        let resumed = events.iter().position(|e| matches!(e, SessionEvent::SessionResumed { .. }));
        assert!(paused.unwrap() < resumed.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_finalizes_session() {
        let h = harness(items(&[("hund", "dog"), ("katze", "cat")]), Duration::from_millis(1000));

        h.engine.start(config(3)).unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;

        h.clock.advance(ChronoDuration::minutes(2));
        let session = h.engine.stop().unwrap();
        assert!(!session.completed_normally);
        assert_eq!(session.ended_at, Some(t0() + ChronoDuration::minutes(2)));
        assert_eq!(session.item_ids_played.len(), 1);
        assert_eq!(h.engine.state(), EngineState::Idle);
        assert!(h.speech.cancel_count() >= 1);

        let sessions = h.store.list_sessions().unwrap();
        assert_eq!(sessions, vec![session]);

        // Completed items keep their exposure, the interrupted one does not
        let stored = h.store.load_all().unwrap();
        assert_eq!(stored[0].schedule_state.exposure_count, 1);
        assert_eq!(stored[1].schedule_state.exposure_count, 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.store.load_all().unwrap(), stored);

        assert!(h.engine.stop().is_none());
        assert!(!h.engine.pause());
        assert!(!h.engine.resume());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_paused() {
        let h = harness(items(&[("hund", "dog")]), Duration::from_millis(1000));
        h.engine.start(config(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(h.engine.pause());
        let session = h.engine.stop().unwrap();
        assert!(!session.completed_normally);
        assert!(session.item_ids_played.is_empty());
        assert_eq!(h.engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speech_failure_does_not_block_session() {
        let h = harness(items(&[("hund", "dog"), ("katze", "cat")]), Duration::ZERO);
        h.speech.fail_on("dog");

        h.engine.start(config(2)).unwrap();
        h.engine.wait_until_idle().await;

        let stored = h.store.load_all().unwrap();
        assert!(stored.iter().all(|i| i.schedule_state.exposure_count == 2));
        assert!(h.store.list_sessions().unwrap()[0].completed_normally);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_pauses_without_advancing() {
        let h = harness(items(&[("hund", "dog"), ("katze", "cat")]), Duration::ZERO);
        let mut rx = h.engine.subscribe();
        h.store.fail_saves(true);

        h.engine.start(config(2)).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.engine.state(), EngineState::Paused);
        let progress = h.engine.get_progress();
        assert_eq!((progress.word_index, progress.repetition_index), (0, 0));
        assert!(h.engine.current_session().unwrap().item_ids_played.is_empty());
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SessionEvent::PlaybackFailed { .. })));

        h.store.fail_saves(false);
        assert!(h.engine.resume());
        h.engine.wait_until_idle().await;

        let stored = h.store.load_all().unwrap();
        assert!(stored.iter().all(|i| i.schedule_state.exposure_count == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_review_is_not_overwritten() {
        let h = harness(items(&[("hund", "dog"), ("katze", "cat")]), Duration::from_millis(1000));
        let first = h.store.load_all().unwrap()[0].id;

        h.engine.start(config(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Manual review while the item is playing
        vocabulary::review_item(h.store.as_ref(), first, 5, t0()).unwrap();

        h.engine.wait_until_idle().await;
        let item = h.store.get(first).unwrap();
        assert_eq!(item.schedule_state.repetition_count, 1);
        assert_eq!(item.schedule_state.last_reviewed_at, Some(t0()));
        assert_eq!(item.schedule_state.exposure_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_session_only_counts_exposures() {
        let reviewed_at = t0() - ChronoDuration::days(3);
        let pairs: Vec<VocabularyItem> = items(&[("hund", "dog"), ("katze", "cat")])
            .into_iter()
            .zip([LearningStage::Mastered, LearningStage::LongTermReview])
            .map(|(item, stage)| {
                let mut item = with_stage(item, stage, 5);
                item.schedule_state.mastered_at = Some(reviewed_at);
                item.schedule_state.interval_days = 6;
                item.schedule_state.next_review_at = reviewed_at + ChronoDuration::days(6);
                item
            })
            .collect();
        let before = pairs.clone();
        let h = harness(pairs, Duration::ZERO);
        let mut rx = h.engine.subscribe();

        let session = h.engine.start(config(2)).unwrap();
        h.engine.wait_until_idle().await;

        for original in &before {
            let stored = h.store.get(original.id).unwrap();
            let state = &stored.schedule_state;
            assert_eq!(state.exposure_count, 7);
            assert_eq!(state.learning_stage, original.stage());
            assert_eq!(state.mastered_at, Some(reviewed_at));
            assert_eq!(state.next_review_at, original.schedule_state.next_review_at);
            assert_eq!(state.interval_days, 6);
            assert_eq!(state.last_session_at, Some(t0()));
        }

        let finished = &h.store.list_sessions().unwrap()[0];
        assert_eq!(finished.id, session.id);
        assert!(finished.completed_normally);

        assert!(drain(&mut rx).iter().all(|e| !matches!(
            e,
            SessionEvent::ItemPlaybackCompleted { stage_changed: true, .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_summary_counts_stages() {
        let mut pairs = items(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);
        pairs[1] = with_stage(pairs[1].clone(), LearningStage::PassiveLearning, 2);
        pairs[2] = with_stage(pairs[2].clone(), LearningStage::Mastered, 5);
        pairs[3] = with_stage(pairs[3].clone(), LearningStage::LongTermReview, 5);
        let h = harness(pairs, Duration::ZERO);

        let summary = h.engine.get_progress_summary().unwrap();
        assert_eq!(summary.total_items, 4);
        assert_eq!(summary.new_items, 1);
        assert_eq!(summary.passive_learning_items, 1);
        assert_eq!(summary.mastered_items, 1);
        assert_eq!(summary.long_term_review_items, 1);
    }
}
