//! Whisper lifecycle - issue, answer, skip, burn, and the lockout after a skip
//!
//! Lock status is never a live countdown: it is derived from the persisted
//! lockout end time and the clock, so it survives suspension and restarts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::catalog::{catalog, Whisper, WhisperCategory};
use super::CategoryLookup;
use crate::error::{EngineError, EngineResult};
use crate::herald::{EngineEvent, Herald};
use crate::logos::selector::ChoiceSource;
use crate::totems::vault::{LOCKOUT_KEY, WHISPER_STATE_KEY};
use crate::totems::{Clock, Vault};

pub const DEFAULT_LOCKOUT_HOURS: i64 = 6;

/// Persisted whisper log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhisperState {
    #[serde(default)]
    pub current: Option<Whisper>,
    #[serde(default)]
    pub answered: Vec<Whisper>,
    #[serde(default)]
    pub skipped: Vec<Whisper>,
}

impl WhisperState {
    fn is_consumed(&self, id: &str) -> bool {
        self.answered.iter().any(|w| w.id == id) || self.skipped.iter().any(|w| w.id == id)
    }
}

/// Persisted lockout end time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LockoutState {
    pub lockout_end: Option<DateTime<Utc>>,
}

pub struct WhisperEngine {
    state: WhisperState,
    lockout: LockoutState,
    lockout_duration: Duration,
    catalog: Vec<Whisper>,
    vault: Vault,
    clock: Arc<dyn Clock>,
    choice: Arc<dyn ChoiceSource>,
    herald: Herald,
}

impl WhisperEngine {
    /// Restores whisper and lockout state, then runs the lockout check
    pub fn load(
        vault: Vault,
        clock: Arc<dyn Clock>,
        choice: Arc<dyn ChoiceSource>,
        herald: Herald,
    ) -> EngineResult<Self> {
        let state = vault
            .load::<WhisperState>(WHISPER_STATE_KEY)
            .map_err(|e| EngineError::persistence(WHISPER_STATE_KEY, e))?
            .unwrap_or_default();
        let lockout = vault
            .load::<LockoutState>(LOCKOUT_KEY)
            .map_err(|e| EngineError::persistence(LOCKOUT_KEY, e))?
            .unwrap_or_default();

        debug!(
            "Whisper state restored: {} answered, {} skipped, lockout {:?}",
            state.answered.len(),
            state.skipped.len(),
            lockout.lockout_end
        );

        let mut engine = Self {
            state,
            lockout,
            lockout_duration: Duration::hours(DEFAULT_LOCKOUT_HOURS),
            catalog: catalog(),
            vault,
            clock,
            choice,
            herald,
        };
        engine.refresh_lockout()?;
        Ok(engine)
    }

    pub fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = duration;
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<Whisper>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn current_whisper(&self) -> Option<&Whisper> {
        self.state.current.as_ref()
    }

    pub fn answered_whispers(&self) -> &[Whisper] {
        &self.state.answered
    }

    pub fn skipped_whispers(&self) -> &[Whisper] {
        &self.state.skipped
    }

    pub fn state(&self) -> &WhisperState {
        &self.state
    }

    pub fn lockout_end_time(&self) -> Option<DateTime<Utc>> {
        self.lockout.lockout_end
    }

    pub fn is_locked(&self) -> bool {
        self.lockout
            .lockout_end
            .map(|end| self.clock.now() < end)
            .unwrap_or(false)
    }

    /// Time left until the lockout ends, `None` when not locked
    pub fn lockout_remaining(&self) -> Option<Duration> {
        let end = self.lockout.lockout_end?;
        let remaining = end - self.clock.now();
        (remaining > Duration::zero()).then_some(remaining)
    }

    pub fn format_lockout_remaining(&self) -> Option<String> {
        self.lockout_remaining().map(|remaining| {
            let minutes = remaining.num_minutes();
            format!("{}h {}m", minutes / 60, minutes % 60)
        })
    }

    /// Clears an expired lockout and persists the clear
    pub fn refresh_lockout(&mut self) -> EngineResult<bool> {
        let Some(end) = self.lockout.lockout_end else {
            return Ok(false);
        };
        if self.clock.now() < end {
            return Ok(true);
        }

        let previous = self.lockout;
        self.lockout.lockout_end = None;
        if let Err(source) = self.vault.save(LOCKOUT_KEY, &self.lockout) {
            warn!("Failed to persist lockout clear: {}", source);
            self.lockout = previous;
            return Err(EngineError::persistence(LOCKOUT_KEY, source));
        }

        info!("Lockout expired at {}, whispers resume", end);
        self.herald.publish(EngineEvent::LockoutCleared);
        Ok(false)
    }

    /// Catalog entries not yet answered or skipped
    pub fn available_whispers(&self) -> Vec<&Whisper> {
        self.catalog
            .iter()
            .filter(|w| !self.state.is_consumed(&w.id))
            .collect()
    }

    pub fn pending_whispers_count(&self) -> usize {
        self.available_whispers().len()
    }

    /// Issues a uniformly random eligible whisper; does nothing while locked
    pub fn generate_new_whisper(&mut self) -> EngineResult<Option<&Whisper>> {
        if self.refresh_lockout()? {
            debug!("generate_new_whisper ignored: locked");
            return Ok(None);
        }

        let available = self.available_whispers();
        if available.is_empty() {
            debug!("No eligible whispers left in the catalog");
            return Ok(None);
        }
        let next = available[self.choice.pick(available.len())].clone();

        self.issue(next)?;
        Ok(self.state.current.as_ref())
    }

    /// Issues an externally built whisper under the same lockout and exclusion rules
    pub fn offer_whisper(&mut self, whisper: Whisper) -> EngineResult<bool> {
        if self.refresh_lockout()? || self.state.is_consumed(&whisper.id) {
            return Ok(false);
        }
        self.issue(whisper)?;
        Ok(true)
    }

    fn issue(&mut self, whisper: Whisper) -> EngineResult<()> {
        let snapshot = self.state.clone();
        let event = EngineEvent::WhisperIssued {
            whisper_id: whisper.id.clone(),
            category: whisper.category,
        };
        self.state.current = Some(whisper);
        self.persist_state(snapshot)?;

        self.herald.publish(event);
        Ok(())
    }

    /// Records the answer and moves the current whisper into the answered log
    pub fn answer_current_whisper(&mut self, response: &str) -> EngineResult<Whisper> {
        let Some(current) = self.state.current.as_ref() else {
            return Err(EngineError::NoActiveWhisper);
        };
        if !current.accepts(response) {
            return Err(EngineError::EmptyResponse);
        }
        let snapshot = self.state.clone();
        let Some(mut whisper) = self.state.current.take() else {
            return Err(EngineError::NoActiveWhisper);
        };

        whisper.response = Some(response.to_string());
        whisper.answered_at = Some(self.clock.now());
        self.state.answered.push(whisper.clone());
        self.persist_state(snapshot)?;

        info!("Whisper answered: {}", whisper.id);
        self.herald.publish(EngineEvent::WhisperAnswered {
            whisper_id: whisper.id.clone(),
        });
        Ok(whisper)
    }

    /// Skips the current whisper and unconditionally enters lockout
    pub fn skip_current_whisper(&mut self) -> EngineResult<Whisper> {
        let snapshot = self.state.clone();
        let previous_lockout = self.lockout;
        let Some(mut whisper) = self.state.current.take() else {
            return Err(EngineError::NoActiveWhisper);
        };

        let now = self.clock.now();
        whisper.skipped_at = Some(now);
        self.state.skipped.push(whisper.clone());
        let lockout_until = now
            .checked_add_signed(self.lockout_duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.lockout.lockout_end = Some(lockout_until);

        let written = self.vault.batch(|writer| {
            writer
                .save(WHISPER_STATE_KEY, &self.state)
                .map_err(|e| EngineError::persistence(WHISPER_STATE_KEY, e))?;
            writer
                .save(LOCKOUT_KEY, &self.lockout)
                .map_err(|e| EngineError::persistence(LOCKOUT_KEY, e))
        });
        if let Err(err) = written {
            warn!("Skip rolled back: {}", err);
            self.state = snapshot;
            self.lockout = previous_lockout;
            self.restore_storage();
            return Err(err);
        }

        info!("Whisper skipped: {}, locked until {}", whisper.id, lockout_until);
        self.herald.publish(EngineEvent::WhisperSkipped {
            whisper_id: whisper.id.clone(),
            lockout_until,
        });
        Ok(whisper)
    }

    /// Permanently removes a whisper from the answered log
    pub fn burn_whisper(&mut self, id: &str) -> EngineResult<Whisper> {
        let Some(index) = self.state.answered.iter().position(|w| w.id == id) else {
            return Err(EngineError::not_found("whisper", id));
        };

        let snapshot = self.state.clone();
        let burned = self.state.answered.remove(index);
        self.persist_state(snapshot)?;

        info!("Whisper burned: {}", id);
        self.herald.publish(EngineEvent::WhisperBurned {
            whisper_id: id.to_string(),
        });
        Ok(burned)
    }

    pub fn whispers_by_category(&self, category: WhisperCategory) -> Vec<&Whisper> {
        self.state
            .answered
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    pub fn total_answered(&self) -> usize {
        self.state.answered.len()
    }

    pub fn total_skipped(&self) -> usize {
        self.state.skipped.len()
    }

    fn persist_state(&mut self, snapshot: WhisperState) -> EngineResult<()> {
        if let Err(source) = self.vault.save(WHISPER_STATE_KEY, &self.state) {
            warn!("Whisper state rolled back: {}", source);
            self.state = snapshot;
            return Err(EngineError::persistence(WHISPER_STATE_KEY, source));
        }
        Ok(())
    }

    // Best effort: a batch may have failed after its first write landed
    fn restore_storage(&self) {
        let restored = self.vault.batch(|writer| {
            writer.save(WHISPER_STATE_KEY, &self.state)?;
            writer.save(LOCKOUT_KEY, &self.lockout)
        });
        if let Err(e) = restored {
            warn!("Could not restore previous whisper records: {}", e);
        }
    }
}

impl CategoryLookup for WhisperEngine {
    fn category_of(&self, whisper_id: &str) -> Option<WhisperCategory> {
        self.state
            .answered
            .iter()
            .find(|w| w.id == whisper_id)
            .map(|w| w.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logos::selector::{FixedChoice, SeededChoice};
    use crate::totems::{ManualClock, MemoryStorage};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn engine_with(
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
    ) -> WhisperEngine {
        WhisperEngine::load(
            Vault::new(storage),
            clock,
            Arc::new(SeededChoice::from_seed(7)),
            Herald::new(),
        )
        .unwrap()
    }

    fn fresh() -> (WhisperEngine, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(start()));
        (engine_with(storage.clone(), clock.clone()), storage, clock)
    }

    #[test]
    fn test_answer_moves_whisper_to_answered() {
        let (mut engine, storage, _) = fresh();
        let id = engine.generate_new_whisper().unwrap().unwrap().id.clone();

        let answered = engine.answer_current_whisper("I feel seen").unwrap();
        assert_eq!(answered.id, id);
        assert_eq!(answered.answered_at, Some(start()));
        assert!(engine.current_whisper().is_none());
        assert_eq!(engine.total_answered(), 1);
        assert!(storage.contains(WHISPER_STATE_KEY));
    }

    #[test]
    fn test_answer_without_current_whisper() {
        let (mut engine, _, _) = fresh();
        assert!(matches!(
            engine.answer_current_whisper("anything"),
            Err(EngineError::NoActiveWhisper)
        ));
        assert!(matches!(
            engine.skip_current_whisper(),
            Err(EngineError::NoActiveWhisper)
        ));
    }

    #[test]
    fn test_empty_answer_is_rejected_and_whisper_kept() {
        let (mut engine, _, _) = fresh();
        engine.generate_new_whisper().unwrap();
        assert!(matches!(
            engine.answer_current_whisper("   \n"),
            Err(EngineError::EmptyResponse)
        ));
        assert!(engine.current_whisper().is_some());
    }

    #[test]
    fn test_skip_sets_lockout_to_exactly_six_hours() {
        let (mut engine, storage, clock) = fresh();
        engine.generate_new_whisper().unwrap();
        engine.skip_current_whisper().unwrap();

        assert_eq!(engine.lockout_end_time(), Some(start() + Duration::hours(6)));
        assert!(engine.is_locked());
        assert!(storage.contains(LOCKOUT_KEY));
        assert_eq!(engine.format_lockout_remaining().as_deref(), Some("6h 0m"));

        clock.advance(Duration::hours(6) - Duration::seconds(1));
        assert!(engine.is_locked());

        clock.advance(Duration::seconds(1));
        assert!(!engine.is_locked());
        assert!(!engine.refresh_lockout().unwrap());
        assert_eq!(engine.lockout_end_time(), None);
    }

    #[test]
    fn test_generate_while_locked_is_idempotent() {
        let (mut engine, _, clock) = fresh();
        engine.generate_new_whisper().unwrap();
        engine.skip_current_whisper().unwrap();

        for _ in 0..10 {
            assert!(engine.generate_new_whisper().unwrap().is_none());
            assert!(engine.current_whisper().is_none());
        }

        clock.advance(Duration::hours(7));
        assert!(engine.generate_new_whisper().unwrap().is_some());
    }

    #[test]
    fn test_answered_and_skipped_never_overlap() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(start()));
        let mut engine = engine_with(storage, clock.clone());

        let mut step = 0;
        while engine.generate_new_whisper().unwrap().is_some() {
            if step % 3 == 0 {
                engine.skip_current_whisper().unwrap();
                clock.advance(Duration::hours(6));
            } else {
                engine.answer_current_whisper("my answer").unwrap();
            }
            step += 1;
        }

        let state = engine.state();
        for answered in &state.answered {
            assert!(!state.skipped.iter().any(|s| s.id == answered.id));
            assert_eq!(state.answered.iter().filter(|w| w.id == answered.id).count(), 1);
        }
        for skipped in &state.skipped {
            assert_eq!(state.skipped.iter().filter(|w| w.id == skipped.id).count(), 1);
        }
        assert_eq!(state.answered.len() + state.skipped.len(), catalog().len());
        assert_eq!(engine.pending_whispers_count(), 0);
    }

    #[test]
    fn test_burn_does_not_touch_lockout() {
        let (mut engine, _, clock) = fresh();
        engine.generate_new_whisper().unwrap();
        let answered = engine.answer_current_whisper("I hope so").unwrap();

        engine.generate_new_whisper().unwrap();
        engine.skip_current_whisper().unwrap();
        let lock_end = engine.lockout_end_time();

        engine.burn_whisper(&answered.id).unwrap();
        assert_eq!(engine.total_answered(), 0);
        assert_eq!(engine.lockout_end_time(), lock_end);
        assert!(engine.category_of(&answered.id).is_none());

        clock.advance(Duration::hours(6));
        engine.refresh_lockout().unwrap();
        assert!(!engine.is_locked());
        assert!(matches!(
            engine.burn_whisper(&answered.id),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let (mut engine, storage, _) = fresh();
        engine.generate_new_whisper().unwrap();
        let before = engine.state().clone();

        storage.reject_writes(true);
        assert!(matches!(
            engine.skip_current_whisper(),
            Err(EngineError::Persistence { .. })
        ));
        assert_eq!(engine.state(), &before);
        assert!(!engine.is_locked());
    }

    #[test]
    fn test_state_survives_reload() {
        let (mut engine, storage, clock) = fresh();
        engine.generate_new_whisper().unwrap();
        engine.answer_current_whisper("I believe it").unwrap();
        engine.generate_new_whisper().unwrap();
        engine.skip_current_whisper().unwrap();

        let reloaded = engine_with(storage, clock);
        assert_eq!(reloaded.state(), engine.state());
        assert_eq!(reloaded.lockout_end_time(), engine.lockout_end_time());
        assert!(reloaded.is_locked());
    }

    #[test]
    fn test_expired_lockout_cleared_on_load() {
        let (mut engine, storage, clock) = fresh();
        engine.generate_new_whisper().unwrap();
        engine.skip_current_whisper().unwrap();

        clock.advance(Duration::hours(8));
        let reloaded = engine_with(storage.clone(), clock.clone());
        assert!(reloaded.lockout_end_time().is_none());

        let again = engine_with(storage, clock);
        assert!(again.lockout_end_time().is_none());
    }

    #[test]
    fn test_offer_respects_exclusion() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(start()));
        let mut engine = WhisperEngine::load(
            Vault::new(storage),
            clock,
            Arc::new(FixedChoice(0)),
            Herald::new(),
        )
        .unwrap();

        let first = engine.generate_new_whisper().unwrap().unwrap().clone();
        engine.answer_current_whisper("I fear it").unwrap();

        assert!(!engine.offer_whisper(first.clone()).unwrap());
        let fresh = Whisper::new("aligned-test", "Who speaks?", WhisperCategory::Revelation);
        assert!(engine.offer_whisper(fresh).unwrap());
        assert_eq!(engine.current_whisper().unwrap().id, "aligned-test");
        assert_eq!(engine.whispers_by_category(first.category).len(), 1);
    }

    #[test]
    fn test_optional_whisper_takes_empty_answer() {
        let (mut engine, _, _) = fresh();
        let silent = Whisper::new("sit-quietly", "Sit with it.", WhisperCategory::Memory)
            .with_optional_response();
        assert!(engine.offer_whisper(silent).unwrap());

        let answered = engine.answer_current_whisper("").unwrap();
        assert_eq!(answered.id, "sit-quietly");
        assert_eq!(answered.response.as_deref(), Some(""));
    }

    #[test]
    fn test_huge_lockout_saturates() {
        let (engine, _, _) = fresh();
        let mut engine = engine.with_lockout_duration(Duration::MAX);
        engine.generate_new_whisper().unwrap();
        engine.skip_current_whisper().unwrap();

        assert_eq!(engine.lockout_end_time(), Some(DateTime::<Utc>::MAX_UTC));
        assert!(engine.is_locked());
    }
}
