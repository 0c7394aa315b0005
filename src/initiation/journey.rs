//! 🜃 Journey - one seeker's whispers, codex and archetypes wired together
//!
//! Sealing a revelation and re-evaluating the archetypes happen under a
//! single `&mut self` borrow, so no second codex mutation can interleave.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codex::{Codex, SealedRevelation};
use crate::demiurge::{Archetype, ArchetypeEngine};
use crate::error::{EngineError, EngineResult};
use crate::herald::Herald;
use crate::logos::{
    ChoiceSource, Oracle, ProfileProvider, ResponseClassifier, Revelation, RevelationEngine,
    StoredProfile, UserProfile,
};
use crate::totems::{Clock, Vault};
use crate::whispers::{Whisper, WhisperEngine};

/// Collaborators a journey is built from
pub struct JourneyParts {
    pub vault: Vault,
    pub clock: Arc<dyn Clock>,
    pub choice: Arc<dyn ChoiceSource>,
    pub classifier: Arc<dyn ResponseClassifier>,
    pub roster: Vec<Archetype>,
    pub lockout: Duration,
    pub herald: Herald,
}

/// Result of sealing the pending revelation
#[derive(Debug, Clone)]
pub struct SealOutcome {
    pub sealed: SealedRevelation,
    pub awakened: Vec<Archetype>,
}

/// Snapshot for status screens
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyStatus {
    pub seeker: Option<String>,
    pub current_whisper: Option<String>,
    pub lockout_remaining: Option<String>,
    pub answered: usize,
    pub skipped: usize,
    pub whispers_remaining: usize,
    pub revelations: usize,
    pub chapters: usize,
    pub awakened: usize,
    pub roster: usize,
    pub pending_revelation: bool,
}

pub struct Journey {
    whispers: WhisperEngine,
    revelations: RevelationEngine,
    codex: Codex,
    archetypes: ArchetypeEngine,
    oracle: Oracle,
    profile: StoredProfile,
    clock: Arc<dyn Clock>,
    herald: Herald,
}

impl Journey {
    pub fn open(parts: JourneyParts) -> EngineResult<Self> {
        let JourneyParts {
            vault,
            clock,
            choice,
            classifier,
            roster,
            lockout,
            herald,
        } = parts;

        let profile = StoredProfile::new(vault.clone());
        let provider: Arc<dyn ProfileProvider> = Arc::new(profile.clone());

        let whispers =
            WhisperEngine::load(vault.clone(), clock.clone(), choice.clone(), herald.clone())?
                .with_lockout_duration(lockout);
        let revelations = RevelationEngine::new(
            classifier,
            choice.clone(),
            provider.clone(),
            vault.clone(),
            clock.clone(),
            herald.clone(),
        );
        let codex = Codex::load(vault.clone(), clock.clone(), herald.clone())?;
        let mut archetypes = ArchetypeEngine::load(vault, clock.clone(), herald.clone(), roster)?;

        // Catch up on a pass that did not complete before the last exit
        if codex.total_revelations() > 0 {
            archetypes.evaluate(&codex, &whispers)?;
        }

        debug!(
            "Journey opened: {} sealed, {} awakened",
            codex.total_revelations(),
            archetypes.unlocked().len()
        );
        Ok(Self {
            whispers,
            revelations,
            codex,
            archetypes,
            oracle: Oracle::new(provider, choice),
            profile,
            clock,
            herald,
        })
    }

    pub fn herald(&self) -> &Herald {
        &self.herald
    }

    pub fn whispers(&self) -> &WhisperEngine {
        &self.whispers
    }

    pub fn codex(&self) -> &Codex {
        &self.codex
    }

    pub fn archetypes(&self) -> &ArchetypeEngine {
        &self.archetypes
    }

    pub fn profile(&self) -> EngineResult<Option<UserProfile>> {
        self.profile.profile()
    }

    pub fn create_profile(&self, name: &str, purpose: &str, offering: &str) -> EngineResult<UserProfile> {
        let profile = UserProfile::new(name, purpose, offering);
        self.profile.store(&profile)?;
        info!("Profile created for {}", profile.name);
        Ok(profile)
    }

    /// The current whisper, or a freshly issued one when none is active
    pub fn next_whisper(&mut self) -> EngineResult<Option<Whisper>> {
        if let Some(current) = self.whispers.current_whisper() {
            return Ok(Some(current.clone()));
        }
        Ok(self.whispers.generate_new_whisper()?.cloned())
    }

    /// Answers the current whisper, seals its revelation and runs one archetype pass
    ///
    /// A revelation left pending by an earlier failure is sealed before the
    /// new one is generated, so the pending slot never drops an answer.
    pub fn answer(&mut self, response: &str) -> EngineResult<SealOutcome> {
        self.seal_pending()?;
        self.profile.require_profile()?;

        let whisper = self
            .whispers
            .current_whisper()
            .cloned()
            .ok_or(EngineError::NoActiveWhisper)?;
        if !whisper.accepts(response) {
            return Err(EngineError::EmptyResponse);
        }

        // Persisted before the whisper is consumed
        let revelation = self.revelations.generate_revelation(&whisper, response)?;
        if let Err(e) = self.whispers.answer_current_whisper(response) {
            if let Err(clear) = self.revelations.clear_pending() {
                warn!(
                    "Could not withdraw revelation {}: {}",
                    revelation.response_id, clear
                );
            }
            return Err(e);
        }

        self.seal_pending()?
            .ok_or_else(|| EngineError::not_found("pending revelation", revelation.response_id))
    }

    pub fn skip(&mut self) -> EngineResult<Whisper> {
        self.whispers.skip_current_whisper()
    }

    /// Removes an answered whisper; sealed entries and awakened archetypes stay
    pub fn burn(&mut self, whisper_id: &str) -> EngineResult<Whisper> {
        self.whispers.burn_whisper(whisper_id)
    }

    pub fn pending_revelation(&self) -> EngineResult<Option<Revelation>> {
        self.revelations.pending_revelation()
    }

    /// Seals the pending revelation and runs one archetype pass over the result
    pub fn seal_pending(&mut self) -> EngineResult<Option<SealOutcome>> {
        let Some(revelation) = self.revelations.pending_revelation()? else {
            return Ok(None);
        };

        // A crash between sealing and clearing leaves the entry already sealed
        let sealed = match self.codex.find_by_response(revelation.response_id) {
            Some(existing) => existing.clone(),
            None => self.codex.seal_revelation(revelation)?,
        };
        let awakened = self.archetypes.evaluate(&self.codex, &self.whispers)?;
        self.revelations.clear_pending()?;

        Ok(Some(SealOutcome { sealed, awakened }))
    }

    /// Issues the aligned whisper of an awakened archetype
    pub fn summon_aligned_whisper(&mut self, archetype_id: &str) -> EngineResult<bool> {
        if !self.archetypes.archetype(archetype_id)?.unlocked {
            return Err(EngineError::not_found("awakened archetype", archetype_id));
        }
        let whisper = self.archetypes.aligned_whisper(archetype_id)?;
        self.whispers.offer_whisper(whisper)
    }

    pub fn acknowledge_unlock(&mut self, archetype_id: &str) -> bool {
        self.archetypes.acknowledge_unlock(archetype_id)
    }

    pub fn dismiss_expired_unlocks(&mut self) -> usize {
        let now = self.clock.now();
        self.archetypes.dismiss_expired(now)
    }

    pub fn consult(&self, query: &str) -> EngineResult<String> {
        self.oracle.consult(query)
    }

    pub fn status(&mut self) -> EngineResult<JourneyStatus> {
        self.whispers.refresh_lockout()?;
        Ok(JourneyStatus {
            seeker: self.profile.profile()?.map(|p| p.name),
            current_whisper: self.whispers.current_whisper().map(|w| w.question.clone()),
            lockout_remaining: self.whispers.format_lockout_remaining(),
            answered: self.whispers.total_answered(),
            skipped: self.whispers.total_skipped(),
            whispers_remaining: self.whispers.pending_whispers_count(),
            revelations: self.codex.total_revelations(),
            chapters: self.codex.chapters().len(),
            awakened: self.archetypes.unlocked().len(),
            roster: self.archetypes.archetypes().len(),
            pending_revelation: self.revelations.pending_revelation()?.is_some(),
        })
    }
}
