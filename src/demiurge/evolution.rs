//! Evolution Engine - awakening archetypes from the codex history
//!
//! Every pass takes one snapshot of the codex and tests the still-locked
//! archetypes against it in roster order. Unlocks are monotonic.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::archetype::{Archetype, UnlockCondition};
use crate::codex::{Codex, SealedRevelation};
use crate::error::{EngineError, EngineResult};
use crate::herald::{EngineEvent, Herald};
use crate::logos::RevelationMood;
use crate::totems::vault::ARCHETYPES_KEY;
use crate::totems::{Clock, Vault};
use crate::whispers::{CategoryLookup, Whisper, WhisperCategory};

/// How long an unlock notice stays up before it is dismissed
pub const UNLOCK_NOTICE_SECONDS: i64 = 5;

/// Mood contribution to the history-wide multiplier
fn mood_increment(mood: RevelationMood) -> f64 {
    match mood {
        RevelationMood::Calm => 0.5,
        RevelationMood::Haunting => 1.0,
        RevelationMood::Affirming => 0.8,
        RevelationMood::Cryptic => 0.7,
    }
}

/// `floor(count * multiplier)`; the multiplier starts at 1.0 and accumulates
/// across the whole history rather than per revelation
pub fn emotional_weight<'a>(revelations: impl IntoIterator<Item = &'a SealedRevelation>) -> u64 {
    let mut count = 0usize;
    let mut multiplier = 1.0f64;
    for sealed in revelations {
        count += 1;
        multiplier += mood_increment(sealed.revelation.mood);
    }
    (count as f64 * multiplier).floor() as u64
}

/// Codex figures one evaluation pass is tested against
#[derive(Debug, Clone, PartialEq)]
pub struct CodexSnapshot {
    pub revelation_count: usize,
    pub emotional_weight: u64,
    pub categories: BTreeSet<WhisperCategory>,
    pub latest_revelation_id: Option<Uuid>,
}

impl CodexSnapshot {
    pub fn capture(codex: &Codex, lookup: &dyn CategoryLookup) -> Self {
        let revelations = codex.all_revelations();
        let categories = revelations
            .iter()
            .filter_map(|r| lookup.category_of(&r.revelation.whisper_id))
            .collect();
        Self {
            revelation_count: revelations.len(),
            emotional_weight: emotional_weight(revelations.iter().copied()),
            categories,
            latest_revelation_id: codex.latest().map(|r| r.id),
        }
    }

    pub fn satisfies(&self, condition: &UnlockCondition) -> bool {
        self.revelation_count >= condition.required_revelations
            && self.emotional_weight >= condition.required_emotional_weight
            && condition.required_categories.is_subset(&self.categories)
    }
}

/// Unlock awaiting acknowledgement by the display layer; in memory only
#[derive(Debug, Clone, PartialEq)]
pub struct UnlockNotice {
    pub archetype_id: String,
    pub unlocked_at: DateTime<Utc>,
}

pub struct ArchetypeEngine {
    roster: Vec<Archetype>,
    notices: Vec<UnlockNotice>,
    vault: Vault,
    clock: Arc<dyn Clock>,
    herald: Herald,
}

impl ArchetypeEngine {
    /// Takes definitions from `roster` and unlock state from the vault, matched by id
    pub fn load(
        vault: Vault,
        clock: Arc<dyn Clock>,
        herald: Herald,
        mut roster: Vec<Archetype>,
    ) -> EngineResult<Self> {
        let stored: Vec<Archetype> = vault
            .load(ARCHETYPES_KEY)
            .map_err(|e| EngineError::persistence(ARCHETYPES_KEY, e))?
            .unwrap_or_default();
        let stored: HashMap<String, Archetype> =
            stored.into_iter().map(|a| (a.id.clone(), a)).collect();

        for archetype in roster.iter_mut() {
            if let Some(saved) = stored.get(&archetype.id).filter(|s| s.unlocked) {
                archetype.unlocked = true;
                archetype.unlocked_at = saved.unlocked_at;
                archetype.associated_revelation_id = saved.associated_revelation_id;
            }
        }

        debug!(
            "Archetype roster restored: {}/{} awakened",
            roster.iter().filter(|a| a.unlocked).count(),
            roster.len()
        );
        Ok(Self {
            roster,
            notices: Vec::new(),
            vault,
            clock,
            herald,
        })
    }

    /// One evaluation pass; returns the archetypes awakened by it
    pub fn evaluate(
        &mut self,
        codex: &Codex,
        lookup: &dyn CategoryLookup,
    ) -> EngineResult<Vec<Archetype>> {
        let snapshot = CodexSnapshot::capture(codex, lookup);
        let before = self.roster.clone();
        let now = self.clock.now();

        let mut awakened = Vec::new();
        for archetype in self.roster.iter_mut().filter(|a| !a.unlocked) {
            if snapshot.satisfies(&archetype.unlock_condition) {
                archetype.unlocked = true;
                archetype.unlocked_at = Some(now);
                archetype.associated_revelation_id = snapshot.latest_revelation_id;
                awakened.push(archetype.clone());
            }
        }

        if let Err(source) = self.vault.save(ARCHETYPES_KEY, &self.roster) {
            warn!("Archetype pass rolled back: {}", source);
            self.roster = before;
            return Err(EngineError::persistence(ARCHETYPES_KEY, source));
        }

        for archetype in &awakened {
            info!("{} {} has awakened", archetype.symbol, archetype.name);
            self.notices.push(UnlockNotice {
                archetype_id: archetype.id.clone(),
                unlocked_at: now,
            });
            self.herald.publish(EngineEvent::ArchetypeUnlocked {
                archetype_id: archetype.id.clone(),
                name: archetype.name.clone(),
                revelation_id: archetype.associated_revelation_id,
            });
        }
        Ok(awakened)
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.roster
    }

    pub fn archetype(&self, id: &str) -> EngineResult<&Archetype> {
        self.roster
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| EngineError::not_found("archetype", id))
    }

    pub fn unlocked(&self) -> Vec<&Archetype> {
        self.roster.iter().filter(|a| a.unlocked).collect()
    }

    pub fn newly_unlocked(&self) -> &[UnlockNotice] {
        &self.notices
    }

    /// Returns false when no notice was pending for `archetype_id`
    pub fn acknowledge_unlock(&mut self, archetype_id: &str) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.archetype_id != archetype_id);
        let removed = self.notices.len() != before;
        if removed {
            self.herald.publish(EngineEvent::UnlockDismissed {
                archetype_id: archetype_id.to_string(),
            });
        }
        removed
    }

    /// Drops notices older than the display window
    pub fn dismiss_expired(&mut self, now: DateTime<Utc>) -> usize {
        let window = Duration::seconds(UNLOCK_NOTICE_SECONDS);
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .notices
            .drain(..)
            .partition(|n| now - n.unlocked_at >= window);
        self.notices = kept;
        for notice in &expired {
            self.herald.publish(EngineEvent::UnlockDismissed {
                archetype_id: notice.archetype_id.clone(),
            });
        }
        expired.len()
    }

    /// Prompt tying the journal back to an awakened archetype
    pub fn aligned_whisper(&self, archetype_id: &str) -> EngineResult<Whisper> {
        let archetype = self.archetype(archetype_id)?;
        let name = archetype.name.to_lowercase();
        let name = name.strip_prefix("the ").unwrap_or(&name);
        Ok(Whisper::new(
            format!("aligned-{}", archetype.id),
            format!("How does the {} speak to your current journey?", name),
            WhisperCategory::Revelation,
        )
        .with_unlock_condition(&archetype.id))
    }

    /// Sealed entries linked to an archetype: its triggering revelation
    /// and any answer to its aligned whisper
    pub fn revelations_for_archetype<'c>(
        &self,
        codex: &'c Codex,
        archetype_id: &str,
    ) -> EngineResult<Vec<&'c SealedRevelation>> {
        let archetype = self.archetype(archetype_id)?;
        let aligned = format!("aligned-{}", archetype.id);
        Ok(codex
            .all_revelations()
            .into_iter()
            .filter(|r| {
                Some(r.id) == archetype.associated_revelation_id
                    || r.revelation.whisper_id == aligned
            })
            .collect())
    }

    /// Next awakened archetype after `archetype_id`, wrapping around
    pub fn next_unlocked_after(&self, archetype_id: &str) -> Option<&Archetype> {
        let unlocked = self.unlocked();
        if unlocked.is_empty() {
            return None;
        }
        let next = unlocked
            .iter()
            .position(|a| a.id == archetype_id)
            .map(|i| (i + 1) % unlocked.len())
            .unwrap_or(0);
        Some(unlocked[next])
    }
}
