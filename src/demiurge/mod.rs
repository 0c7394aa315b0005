//! 🜂 Demiurge - archetypes and their awakening
//!
//! Definitions live in `archetype`, the unlock evaluator in `evolution`.

pub mod archetype;
pub mod evolution;

pub use archetype::{Archetype, ArchetypeLoader, Resonance, UnlockCondition};
pub use evolution::{
    emotional_weight, ArchetypeEngine, CodexSnapshot, UnlockNotice, UNLOCK_NOTICE_SECONDS,
};
