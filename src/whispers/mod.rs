//! Whispers - prompts, their catalog and their lifecycle

pub mod catalog;
pub mod engine;

pub use catalog::{catalog, catalog_entry, Whisper, WhisperCategory, WhisperStatus};
pub use engine::{LockoutState, WhisperEngine, WhisperState, DEFAULT_LOCKOUT_HOURS};

use std::collections::HashMap;

/// Resolves the category of the whisper a revelation came from.
/// Burned or unknown whispers resolve to `None`.
pub trait CategoryLookup {
    fn category_of(&self, whisper_id: &str) -> Option<WhisperCategory>;
}

impl CategoryLookup for HashMap<String, WhisperCategory> {
    fn category_of(&self, whisper_id: &str) -> Option<WhisperCategory> {
        self.get(whisper_id).copied()
    }
}
