//! WHISPER CODEX - journaling progression engine
//!
//! Whispers are answered, answers become revelations, revelations are
//! sealed into the codex, and the codex awakens archetypes.

pub mod codex;
pub mod demiurge;
pub mod error;
pub mod herald;
pub mod initiation;
pub mod logos;
pub mod totems;
pub mod whispers;

pub use error::{EngineError, EngineResult, StorageError};
