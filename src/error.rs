//! Error taxonomy for the progression engine
//!
//! Nothing here is fatal: every variant is recoverable at the call site by
//! retrying or showing a message to the user.

use thiserror::Error;

/// Failures raised by a storage collaborator or the vault envelope
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io failure on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failure on key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record '{key}' has version {found}, this build understands up to {supported}")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },

    #[error("record '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the engines
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("profile not initialized")]
    ProfileNotInitialized,

    #[error("persistence failure for '{key}'")]
    Persistence {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("no whisper is currently active")]
    NoActiveWhisper,

    #[error("response cannot be empty")]
    EmptyResponse,

    #[error("revelation generation failed")]
    GenerationFailure(#[source] StorageError),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn persistence(key: &str, source: StorageError) -> Self {
        Self::Persistence {
            key: key.to_string(),
            source,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = EngineError::not_found("chapter", 4);
        assert_eq!(err.to_string(), "chapter '4' not found");
    }

    #[test]
    fn test_persistence_keeps_source() {
        let err = EngineError::persistence(
            "codex.chapters",
            StorageError::Unavailable("disk gone".to_string()),
        );
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("storage unavailable: disk gone"));
    }
}
