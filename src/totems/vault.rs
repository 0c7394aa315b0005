//! Vault - typed, versioned access to a shared storage collaborator
//!
//! Every payload is wrapped into an envelope carrying a schema version and
//! the save time. Writes are serialized through one mutex so two mutations
//! never interleave their writes, even when the vault is shared.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::storage::Storage;
use crate::error::StorageError;

/// Schema version written into every envelope
pub const RECORD_VERSION: u32 = 1;

pub const WHISPER_STATE_KEY: &str = "whispers.state";
pub const LOCKOUT_KEY: &str = "whispers.lockout";
pub const PENDING_REVELATION_KEY: &str = "revelation.pending";
pub const CODEX_KEY: &str = "codex.chapters";
pub const ARCHETYPES_KEY: &str = "archetypes.roster";
pub const PROFILE_KEY: &str = "profile";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    saved_at: DateTime<Utc>,
    payload: T,
}

#[derive(Clone)]
pub struct Vault {
    storage: Arc<dyn Storage>,
    write_lock: Arc<Mutex<()>>,
}

impl Vault {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Loads and unwraps a record, `None` when the key was never written
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(bytes) = self.storage.load(key)? else {
            return Ok(None);
        };

        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Serialization {
                key: key.to_string(),
                source,
            })?;

        if envelope.version > RECORD_VERSION {
            return Err(StorageError::UnsupportedVersion {
                key: key.to_string(),
                found: envelope.version,
                supported: RECORD_VERSION,
            });
        }

        debug!("Loaded '{}' (v{}, saved {})", key, envelope.version, envelope.saved_at);
        Ok(Some(envelope.payload))
    }

    /// Wraps and writes a record
    pub fn save<T: Serialize>(&self, key: &str, payload: &T) -> Result<(), StorageError> {
        self.batch(|writer| writer.save(key, payload))
    }

    /// Runs several writes as one serialized batch
    pub fn batch<R>(&self, f: impl FnOnce(&BatchWriter<'_>) -> R) -> R {
        let _guard = self.write_lock.lock();
        f(&BatchWriter { vault: self })
    }
}

/// Writer handed out by [`Vault::batch`] while the write lock is held
pub struct BatchWriter<'a> {
    vault: &'a Vault,
}

impl BatchWriter<'_> {
    pub fn save<T: Serialize>(&self, key: &str, payload: &T) -> Result<(), StorageError> {
        let bytes = encode(key, payload)?;
        self.vault.storage.save(&bytes, key)
    }
}

fn encode<T: Serialize>(key: &str, payload: &T) -> Result<Vec<u8>, StorageError> {
    let envelope = Envelope {
        version: RECORD_VERSION,
        saved_at: Utc::now(),
        payload,
    };
    serde_json::to_vec_pretty(&envelope).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })
}
