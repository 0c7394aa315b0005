//! 🜂 Initiation - configuration and start-up of a journey
//!
//! Loads `SystemConfig`, opens file storage and the archetype roster,
//! and hands back a ready `Journey`.

pub mod config;
pub mod journey;

pub use config::{SystemConfig, DEFAULT_CONFIG_PATH};
pub use journey::{Journey, JourneyParts, JourneyStatus, SealOutcome};

use anyhow::{Context, Result};
use chrono::Duration;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::demiurge::ArchetypeLoader;
use crate::herald::Herald;
use crate::logos::{HeuristicClassifier, SeededChoice};
use crate::totems::{FileStorage, SystemClock, Vault};

/// Builds journeys from a validated configuration
pub struct InitiationManager {
    config: SystemConfig,
}

impl InitiationManager {
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(SystemConfig::load(path)?)
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Opens the journey stored under the configured data directory
    pub fn open_journey(&self) -> Result<Journey> {
        let storage = FileStorage::open(self.config.data_path())
            .with_context(|| format!("opening data directory {}", self.config.data_dir))?;
        let roster = ArchetypeLoader::load_all(self.config.archetypes_path())?;
        let lockout = Duration::try_hours(self.config.lockout_hours)
            .with_context(|| format!("lockout of {} hours is out of range", self.config.lockout_hours))?;
        info!(
            "Initiating journey in {} with {} archetypes",
            self.config.data_dir,
            roster.len()
        );

        let journey = Journey::open(JourneyParts {
            vault: Vault::new(Arc::new(storage)),
            clock: Arc::new(SystemClock),
            choice: Arc::new(SeededChoice::new(self.config.seed)),
            classifier: Arc::new(HeuristicClassifier::new()),
            roster,
            lockout,
            herald: Herald::new(),
        })
        .context("restoring journey state")?;
        Ok(journey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_journey_in_fresh_directory() {
        let dir = tempdir().unwrap();
        let config = SystemConfig {
            data_dir: dir.path().join("data").to_string_lossy().into_owned(),
            archetypes_dir: dir.path().join("archetypes").to_string_lossy().into_owned(),
            seed: Some(11),
            ..SystemConfig::default()
        };
        let manager = InitiationManager::new(config).unwrap();

        let mut journey = manager.open_journey().unwrap();
        journey.create_profile("Mira", "healing", "patience").unwrap();
        assert!(journey.next_whisper().unwrap().is_some());
        assert_eq!(journey.archetypes().archetypes().len(), 5);

        let mut reopened = manager.open_journey().unwrap();
        assert_eq!(
            reopened.status().unwrap().current_whisper,
            journey.status().unwrap().current_whisper
        );
    }
}
