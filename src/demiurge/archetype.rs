//! Archetype definitions - symbolic milestones of the journey
//!
//! The roster ships with five built-in archetypes. A directory of JSON
//! definitions can replace it; unlock state is kept separately in the vault.

use anyhow::{Context, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::whispers::WhisperCategory;

/// Conditions that must all hold for an archetype to awaken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockCondition {
    pub required_revelations: usize,
    pub required_emotional_weight: u64,
    #[serde(default)]
    pub required_categories: BTreeSet<WhisperCategory>,
}

/// Display axes, each in 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resonance {
    pub wisdom: u8,
    pub mystery: u8,
    pub power: u8,
}

impl Resonance {
    pub const fn new(wisdom: u8, mystery: u8, power: u8) -> Self {
        Self {
            wisdom,
            mystery,
            power,
        }
    }

    pub fn total(&self) -> u32 {
        self.wisdom as u32 + self.mystery as u32 + self.power as u32
    }

    fn is_valid(&self) -> bool {
        [self.wisdom, self.mystery, self.power]
            .iter()
            .all(|v| (1..=10).contains(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub id: String,
    pub name: String,
    pub description: String,
    pub symbol: String,
    pub unlock_condition: UnlockCondition,
    pub resonance: Resonance,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub associated_revelation_id: Option<Uuid>,
}

impl Archetype {
    fn define(
        id: &str,
        name: &str,
        symbol: &str,
        description: &str,
        condition: (usize, u64, &[WhisperCategory]),
        resonance: Resonance,
    ) -> Self {
        let (required_revelations, required_emotional_weight, categories) = condition;
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            symbol: symbol.to_string(),
            unlock_condition: UnlockCondition {
                required_revelations,
                required_emotional_weight,
                required_categories: categories.iter().copied().collect(),
            },
            resonance,
            unlocked: false,
            unlocked_at: None,
            associated_revelation_id: None,
        }
    }

    /// The built-in roster, in evaluation order
    pub fn predefined() -> Vec<Archetype> {
        use WhisperCategory::*;
        vec![
            Self::define(
                "silent-flame",
                "The Silent Flame",
                "🔥",
                "A guardian of truth that burns away illusion. Through pain and purification, it reveals the core of what must be known.",
                (5, 7, &[Truth, Resistance]),
                Resonance::new(6, 4, 9),
            ),
            Self::define(
                "mirror-serpent",
                "The Mirror Serpent",
                "🐍",
                "A shapeshifter of perception that coils around paradox. Through embracing contradiction, it grants clarity beyond duality.",
                (7, 8, &[Revelation, Truth]),
                Resonance::new(8, 9, 5),
            ),
            Self::define(
                "veiled-bloom",
                "The Veiled Bloom",
                "🌸",
                "A tender guardian of vulnerability that flowers in shadow. Through embracing fragility, it reveals the strength of authentic being.",
                (6, 6, &[Resistance, Revelation]),
                Resonance::new(7, 6, 4),
            ),
            Self::define(
                "eternal-wanderer",
                "The Eternal Wanderer",
                "🌌",
                "A seeker of infinite paths that finds home in movement. Through embracing the journey, it reveals the destination within.",
                (8, 9, &[Resistance, Truth, Revelation]),
                Resonance::new(9, 8, 6),
            ),
            Self::define(
                "shadow-weaver",
                "The Shadow Weaver",
                "🕸️",
                "A master of hidden truths that spins wisdom from darkness. Through embracing the shadow, it reveals the light within.",
                (9, 10, &[Revelation, Truth]),
                Resonance::new(8, 10, 7),
            ),
        ]
    }
}

/// Loads roster definitions from `*.json` files
pub struct ArchetypeLoader;

impl ArchetypeLoader {
    /// Definitions sorted by file name; the built-in five when the directory
    /// is missing or holds no valid definition
    pub fn load_all(dir: impl AsRef<Path>) -> Result<Vec<Archetype>> {
        let dir = dir.as_ref();
        if !dir.exists() {
            debug!("No archetype directory at {:?}, using built-in roster", dir);
            return Ok(Archetype::predefined());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("reading {:?}", dir))? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut archetypes: Vec<Archetype> = Vec::new();
        for path in paths {
            match Self::load_from_path(&path) {
                Ok(archetype) if archetypes.iter().any(|a| a.id == archetype.id) => {
                    warn!("Duplicate archetype '{}' in {:?} ignored", archetype.id, path);
                }
                Ok(archetype) => archetypes.push(archetype),
                Err(e) => warn!("Skipping archetype {:?}: {:#}", path, e),
            }
        }

        if archetypes.is_empty() {
            return Ok(Archetype::predefined());
        }
        Ok(archetypes)
    }

    fn load_from_path(path: &Path) -> Result<Archetype> {
        let content = fs::read_to_string(path)?;
        let mut archetype: Archetype = serde_json::from_str(&content)?;
        Self::validate(&archetype)?;

        // Definitions never carry unlock state
        archetype.unlocked = false;
        archetype.unlocked_at = None;
        archetype.associated_revelation_id = None;
        Ok(archetype)
    }

    fn validate(archetype: &Archetype) -> Result<()> {
        if archetype.id.trim().is_empty() {
            return Err(Error::msg("Archetype ID cannot be empty"));
        }
        if archetype.name.trim().is_empty() {
            return Err(Error::msg("Archetype name cannot be empty"));
        }
        if !archetype.resonance.is_valid() {
            return Err(Error::msg("Resonance values must be between 1 and 10"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_predefined_roster() {
        let roster = Archetype::predefined();
        assert_eq!(roster.len(), 5);
        assert!(roster.iter().all(|a| !a.unlocked && a.resonance.is_valid()));
        assert_eq!(roster[0].id, "silent-flame");
        assert_eq!(roster[0].resonance.total(), 19);
    }

    #[test]
    fn test_resonance_is_stable() {
        let a = Archetype::predefined();
        let b = Archetype::predefined();
        assert_eq!(a[3].resonance, b[3].resonance);
    }

    #[test]
    fn test_missing_dir_falls_back() {
        let dir = tempdir().unwrap();
        let roster = ArchetypeLoader::load_all(dir.path().join("absent")).unwrap();
        assert_eq!(roster, Archetype::predefined());
    }

    #[test]
    fn test_loads_json_definitions() {
        let dir = tempdir().unwrap();
        let json = r#"{
            "id": "quiet-stone",
            "name": "The Quiet Stone",
            "description": "Stillness that outlasts the storm.",
            "symbol": "🪨",
            "unlock_condition": {
                "required_revelations": 2,
                "required_emotional_weight": 3,
                "required_categories": ["Memory"]
            },
            "resonance": { "wisdom": 5, "mystery": 5, "power": 5 },
            "unlocked": true
        }"#;
        fs::write(dir.path().join("stone.json"), json).unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let roster = ArchetypeLoader::load_all(dir.path()).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id, "quiet-stone");
        assert!(!roster[0].unlocked);
        assert!(roster[0]
            .unlock_condition
            .required_categories
            .contains(&WhisperCategory::Memory));
    }
}
