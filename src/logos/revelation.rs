//! ✨ Revelation engine - turns a whisper and its answer into a reflection
//!
//! Pipeline: classify → mood lookup → template → optional sigil → persist.
//! Persistence is mandatory: when the pending record cannot be written the
//! caller receives `GenerationFailure` and no revelation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::analysis::{Depth, Honesty, ResponseAnalysis, ResponseClassifier};
use super::profile::{ProfileProvider, UserProfile};
use super::selector::{choose, ChoiceSource};
use crate::error::{EngineError, EngineResult};
use crate::herald::{EngineEvent, Herald};
use crate::totems::vault::PENDING_REVELATION_KEY;
use crate::totems::{Clock, Vault};
use crate::whispers::Whisper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevelationMood {
    Calm,
    Haunting,
    Affirming,
    Cryptic,
}

impl RevelationMood {
    pub const ALL: [RevelationMood; 4] = [
        RevelationMood::Calm,
        RevelationMood::Haunting,
        RevelationMood::Affirming,
        RevelationMood::Cryptic,
    ];

    pub fn icon(&self) -> &'static str {
        match self {
            RevelationMood::Calm => "🌙",
            RevelationMood::Haunting => "🌫️",
            RevelationMood::Affirming => "☀️",
            RevelationMood::Cryptic => "✨",
        }
    }
}

impl std::fmt::Display for RevelationMood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevelationMood::Calm => write!(f, "Calm"),
            RevelationMood::Haunting => write!(f, "Haunting"),
            RevelationMood::Affirming => write!(f, "Affirming"),
            RevelationMood::Cryptic => write!(f, "Cryptic"),
        }
    }
}

/// Immutable reflection produced from one answered whisper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revelation {
    pub text: String,
    pub sigil: Option<String>,
    pub mood: RevelationMood,
    pub timestamp: DateTime<Utc>,
    pub whisper_id: String,
    pub response_id: Uuid,
}

/// Total mapping over (depth, honesty)
pub fn determine_mood(analysis: &ResponseAnalysis) -> RevelationMood {
    match (analysis.depth, analysis.honesty) {
        (Depth::Deep, Honesty::High) => RevelationMood::Affirming,
        (Depth::Deep, Honesty::Low) => RevelationMood::Haunting,
        (Depth::Shallow, Honesty::High) => RevelationMood::Calm,
        (Depth::Shallow, Honesty::Low) => RevelationMood::Cryptic,
        (Depth::Moderate, Honesty::High) => RevelationMood::Cryptic,
        (Depth::Moderate, Honesty::Low) => RevelationMood::Cryptic,
    }
}

pub fn should_generate_sigil(analysis: &ResponseAnalysis) -> bool {
    analysis.depth == Depth::Deep && analysis.honesty == Honesty::High
}

pub const SIGILS: &[&str] = &[
    "The Seeker's Path",
    "The Oracle's Eye",
    "The Whisper's Echo",
    "The Truth's Mirror",
    "The Soul's Compass",
];

pub fn templates_for(mood: RevelationMood) -> &'static [&'static str] {
    match mood {
        RevelationMood::Calm => &[
            "In the quiet spaces between your words, I sense a gentle truth waiting to be acknowledged.",
            "Your response, like ripples on still water, reveals more than you might realize.",
            "The path you're walking is yours alone, yet the stars above guide us all.",
            "Rest a moment, {name}. What you seek in {purpose} is already stirring within you.",
        ],
        RevelationMood::Haunting => &[
            "There are shadows in your words that yearn for light.",
            "The echo of your response lingers in the sacred halls of truth.",
            "What you've written speaks volumes, but what remains unsaid speaks even louder.",
            "Even {offering} casts a shadow, {name}. Look at what it hides.",
        ],
        RevelationMood::Affirming => &[
            "Your honesty is a beacon in the darkness, illuminating paths unseen.",
            "The depth of your reflection mirrors the depth of your soul.",
            "In your words, I hear the song of a seeker who has found their voice.",
            "{name}, your offering of {offering} has been received. The way toward {purpose} opens.",
        ],
        RevelationMood::Cryptic => &[
            "The oracle speaks in riddles, for truth is often found in questions, not answers.",
            "Your response, like a sacred text, holds meanings yet to be revealed.",
            "The path to wisdom is paved with mysteries, and you stand at its threshold.",
        ],
    }
}

pub struct RevelationEngine {
    classifier: Arc<dyn ResponseClassifier>,
    choice: Arc<dyn ChoiceSource>,
    profile: Arc<dyn ProfileProvider>,
    vault: Vault,
    clock: Arc<dyn Clock>,
    herald: Herald,
}

impl RevelationEngine {
    pub fn new(
        classifier: Arc<dyn ResponseClassifier>,
        choice: Arc<dyn ChoiceSource>,
        profile: Arc<dyn ProfileProvider>,
        vault: Vault,
        clock: Arc<dyn Clock>,
        herald: Herald,
    ) -> Self {
        Self {
            classifier,
            choice,
            profile,
            vault,
            clock,
            herald,
        }
    }

    pub fn analyze(&self, response: &str) -> ResponseAnalysis {
        self.classifier.classify(response)
    }

    /// Generates and persists the pending revelation for an answered whisper
    pub fn generate_revelation(&self, whisper: &Whisper, response: &str) -> EngineResult<Revelation> {
        let profile = self.profile.require_profile()?;

        let analysis = self.classifier.classify(response);
        let mood = determine_mood(&analysis);
        let text = self.render_reflection(mood, &profile);
        let sigil = should_generate_sigil(&analysis).then(|| self.generate_sigil());

        debug!(
            "Analysis for {}: {:?}, mood {}, sigil {:?}",
            whisper.id, analysis, mood, sigil
        );

        let revelation = Revelation {
            text,
            sigil,
            mood,
            timestamp: self.clock.now(),
            whisper_id: whisper.id.clone(),
            response_id: Uuid::new_v4(),
        };

        self.vault
            .save(PENDING_REVELATION_KEY, &Some(&revelation))
            .map_err(EngineError::GenerationFailure)?;

        info!("Revelation generated for {} ({})", whisper.id, mood);
        self.herald.publish(EngineEvent::RevelationGenerated {
            whisper_id: whisper.id.clone(),
            mood,
            has_sigil: revelation.sigil.is_some(),
        });
        Ok(revelation)
    }

    /// The generated revelation still waiting to be sealed, if any
    pub fn pending_revelation(&self) -> EngineResult<Option<Revelation>> {
        self.vault
            .load::<Option<Revelation>>(PENDING_REVELATION_KEY)
            .map(Option::flatten)
            .map_err(|e| EngineError::persistence(PENDING_REVELATION_KEY, e))
    }

    pub fn clear_pending(&self) -> EngineResult<()> {
        self.vault
            .save(PENDING_REVELATION_KEY, &None::<Revelation>)
            .map_err(|e| EngineError::persistence(PENDING_REVELATION_KEY, e))
    }

    fn render_reflection(&self, mood: RevelationMood, profile: &UserProfile) -> String {
        let template = choose(self.choice.as_ref(), templates_for(mood))
            .copied()
            .unwrap_or("The oracle is silent.");
        profile.personalize(template)
    }

    fn generate_sigil(&self) -> String {
        choose(self.choice.as_ref(), SIGILS)
            .copied()
            .unwrap_or("The Sacred Mark")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logos::analysis::{HeuristicClassifier, SelfAwareness};
    use crate::logos::selector::FixedChoice;
    use crate::totems::{ManualClock, MemoryStorage};
    use crate::whispers::catalog_entry;
    use chrono::TimeZone;

    const DEEP_HONEST: &str = "I feel that every winter I return to the same house in my mind, \
        the one by the river where my father taught me to read the water, and I think \
        I have been trying to go back there ever since, because it was the last place where \
        I did not have to pretend to be someone stronger than I was, and I love it still.";

    fn engine(
        storage: Arc<MemoryStorage>,
        profile: Option<UserProfile>,
        pick: usize,
    ) -> RevelationEngine {
        RevelationEngine::new(
            Arc::new(HeuristicClassifier::new()),
            Arc::new(FixedChoice(pick)),
            Arc::new(profile),
            Vault::new(storage),
            Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 2, 2, 2, 2).unwrap())),
            Herald::new(),
        )
    }

    fn profile() -> Option<UserProfile> {
        Some(UserProfile::new("Mira", "healing", "patience"))
    }

    #[test]
    fn test_mood_table_is_total() {
        let depths = [Depth::Shallow, Depth::Moderate, Depth::Deep];
        let honesties = [Honesty::Low, Honesty::High];
        for depth in depths {
            for honesty in honesties {
                let analysis = ResponseAnalysis {
                    depth,
                    honesty,
                    self_awareness: SelfAwareness::Present,
                };
                let expected = match (depth, honesty) {
                    (Depth::Deep, Honesty::High) => RevelationMood::Affirming,
                    (Depth::Deep, Honesty::Low) => RevelationMood::Haunting,
                    (Depth::Shallow, Honesty::High) => RevelationMood::Calm,
                    _ => RevelationMood::Cryptic,
                };
                assert_eq!(determine_mood(&analysis), expected);
            }
        }
    }

    #[test]
    fn test_every_mood_has_three_templates() {
        for mood in RevelationMood::ALL {
            assert!(templates_for(mood).len() >= 3, "{}", mood);
        }
    }

    #[test]
    fn test_deep_honest_answer_is_affirming_with_sigil() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine(storage.clone(), profile(), 0);
        let whisper = catalog_entry("memory-haunts").unwrap();

        let revelation = engine.generate_revelation(&whisper, DEEP_HONEST).unwrap();
        assert_eq!(revelation.mood, RevelationMood::Affirming);
        assert_eq!(revelation.sigil.as_deref(), Some("The Seeker's Path"));
        assert_eq!(revelation.whisper_id, "memory-haunts");
        assert_eq!(
            revelation.text,
            "Your honesty is a beacon in the darkness, illuminating paths unseen."
        );
        assert_eq!(engine.pending_revelation().unwrap(), Some(revelation));
    }

    #[test]
    fn test_short_answer_has_no_sigil() {
        let engine = engine(Arc::new(MemoryStorage::new()), profile(), 0);
        let whisper = catalog_entry("truth-avoided").unwrap();

        let calm = engine.generate_revelation(&whisper, "I fear it").unwrap();
        assert_eq!(calm.mood, RevelationMood::Calm);
        assert!(calm.sigil.is_none());

        let cryptic = engine.generate_revelation(&whisper, "nothing much").unwrap();
        assert_eq!(cryptic.mood, RevelationMood::Cryptic);
    }

    #[test]
    fn test_templates_are_personalized() {
        let engine = engine(Arc::new(MemoryStorage::new()), profile(), 3);
        let whisper = catalog_entry("truth-avoided").unwrap();

        let revelation = engine.generate_revelation(&whisper, "I fear it").unwrap();
        assert_eq!(
            revelation.text,
            "Rest a moment, Mira. What you seek in healing is already stirring within you."
        );
    }

    #[test]
    fn test_missing_profile_aborts() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine(storage.clone(), None, 0);
        let whisper = catalog_entry("truth-avoided").unwrap();

        assert!(matches!(
            engine.generate_revelation(&whisper, "I fear it"),
            Err(EngineError::ProfileNotInitialized)
        ));
        assert!(!storage.contains(PENDING_REVELATION_KEY));
    }

    #[test]
    fn test_failed_write_is_generation_failure() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine(storage.clone(), profile(), 0);
        let whisper = catalog_entry("truth-avoided").unwrap();

        storage.reject_writes(true);
        assert!(matches!(
            engine.generate_revelation(&whisper, "I fear it"),
            Err(EngineError::GenerationFailure(_))
        ));
    }

    #[test]
    fn test_clear_pending() {
        let engine = engine(Arc::new(MemoryStorage::new()), profile(), 0);
        let whisper = catalog_entry("truth-avoided").unwrap();
        engine.generate_revelation(&whisper, "I fear it").unwrap();

        engine.clear_pending().unwrap();
        assert_eq!(engine.pending_revelation().unwrap(), None);
    }
}
