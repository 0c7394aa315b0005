//! 🜁 Logos - the words the engine speaks back
//!
//! Response analysis, revelation generation, the oracle,
//! and the seeker profile they are personalised with.

pub mod analysis;
pub mod oracle;
pub mod profile;
pub mod revelation;
pub mod selector;

pub use analysis::{
    Depth, HeuristicClassifier, Honesty, ResponseAnalysis, ResponseClassifier, SelfAwareness,
};
pub use oracle::Oracle;
pub use profile::{ProfileProvider, StoredProfile, UserProfile};
pub use revelation::{determine_mood, Revelation, RevelationEngine, RevelationMood};
pub use selector::{ChoiceSource, FixedChoice, SeededChoice};
