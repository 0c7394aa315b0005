//! Response analysis - depth, honesty and self-awareness of an answer
//!
//! `ResponseClassifier` is the seam for a smarter (model-based) analyser.
//! Any replacement must keep the three ordinal categories.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Depth {
    Shallow,
    Moderate,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Honesty {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SelfAwareness {
    Absent,
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    pub depth: Depth,
    pub honesty: Honesty,
    pub self_awareness: SelfAwareness,
}

pub trait ResponseClassifier: Send + Sync {
    fn classify(&self, response: &str) -> ResponseAnalysis;
}

const FIRST_PERSON_MARKERS: &[&str] = &[
    "i", "me", "my", "mine", "myself", "i'm", "i've", "i'd", "i'll",
];

const EMOTION_LEXICON: &[&str] = &["feel", "think", "believe", "hope", "fear", "love", "hate"];

const DEEP_WORD_COUNT: usize = 50;
const MODERATE_WORD_COUNT: usize = 20;

/// Word-count and lexicon heuristic
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    fn tokens(response: &str) -> impl Iterator<Item = String> + '_ {
        response
            .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’'))
            .filter(|token| !token.is_empty())
            .map(|token| token.replace('’', "'").to_lowercase())
    }
}

impl ResponseClassifier for HeuristicClassifier {
    fn classify(&self, response: &str) -> ResponseAnalysis {
        let word_count = response.split_whitespace().count();
        let depth = if word_count > DEEP_WORD_COUNT {
            Depth::Deep
        } else if word_count > MODERATE_WORD_COUNT {
            Depth::Moderate
        } else {
            Depth::Shallow
        };

        let mut first_person = false;
        let mut emotional = false;
        for token in Self::tokens(response) {
            first_person |= FIRST_PERSON_MARKERS.contains(&token.as_str());
            emotional |= EMOTION_LEXICON.contains(&token.as_str());
        }

        ResponseAnalysis {
            depth,
            honesty: if first_person && emotional {
                Honesty::High
            } else {
                Honesty::Low
            },
            self_awareness: if first_person {
                SelfAwareness::Present
            } else {
                SelfAwareness::Absent
            },
        }
    }
}
