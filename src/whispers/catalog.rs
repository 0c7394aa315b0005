//! 🌑 Whisper catalog - the finite pool of prompts
//!
//! Pure data. Ids are stable slugs so the answered/skipped exclusion
//! keeps working across restarts.

use serde::{Deserialize, Serialize};

/// Categories of whispers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WhisperCategory {
    ShadowWork,
    Revelation,
    Truth,
    Memory,
    Resistance,
}

impl WhisperCategory {
    pub const ALL: [WhisperCategory; 5] = [
        WhisperCategory::ShadowWork,
        WhisperCategory::Revelation,
        WhisperCategory::Truth,
        WhisperCategory::Memory,
        WhisperCategory::Resistance,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            WhisperCategory::ShadowWork => "Confront your inner darkness",
            WhisperCategory::Revelation => "Receive divine insight",
            WhisperCategory::Truth => "Face your deepest truths",
            WhisperCategory::Memory => "Remember what was forgotten",
            WhisperCategory::Resistance => "Overcome your barriers",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            WhisperCategory::ShadowWork => "🌑",
            WhisperCategory::Revelation => "✨",
            WhisperCategory::Truth => "🔮",
            WhisperCategory::Memory => "💭",
            WhisperCategory::Resistance => "🛡️",
        }
    }
}

impl std::fmt::Display for WhisperCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhisperCategory::ShadowWork => write!(f, "Shadow Work"),
            WhisperCategory::Revelation => write!(f, "Revelation"),
            WhisperCategory::Truth => write!(f, "Truth"),
            WhisperCategory::Memory => write!(f, "Memory"),
            WhisperCategory::Resistance => write!(f, "Resistance"),
        }
    }
}

impl std::str::FromStr for WhisperCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "shadowwork" | "shadow" => Ok(WhisperCategory::ShadowWork),
            "revelation" => Ok(WhisperCategory::Revelation),
            "truth" => Ok(WhisperCategory::Truth),
            "memory" => Ok(WhisperCategory::Memory),
            "resistance" => Ok(WhisperCategory::Resistance),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Lifecycle status of a whisper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhisperStatus {
    Pending,
    Answered,
    Skipped,
}

/// A single prompt and, once acted on, its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Whisper {
    pub id: String,
    pub question: String,
    pub category: WhisperCategory,
    pub requires_response: bool,
    #[serde(default)]
    pub unlock_condition: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub answered_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub skipped_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Whisper {
    pub fn new(id: impl Into<String>, question: impl Into<String>, category: WhisperCategory) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            category,
            requires_response: true,
            unlock_condition: None,
            response: None,
            answered_at: None,
            skipped_at: None,
        }
    }

    /// Marks the whisper as answerable with an empty response
    pub fn with_optional_response(mut self) -> Self {
        self.requires_response = false;
        self
    }

    /// Whether `response` is an acceptable answer to this whisper
    pub fn accepts(&self, response: &str) -> bool {
        !self.requires_response || !response.trim().is_empty()
    }

    pub fn with_unlock_condition(mut self, condition: impl Into<String>) -> Self {
        self.unlock_condition = Some(condition.into());
        self
    }

    pub fn is_answered(&self) -> bool {
        self.answered_at.is_some()
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped_at.is_some()
    }

    pub fn status(&self) -> WhisperStatus {
        if self.is_answered() {
            WhisperStatus::Answered
        } else if self.is_skipped() {
            WhisperStatus::Skipped
        } else {
            WhisperStatus::Pending
        }
    }
}

const CATALOG: &[(&str, &str, WhisperCategory)] = &[
    ("shadow-seeks-light", "What shadow within you seeks the light?", WhisperCategory::ShadowWork),
    ("shadow-disowned", "Which part of yourself do you hide even from those closest to you?", WhisperCategory::ShadowWork),
    ("shadow-envy", "Whose life do you secretly envy, and what does that envy reveal?", WhisperCategory::ShadowWork),
    ("revelation-awaits", "What revelation awaits your awakening?", WhisperCategory::Revelation),
    ("revelation-sign", "What sign have you been given that you chose not to read?", WhisperCategory::Revelation),
    ("revelation-changed", "When did you last feel something shift inside you for good?", WhisperCategory::Revelation),
    ("truth-avoided", "What truth have you been avoiding?", WhisperCategory::Truth),
    ("truth-unspoken", "What would you say if no one could ever hold it against you?", WhisperCategory::Truth),
    ("truth-mask", "Which mask do you wear most often, and who is it for?", WhisperCategory::Truth),
    ("memory-haunts", "What memory haunts your dreams?", WhisperCategory::Memory),
    ("memory-first-loss", "What did you lose first, and what did it teach you?", WhisperCategory::Memory),
    ("memory-forgotten-self", "Who were you before the world told you who to be?", WhisperCategory::Memory),
    ("resistance-purpose", "What resistance keeps you from your purpose?", WhisperCategory::Resistance),
    ("resistance-comfort", "Which comfort are you unwilling to give up, even for what you want?", WhisperCategory::Resistance),
    ("resistance-fear", "What fear disguises itself as reason in your life?", WhisperCategory::Resistance),
];

/// The full catalog in fixed order
pub fn catalog() -> Vec<Whisper> {
    CATALOG
        .iter()
        .map(|(id, question, category)| Whisper::new(*id, *question, *category))
        .collect()
}

pub fn catalog_entry(id: &str) -> Option<Whisper> {
    CATALOG
        .iter()
        .find(|(entry_id, _, _)| *entry_id == id)
        .map(|(id, question, category)| Whisper::new(*id, *question, *category))
}
