//! Chapters and sealed entries of the codex

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logos::Revelation;

/// Entries per chapter
pub const CHAPTER_CAPACITY: usize = 10;

/// Titles assigned round-robin by chapter count at creation time
pub const CHAPTER_TITLES: [&str; 10] = [
    "The Awakening",
    "The Journey",
    "The Reflection",
    "The Transformation",
    "The Revelation",
    "The Wisdom",
    "The Truth",
    "The Path",
    "The Light",
    "The Shadow",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedRevelation {
    pub id: Uuid,
    pub revelation: Revelation,
    pub sealed_at: DateTime<Utc>,
    pub chapter: u32,
    pub page: u32,
}

impl SealedRevelation {
    pub fn formatted_date(&self) -> String {
        self.sealed_at.format("%B %-d, %Y at %H:%M").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Uuid,
    pub number: u32,
    pub title: String,
    pub revelations: Vec<SealedRevelation>,
}

impl Chapter {
    /// Empty chapter; `existing` is how many chapters precede it
    pub fn open(existing: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: existing as u32 + 1,
            title: CHAPTER_TITLES[existing % CHAPTER_TITLES.len()].to_string(),
            revelations: Vec::with_capacity(CHAPTER_CAPACITY),
        }
    }

    pub fn is_full(&self) -> bool {
        self.revelations.len() >= CHAPTER_CAPACITY
    }

    pub fn len(&self) -> usize {
        self.revelations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revelations.is_empty()
    }
}
