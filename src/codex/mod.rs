//! 📖 Codex - the append-only, chapter-paginated ledger of sealed revelations
//!
//! Entries are never edited or removed. A failed write rolls the seal back
//! so the in-memory ledger always matches what was persisted.

pub mod chapter;

pub use chapter::{Chapter, SealedRevelation, CHAPTER_CAPACITY, CHAPTER_TITLES};

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult, StorageError};
use crate::herald::{EngineEvent, Herald};
use crate::logos::Revelation;
use crate::totems::vault::CODEX_KEY;
use crate::totems::{Clock, Vault};

pub struct Codex {
    chapters: Vec<Chapter>,
    vault: Vault,
    clock: Arc<dyn Clock>,
    herald: Herald,
}

impl Codex {
    pub fn load(vault: Vault, clock: Arc<dyn Clock>, herald: Herald) -> EngineResult<Self> {
        let chapters: Vec<Chapter> = vault
            .load(CODEX_KEY)
            .map_err(|e| EngineError::persistence(CODEX_KEY, e))?
            .unwrap_or_default();

        check_ledger(&chapters).map_err(|reason| {
            EngineError::persistence(
                CODEX_KEY,
                StorageError::Corrupt {
                    key: CODEX_KEY.to_string(),
                    reason,
                },
            )
        })?;

        debug!("Codex restored with {} chapters", chapters.len());
        Ok(Self {
            chapters,
            vault,
            clock,
            herald,
        })
    }

    /// Appends a revelation to the last chapter, opening a new one when full
    pub fn seal_revelation(&mut self, revelation: Revelation) -> EngineResult<SealedRevelation> {
        let opened = self.chapters.last().map_or(true, Chapter::is_full);
        if opened {
            let chapter = Chapter::open(self.chapters.len());
            debug!("Opening chapter {}: {}", chapter.number, chapter.title);
            self.chapters.push(chapter);
        }

        let sealed_at = self.clock.now();
        let Some(chapter) = self.chapters.last_mut() else {
            return Err(EngineError::not_found("chapter", "last"));
        };
        let sealed = SealedRevelation {
            id: Uuid::new_v4(),
            revelation,
            sealed_at,
            chapter: chapter.number,
            page: chapter.revelations.len() as u32 + 1,
        };
        chapter.revelations.push(sealed.clone());
        debug_assert!(check_ledger(&self.chapters).is_ok());

        if let Err(source) = self.vault.save(CODEX_KEY, &self.chapters) {
            warn!("Seal rolled back: {}", source);
            self.rollback_last(opened);
            return Err(EngineError::persistence(CODEX_KEY, source));
        }

        info!(
            "Revelation sealed: chapter {} page {}",
            sealed.chapter, sealed.page
        );
        self.herald.publish(EngineEvent::RevelationSealed {
            sealed_id: sealed.id,
            chapter: sealed.chapter,
            page: sealed.page,
        });
        Ok(sealed)
    }

    fn rollback_last(&mut self, opened_chapter: bool) {
        if let Some(chapter) = self.chapters.last_mut() {
            chapter.revelations.pop();
        }
        if opened_chapter {
            self.chapters.pop();
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, number: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.number == number)
    }

    /// Entries of chapter `number`, empty when the chapter does not exist
    pub fn revelations_in_chapter(&self, number: u32) -> &[SealedRevelation] {
        self.chapter(number)
            .map(|c| c.revelations.as_slice())
            .unwrap_or(&[])
    }

    pub fn revelation_by_id(&self, id: Uuid) -> EngineResult<&SealedRevelation> {
        self.chapters
            .iter()
            .flat_map(|c| c.revelations.iter())
            .find(|r| r.id == id)
            .ok_or_else(|| EngineError::not_found("sealed revelation", id))
    }

    /// Entry sealed from the revelation with `response_id`, if any
    pub fn find_by_response(&self, response_id: Uuid) -> Option<&SealedRevelation> {
        self.chapters
            .iter()
            .flat_map(|c| c.revelations.iter())
            .find(|r| r.revelation.response_id == response_id)
    }

    /// Every entry in ledger order
    pub fn all_revelations(&self) -> Vec<&SealedRevelation> {
        self.chapters
            .iter()
            .flat_map(|c| c.revelations.iter())
            .collect()
    }

    pub fn total_revelations(&self) -> usize {
        self.chapters.iter().map(Chapter::len).sum()
    }

    pub fn latest(&self) -> Option<&SealedRevelation> {
        self.chapters.last().and_then(|c| c.revelations.last())
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        check_ledger(&self.chapters)
    }
}

/// Chapters numbered 1..N without gaps, pages 1..len, no empty or overfull chapter
fn check_ledger(chapters: &[Chapter]) -> Result<(), String> {
    for (index, chapter) in chapters.iter().enumerate() {
        let expected = index as u32 + 1;
        if chapter.number != expected {
            return Err(format!(
                "chapter at position {} is numbered {}",
                expected, chapter.number
            ));
        }
        if chapter.is_empty() || chapter.len() > CHAPTER_CAPACITY {
            return Err(format!(
                "chapter {} holds {} entries",
                chapter.number,
                chapter.len()
            ));
        }
        for (page_index, entry) in chapter.revelations.iter().enumerate() {
            if entry.chapter != chapter.number || entry.page != page_index as u32 + 1 {
                return Err(format!(
                    "entry {} is placed at {}:{} inside chapter {} slot {}",
                    entry.id,
                    entry.chapter,
                    entry.page,
                    chapter.number,
                    page_index + 1
                ));
            }
        }
    }
    Ok(())
}
