//! 📯 Herald - change notifications for whoever renders the journey
//!
//! Engines publish `EngineEvent`s, subscribers receive them on plain
//! channels. Dropped receivers are pruned on the next publish.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use uuid::Uuid;

use crate::logos::RevelationMood;
use crate::whispers::WhisperCategory;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    WhisperIssued {
        whisper_id: String,
        category: WhisperCategory,
    },
    WhisperAnswered {
        whisper_id: String,
    },
    WhisperSkipped {
        whisper_id: String,
        lockout_until: DateTime<Utc>,
    },
    WhisperBurned {
        whisper_id: String,
    },
    LockoutCleared,
    RevelationGenerated {
        whisper_id: String,
        mood: RevelationMood,
        has_sigil: bool,
    },
    RevelationSealed {
        sealed_id: Uuid,
        chapter: u32,
        page: u32,
    },
    ArchetypeUnlocked {
        archetype_id: String,
        name: String,
        revelation_id: Option<Uuid>,
    },
    UnlockDismissed {
        archetype_id: String,
    },
}

/// Cheap to clone; every clone publishes to the same subscribers
#[derive(Clone, Default)]
pub struct Herald {
    subscribers: Arc<Mutex<Vec<Sender<EngineEvent>>>>,
}

impl Herald {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: EngineEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_and_prune() {
        let herald = Herald::new();
        let first = herald.subscribe();
        let second = herald.subscribe();

        herald.publish(EngineEvent::LockoutCleared);
        assert_eq!(first.try_recv().unwrap(), EngineEvent::LockoutCleared);
        assert_eq!(second.try_recv().unwrap(), EngineEvent::LockoutCleared);

        drop(second);
        herald.publish(EngineEvent::LockoutCleared);
        assert_eq!(herald.subscriber_count(), 1);
        assert!(first.try_recv().is_ok());
    }
}
