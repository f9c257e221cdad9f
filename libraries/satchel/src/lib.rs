//! This is a library defining the persistence edge of a cram review session.
//! It was created for Cram, so it doesn't include much that was not needed for that project.
//!
//! A review session has exactly two I/O edges:
//! 1. A remote progress store, keyed by card, holding the last position the learner reached.
//!    Writes are last-write-wins per (learner, card); the engine reads it once at session
//!    creation and never again, so no read-modify-write race exists within a session.
//! 2. An addressable bookmark token (in practice a URL parameter), used purely as a
//!    resumable, shareable position marker.
//!
//! Both edges are traits so the engine stays a pure in-memory state machine. The in-memory
//! implementations in [`memory`] back anonymous sessions and tests.

pub mod memory;

use serde::{Deserialize, Serialize};

/// The last position confirmed persisted for a (learner, card) pair.
///
/// Positions are 1-based indices into the unfiltered base collection; `0` means
/// "start from the beginning".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_position: u32,
}

/// Wire form of [`Checkpoint`]. New variants get added here when the payload evolves;
/// old payloads keep deserializing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum VersionedCheckpoint {
    V1(Checkpoint),
}

impl Checkpoint {
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(VersionedCheckpoint::from(*self))
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<VersionedCheckpoint>(json.clone()).map(Into::into)
    }
}

impl From<Checkpoint> for VersionedCheckpoint {
    fn from(checkpoint: Checkpoint) -> Self {
        VersionedCheckpoint::V1(checkpoint)
    }
}

impl From<VersionedCheckpoint> for Checkpoint {
    fn from(versioned: VersionedCheckpoint) -> Self {
        match versioned {
            VersionedCheckpoint::V1(checkpoint) => checkpoint,
        }
    }
}

/// Errors surfaced by a [`ProgressStore`]. The engine treats every variant as
/// diagnostics-only: a failed write is accepted loss of one checkpoint update.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("progress store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed checkpoint payload")]
    Payload(#[from] serde_json::Error),
}

/// Remote store of "last reached position", one scalar per (learner, card).
///
/// No transactional semantics: writes may be dropped by the network and callers
/// do not retry. The next session read simply resumes from an older position.
pub trait ProgressStore {
    fn read(&mut self, card_id: &str) -> Result<Option<Checkpoint>, StoreError>;

    fn write(&mut self, card_id: &str, position: u32) -> Result<(), StoreError>;
}

/// A get/set string key-value shared with the browsing history, used as a
/// resumable, shareable position marker.
pub trait BookmarkSlot {
    fn get(&self) -> Option<String>;

    fn set(&mut self, token: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_round_trips_through_versioned_payload() {
        let checkpoint = Checkpoint { last_position: 17 };
        let json = checkpoint.to_json().unwrap();
        assert_eq!(json["version"], "V1");
        assert_eq!(Checkpoint::from_json(&json).unwrap(), checkpoint);
    }

    #[test]
    fn unknown_version_is_a_payload_error() {
        let json = serde_json::json!({ "version": "V9", "last_position": 3 });
        assert!(Checkpoint::from_json(&json).is_err());
    }
}
