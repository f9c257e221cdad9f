//! In-memory implementations of the session's two I/O edges.
//!
//! These back anonymous sessions (which get a purely in-memory session) and tests,
//! which assert on the exact sequence of writes the engine performs.

use std::collections::BTreeMap;

use crate::{BookmarkSlot, Checkpoint, ProgressStore, StoreError};

/// A [`ProgressStore`] over a map, going through the versioned JSON payload the
/// way a remote store would. Records every successful write so tests can assert
/// on coalescing and ordering.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: BTreeMap<String, serde_json::Value>,
    writes: Vec<(String, u32)>,
    fail_next_write: bool,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a checkpoint, as if an earlier session had persisted it.
    pub fn with_checkpoint(mut self, card_id: &str, position: u32) -> Self {
        let checkpoint = Checkpoint {
            last_position: position,
        };
        let json = checkpoint
            .to_json()
            .unwrap_or_else(|_| serde_json::Value::Null);
        self.records.insert(card_id.to_string(), json);
        self
    }

    /// Make the next `write` call fail with [`StoreError::Unavailable`].
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> &[(String, u32)] {
        &self.writes
    }
}

impl ProgressStore for MemoryProgressStore {
    fn read(&mut self, card_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        match self.records.get(card_id) {
            Some(json) => Ok(Some(Checkpoint::from_json(json)?)),
            None => Ok(None),
        }
    }

    fn write(&mut self, card_id: &str, position: u32) -> Result<(), StoreError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        let checkpoint = Checkpoint {
            last_position: position,
        };
        self.records.insert(card_id.to_string(), checkpoint.to_json()?);
        self.writes.push((card_id.to_string(), position));
        Ok(())
    }
}

/// A [`BookmarkSlot`] over an `Option<String>`, keeping the history of published
/// tokens for tests.
#[derive(Debug, Default)]
pub struct MemoryBookmarkSlot {
    token: Option<String>,
    history: Vec<String>,
}

impl MemoryBookmarkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already present, as if the session was opened from a link.
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            history: Vec::new(),
        }
    }

    /// Every token published this session, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl BookmarkSlot for MemoryBookmarkSlot {
    fn get(&self) -> Option<String> {
        self.token.clone()
    }

    fn set(&mut self, token: &str) {
        self.token = Some(token.to_string());
        self.history.push(token.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_round_trips_a_checkpoint() {
        let mut store = MemoryProgressStore::new();
        store.write("card-1", 4).unwrap();
        let checkpoint = store.read("card-1").unwrap().unwrap();
        assert_eq!(checkpoint.last_position, 4);
        assert_eq!(store.writes(), &[("card-1".to_string(), 4)]);
    }

    #[test]
    fn missing_card_reads_as_none() {
        let mut store = MemoryProgressStore::new();
        assert!(store.read("card-1").unwrap().is_none());
    }

    #[test]
    fn injected_failure_drops_the_write() {
        let mut store = MemoryProgressStore::new();
        store.fail_next_write();
        assert!(store.write("card-1", 2).is_err());
        assert!(store.writes().is_empty());
        // The failure only affects one write
        store.write("card-1", 3).unwrap();
        assert_eq!(store.writes(), &[("card-1".to_string(), 3)]);
    }

    #[test]
    fn bookmark_slot_keeps_history() {
        let mut slot = MemoryBookmarkSlot::new();
        assert!(slot.get().is_none());
        slot.set("1");
        slot.set("2");
        assert_eq!(slot.get().as_deref(), Some("2"));
        assert_eq!(slot.history(), &["1".to_string(), "2".to_string()]);
    }
}
