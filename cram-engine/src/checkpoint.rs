//! Debounced, deduplicated persistence of "last reached position".
//!
//! At most one write is ever pending; scheduling a new one replaces the unfired
//! timer. Write failures are swallowed and logged: `last_confirmed` does not
//! advance, so the next independent trigger retries the same value. Across two
//! concurrent sessions the store is last-write-wins; no reconciliation.

use chrono::{DateTime, Duration, Utc};
use satchel::ProgressStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingWrite {
    position: u32,
    due: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub(crate) struct CheckpointSync {
    last_confirmed: u32,
    pending: Option<PendingWrite>,
    interacted: bool,
}

impl CheckpointSync {
    pub fn new(last_confirmed: u32) -> Self {
        Self {
            last_confirmed,
            pending: None,
            interacted: false,
        }
    }

    pub fn mark_interacted(&mut self) {
        self.interacted = true;
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.map(|p| p.due)
    }

    /// Schedule a debounced write of `position`. A value we already confirmed
    /// supersedes any unfired write.
    pub fn schedule(&mut self, position: u32, now: DateTime<Utc>, debounce: Duration) {
        if position == self.last_confirmed {
            self.pending = None;
            return;
        }
        self.pending = Some(PendingWrite {
            position,
            due: now + debounce,
        });
    }

    /// Fire the pending write if its debounce window has elapsed.
    pub fn flush_due(
        &mut self,
        store: &mut impl ProgressStore,
        card_id: &str,
        authenticated: bool,
        now: DateTime<Utc>,
    ) {
        let Some(pending) = self.pending else { return };
        if pending.due > now {
            return;
        }
        self.pending = None;
        self.send(store, card_id, authenticated, pending.position);
    }

    /// Best-effort flush on session teardown. Only fires if the learner
    /// interacted at least once and the pending value differs from the last
    /// confirmed one.
    pub fn flush_on_teardown(
        &mut self,
        store: &mut impl ProgressStore,
        card_id: &str,
        authenticated: bool,
    ) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if !self.interacted || pending.position == self.last_confirmed {
            return;
        }
        self.send(store, card_id, authenticated, pending.position);
    }

    /// Explicit restart: cancel any pending write, send `0` fire-and-forget,
    /// and start a fresh generation.
    pub fn restart(
        &mut self,
        store: &mut impl ProgressStore,
        card_id: &str,
        authenticated: bool,
    ) {
        self.pending = None;
        self.interacted = false;
        self.last_confirmed = 0;
        if authenticated && let Err(e) = store.write(card_id, 0) {
            log::warn!("failed to reset checkpoint for {card_id}: {e}");
        }
    }

    /// The definitive "fully completed" write: the unfiltered item count,
    /// sent immediately with any pending write cancelled.
    pub fn complete(
        &mut self,
        store: &mut impl ProgressStore,
        card_id: &str,
        authenticated: bool,
        item_count: u32,
    ) {
        self.pending = None;
        self.send(store, card_id, authenticated, item_count);
    }

    fn send(
        &mut self,
        store: &mut impl ProgressStore,
        card_id: &str,
        authenticated: bool,
        position: u32,
    ) {
        if !authenticated {
            return;
        }
        match store.write(card_id, position) {
            Ok(()) => self.last_confirmed = position,
            // last_confirmed stays put, so a later schedule of the same value retries
            Err(e) => log::warn!("failed to persist checkpoint {position} for {card_id}: {e}"),
        }
    }
}
