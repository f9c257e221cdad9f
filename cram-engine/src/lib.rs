//! Review session engine for cram.
//!
//! A session sequences the study items of one card, flips between question and
//! answer, collects a confidence rating per item, re-queues items the learner is
//! weak on, and keeps a resumable position in sync with a remote checkpoint and
//! an addressable bookmark token.
//!
//! The engine is a pure in-memory state machine mutated by discrete host events.
//! It owns no event loop: every operation takes `now`, and the two timer-driven
//! behaviors (the animated item transition and the persistence debounce) are
//! stored deadlines serviced by [`SessionEngine::tick`]. [`next_deadline`]
//! tells the host when the next tick is worth making.
//!
//! [`next_deadline`]: SessionEngine::next_deadline

mod bookmark;
mod checkpoint;
mod cursor;
mod rating;
mod sequencer;

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};

use satchel::{BookmarkSlot, ProgressStore};

use crate::checkpoint::CheckpointSync;
use crate::cursor::Cursor;

pub use crate::cursor::{Direction, TransitionPhase};
pub use crate::rating::{Rating, RatingOutcome};
pub use crate::sequencer::{ItemKey, NewItem, SearchFilter, StudyItem};

/// Per-session configuration. Durations are fixed for the session's lifetime;
/// tests shrink them to drive time quickly.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub card_id: String,
    /// When false the learner is anonymous: no checkpoint reads or writes, no
    /// bookmark publishes, a purely in-memory session.
    pub authenticated: bool,
    /// Length of each transition leg (exit animation, enter animation).
    pub transition: Duration,
    /// Debounce window for checkpoint writes.
    pub debounce: Duration,
}

impl SessionConfig {
    pub fn new(card_id: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            authenticated: false,
            transition: Duration::milliseconds(200),
            debounce: Duration::seconds(3),
        }
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }
}

/// Coarse session state the UI branches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// The card has no items; the cursor state machine is never entered.
    Empty,
    Active,
    Finished,
}

/// Counts for the end-of-session summary view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub completed: usize,
    pub requeued: usize,
}

/// One review session over one card. Created when the learner opens the review
/// view, destroyed (flushing any pending checkpoint) when they navigate away.
pub struct SessionEngine<S: ProgressStore, B: BookmarkSlot> {
    config: SessionConfig,
    base: Vec<StudyItem>,
    queue: Vector<StudyItem>,
    filter: Option<SearchFilter>,
    cursor: Cursor,
    completed: BTreeSet<ItemKey>,
    checkpoint: CheckpointSync,
    finished: bool,
    store: S,
    bookmark: B,
}

impl<S: ProgressStore, B: BookmarkSlot> SessionEngine<S, B> {
    /// Build the session queue and seed the cursor.
    ///
    /// Seeding order: the bookmark token if present and resolvable, then the
    /// remote checkpoint (read here, once, and never again mid-session), then
    /// position 0 with a `"1"` token published. Anonymous sessions skip all of
    /// it and start at 0.
    pub fn new(config: SessionConfig, items: Vec<NewItem>, store: S, bookmark: B) -> Self {
        let base = sequencer::build_base(items);
        let queue = sequencer::build_head(&base, None);

        let mut engine = Self {
            base,
            queue,
            filter: None,
            cursor: Cursor::new(),
            completed: BTreeSet::new(),
            checkpoint: CheckpointSync::new(0),
            finished: false,
            store,
            bookmark,
            config,
        };

        if engine.base.is_empty() {
            log::info!("session for {} has no items", engine.config.card_id);
            return engine;
        }

        if engine.config.authenticated {
            engine.seed_position();
        }
        log::info!(
            "session for {} created with {} items at position {}",
            engine.config.card_id,
            engine.base.len(),
            engine.cursor.position + 1
        );
        engine
    }

    fn seed_position(&mut self) {
        let base_len = self.base.len();
        let confirmed = match self.store.read(&self.config.card_id) {
            Ok(checkpoint) => checkpoint.map(|c| c.last_position).unwrap_or(0),
            Err(e) => {
                log::warn!("failed to read checkpoint for {}: {e}", self.config.card_id);
                0
            }
        };
        self.checkpoint = CheckpointSync::new(confirmed);

        if let Some(position) = bookmark::seed(&self.bookmark, base_len) {
            self.cursor = Cursor::at(position);
        } else if (1..=base_len as u32).contains(&confirmed) {
            self.cursor = Cursor::at(confirmed as usize - 1);
            bookmark::publish(&mut self.bookmark, confirmed as usize);
        } else {
            self.cursor = Cursor::at(0);
            bookmark::publish(&mut self.bookmark, 1);
        }
    }

    // =======
    // host-facing state
    // =======

    pub fn phase(&self) -> SessionPhase {
        if self.base.is_empty() {
            SessionPhase::Empty
        } else if self.finished {
            SessionPhase::Finished
        } else {
            SessionPhase::Active
        }
    }

    pub fn current_item(&self) -> Option<&StudyItem> {
        self.queue.get(self.cursor.position)
    }

    pub fn current_position(&self) -> usize {
        self.cursor.position
    }

    pub fn is_revealed(&self) -> bool {
        self.cursor.revealed
    }

    pub fn transition_phase(&self) -> TransitionPhase {
        self.cursor.phase()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn completion_count(&self) -> usize {
        self.completed.len()
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// The session queue in order, for the gallery/dropdown picker.
    pub fn items(&self) -> impl Iterator<Item = &StudyItem> {
        self.queue.iter()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total: self.base.len(),
            completed: self.completed.len(),
            requeued: self.queue.iter().filter(|item| item.is_requeue).count(),
        }
    }

    /// When the host should next call [`tick`](Self::tick). `None` while no
    /// transition or debounce timer is armed.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match (self.cursor.next_deadline(), self.checkpoint.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bookmark(&self) -> &B {
        &self.bookmark
    }

    // =======
    // operations
    // =======

    /// Service elapsed deadlines: complete transition legs (mutating the
    /// position when the exit leg ends) and fire a due checkpoint write.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if let Some(direction) = self.cursor.tick(now, self.config.transition) {
            let len = self.queue.len();
            if len > 0 {
                self.cursor.position = match direction {
                    Direction::Forward => (self.cursor.position + 1) % len,
                    Direction::Backward => (self.cursor.position + len - 1) % len,
                };
            }
            self.on_item_changed(now);
        }
        // Requeue traversal must not move the resumable checkpoint: the pending
        // write stays armed until a canonical item is current again.
        let on_requeue = self.current_item().is_some_and(|item| item.is_requeue);
        if !on_requeue {
            self.checkpoint.flush_due(
                &mut self.store,
                &self.config.card_id,
                self.config.authenticated,
                now,
            );
        }
    }

    /// Begin an animated move. Forward from the last index of an unfiltered
    /// queue is end-of-sequence and fires completion instead.
    pub fn advance(&mut self, direction: Direction, now: DateTime<Utc>) {
        if self.phase() != SessionPhase::Active || self.queue.is_empty() {
            log::debug!("advance ignored: session not active");
            return;
        }
        if !self.cursor.is_idle() {
            log::debug!("advance ignored: transition in flight");
            return;
        }
        self.checkpoint.mark_interacted();

        let at_last = self.cursor.position + 1 == self.queue.len();
        if direction == Direction::Forward && at_last && self.filter.is_none() {
            self.complete();
            return;
        }
        self.cursor.begin_move(direction, now, self.config.transition);
    }

    /// Show the answer side of the current item. Idempotent; the rating prompt
    /// becomes available once revealed.
    pub fn reveal(&mut self) {
        if self.phase() != SessionPhase::Active || self.queue.is_empty() {
            return;
        }
        if !self.cursor.is_idle() {
            log::debug!("reveal ignored: transition in flight");
            return;
        }
        self.checkpoint.mark_interacted();
        self.cursor.revealed = true;
    }

    /// Record a confidence rating for the revealed item, then move forward.
    ///
    /// A weak rating appends the requeue clone before the forward move is
    /// evaluated, so rating the last head item as weak never completes the
    /// session: the end-of-sequence check sees the freshly grown queue.
    pub fn rate(&mut self, rating: Rating, now: DateTime<Utc>) {
        if self.phase() != SessionPhase::Active || !self.cursor.is_idle() {
            log::debug!("rating ignored: session not ready for input");
            return;
        }
        if !self.cursor.revealed {
            log::debug!("rating ignored: item not revealed");
            return;
        }
        let Some(item) = self.current_item().cloned() else {
            return;
        };

        let outcome = rating.outcome();
        if outcome.completes {
            self.completed.insert(item.key);
        }
        if outcome.requeues {
            self.queue = sequencer::append_requeue(&self.queue, &item);
        }
        self.advance(Direction::Forward, now);
    }

    /// Jump straight to a queue index, bypassing the animated transition.
    /// Out-of-range targets clamp to the nearest valid index. Re-selecting the
    /// current index toggles the reveal instead (click-to-flip).
    pub fn jump_to(&mut self, index: usize, now: DateTime<Utc>) {
        if self.phase() != SessionPhase::Active || self.queue.is_empty() {
            return;
        }
        self.checkpoint.mark_interacted();
        let target = index.min(self.queue.len() - 1);
        if target == self.cursor.position && self.cursor.is_idle() {
            self.cursor.revealed = !self.cursor.revealed;
            return;
        }
        self.cursor.snap(target);
        self.on_item_changed(now);
    }

    /// Jump to the first queue occurrence of an item identity.
    pub fn select_item(&mut self, key: ItemKey, now: DateTime<Utc>) {
        let Some(index) = self.queue.iter().position(|item| item.key == key) else {
            log::debug!("select ignored: item {key:?} not in session queue");
            return;
        };
        self.jump_to(index, now);
    }

    /// Narrow the head segment to items matching `query`. Filtered browsing is
    /// ephemeral: the cursor resets, requeue-tail entries whose item left the
    /// head are dropped, and nothing is bookmarked or persisted until cleared.
    pub fn set_filter(&mut self, query: &str, now: DateTime<Utc>) {
        if self.phase() != SessionPhase::Active {
            return;
        }
        let filter = SearchFilter::new(query);
        if filter.is_empty() {
            self.clear_filter(now);
            return;
        }
        self.queue = sequencer::refilter(&self.base, &self.queue, Some(&filter));
        self.filter = Some(filter);
        self.cursor.snap(0);
    }

    /// Restore the canonical unfiltered head. The cursor stays on the current
    /// item where possible, and the bookmark and checkpoint catch up with the
    /// landing position now that it is canonical again.
    pub fn clear_filter(&mut self, now: DateTime<Utc>) {
        if self.phase() != SessionPhase::Active || self.filter.is_none() {
            return;
        }
        let current_key = self.current_item().map(|item| item.key);
        self.queue = sequencer::refilter(&self.base, &self.queue, None);
        self.filter = None;
        let position = current_key
            .and_then(|key| self.queue.iter().position(|item| item.key == key))
            .unwrap_or(0);
        self.cursor.snap(position);
        self.on_item_changed(now);
    }

    /// Re-create the session from scratch: fresh unfiltered queue, cursor at 0,
    /// empty completion set, zero checkpoint sent fire-and-forget.
    pub fn restart(&mut self) {
        if self.base.is_empty() {
            return;
        }
        self.queue = sequencer::build_head(&self.base, None);
        self.filter = None;
        self.cursor = Cursor::new();
        self.completed.clear();
        self.finished = false;
        self.checkpoint.restart(
            &mut self.store,
            &self.config.card_id,
            self.config.authenticated,
        );
        if self.config.authenticated {
            bookmark::publish(&mut self.bookmark, 1);
        }
        log::info!("session for {} restarted", self.config.card_id);
    }

    /// Tear the session down, best-effort flushing a pending checkpoint that
    /// differs from the last confirmed one. Returns the I/O edges to the host.
    pub fn destroy(mut self) -> (S, B) {
        self.checkpoint.flush_on_teardown(
            &mut self.store,
            &self.config.card_id,
            self.config.authenticated,
        );
        (self.store, self.bookmark)
    }

    // =======
    // internals
    // =======

    /// The cursor landed on a new item. Publishing and persistence follow the
    /// canonical-position rules: never while filtered, never for a requeue
    /// clone, never for anonymous learners.
    fn on_item_changed(&mut self, now: DateTime<Utc>) {
        let Some(item) = self.queue.get(self.cursor.position) else {
            return;
        };
        if self.filter.is_some() || item.is_requeue || !self.config.authenticated {
            return;
        }
        let original_position = item.original_position;
        bookmark::publish(&mut self.bookmark, original_position);
        self.checkpoint
            .schedule(original_position as u32, now, self.config.debounce);
    }

    /// Terminal transition. Only the first call per session generation performs
    /// the side effects; the definitive checkpoint is the unfiltered item
    /// count, not the grown queue length.
    fn complete(&mut self) {
        if self.finished {
            log::debug!("completion already fired for {}", self.config.card_id);
            return;
        }
        self.finished = true;
        self.checkpoint.complete(
            &mut self.store,
            &self.config.card_id,
            self.config.authenticated,
            self.base.len() as u32,
        );
        log::info!(
            "session for {} finished: {} of {} items rated confident",
            self.config.card_id,
            self.completed.len(),
            self.base.len()
        );
    }
}
