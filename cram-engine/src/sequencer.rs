//! Builds the ordered list of study units for a session: a head segment that is
//! exactly the base collection order (or a searched subset of it), followed by a
//! tail of re-queued items the learner was weak on.

use std::collections::BTreeSet;

use im::Vector;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Stable identity for a study item, derived from its question content.
///
/// Cards have no independent numeric id at session-build time, but question text is
/// unique within a card, so its hash serves as the identity key.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ItemKey(pub u64);

impl ItemKey {
    pub fn of_question(question: &str) -> Self {
        Self(xxh3_64(question.as_bytes()))
    }
}

/// One flashcard's content unit within a session. Immutable once the session starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyItem {
    pub key: ItemKey,
    pub question: String,
    pub answer: String,
    /// 1-based index in the unfiltered base collection. Bookmarks and checkpoints
    /// always refer to this, regardless of which view is currently rendered.
    pub original_position: usize,
    /// True for clones re-appended to the session tail after a low-confidence rating.
    pub is_requeue: bool,
}

/// Raw card content as it comes from the item source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub question: String,
    pub answer: String,
}

impl NewItem {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Case-insensitive substring search over question and answer text. Filtered
/// browsing is ephemeral: nothing is bookmarked or persisted while one is active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchFilter {
    query: String,
}

impl SearchFilter {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.trim().to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn matches(&self, item: &StudyItem) -> bool {
        item.question.to_lowercase().contains(&self.query)
            || item.answer.to_lowercase().contains(&self.query)
    }
}

/// Assign identity keys and 1-based original positions to the base collection.
pub(crate) fn build_base(items: Vec<NewItem>) -> Vec<StudyItem> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| StudyItem {
            key: ItemKey::of_question(&item.question),
            question: item.question,
            answer: item.answer,
            original_position: index + 1,
            is_requeue: false,
        })
        .collect()
}

/// The head segment of a session queue: base order, optionally narrowed by a filter.
pub(crate) fn build_head(base: &[StudyItem], filter: Option<&SearchFilter>) -> Vector<StudyItem> {
    base.iter()
        .filter(|item| filter.is_none_or(|f| f.matches(item)))
        .cloned()
        .collect()
}

/// Append a requeue clone to the tail. Returns a new queue; the caller replaces its
/// reference. The tail is append-only for the life of a session.
pub(crate) fn append_requeue(queue: &Vector<StudyItem>, item: &StudyItem) -> Vector<StudyItem> {
    let mut extended = queue.clone();
    extended.push_back(StudyItem {
        is_requeue: true,
        ..item.clone()
    });
    extended
}

/// Rebuild the queue for a changed filter: new head from the base collection, then
/// the surviving requeue tail. Tail entries whose item no longer appears in the head
/// are dropped, so no item is ever requeued before its first appearance.
pub(crate) fn refilter(
    base: &[StudyItem],
    old_queue: &Vector<StudyItem>,
    filter: Option<&SearchFilter>,
) -> Vector<StudyItem> {
    let mut queue = build_head(base, filter);
    let head_keys: BTreeSet<ItemKey> = queue.iter().map(|item| item.key).collect();
    for item in old_queue.iter() {
        if item.is_requeue && head_keys.contains(&item.key) {
            queue.push_back(item.clone());
        }
    }
    queue
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<StudyItem> {
        build_base(vec![
            NewItem::new("what is ownership", "a set of rules the compiler checks"),
            NewItem::new("what is borrowing", "referencing without taking ownership"),
            NewItem::new("what is a lifetime", "the scope a reference is valid for"),
        ])
    }

    #[test]
    fn base_items_get_one_based_positions() {
        let base = base();
        assert_eq!(
            base.iter().map(|i| i.original_position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(base.iter().all(|i| !i.is_requeue));
    }

    #[test]
    fn identity_key_depends_only_on_question() {
        let a = ItemKey::of_question("what is ownership");
        let b = ItemKey::of_question("what is ownership");
        let c = ItemKey::of_question("what is borrowing");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn filtered_head_keeps_original_positions() {
        let base = base();
        let filter = SearchFilter::new("LIFETIME");
        let head = build_head(&base, Some(&filter));
        assert_eq!(head.len(), 1);
        assert_eq!(head[0].original_position, 3);
    }

    #[test]
    fn append_requeue_leaves_the_source_queue_untouched() {
        let base = base();
        let queue = build_head(&base, None);
        let extended = append_requeue(&queue, &queue[0]);
        assert_eq!(queue.len(), 3);
        assert_eq!(extended.len(), 4);
        assert!(extended[3].is_requeue);
        assert_eq!(extended[3].key, queue[0].key);
        assert_eq!(extended[3].original_position, 1);
    }

    #[test]
    fn refilter_drops_tail_items_missing_from_the_new_head() {
        let base = base();
        let queue = build_head(&base, None);
        let queue = append_requeue(&queue, &queue[0]); // requeue "ownership"
        let queue = append_requeue(&queue, &queue[2]); // requeue "lifetime"

        let filter = SearchFilter::new("lifetime");
        let narrowed = refilter(&base, &queue, Some(&filter));
        // Head is just the lifetime card; only its requeue clone survives.
        assert_eq!(narrowed.len(), 2);
        assert!(!narrowed[0].is_requeue);
        assert!(narrowed[1].is_requeue);
        assert_eq!(narrowed[1].original_position, 3);

        let widened = refilter(&base, &queue, None);
        assert_eq!(widened.len(), 5);
    }

    #[test]
    fn empty_base_builds_an_empty_queue() {
        let head = build_head(&[], None);
        assert!(head.is_empty());
    }
}
