//! Two-way binding between the session position and the addressable bookmark
//! token: publish on landing on a canonical item, read once at session creation
//! to seed the cursor.
//!
//! The token always refers to the canonical unfiltered sequence. It is never
//! published while a search filter is active or while a requeue-tail item is
//! current; the engine enforces both at the call site.

use satchel::BookmarkSlot;

/// Publish a 1-based original position as the bookmark token.
pub(crate) fn publish(slot: &mut impl BookmarkSlot, original_position: usize) {
    slot.set(&original_position.to_string());
}

/// Read the token present at session creation. Resolvable means a 1-based
/// position within the base collection; anything else is "no bookmark".
/// Returns the 0-based cursor position to seed.
pub(crate) fn seed(slot: &impl BookmarkSlot, base_len: usize) -> Option<usize> {
    let token = slot.get()?;
    match token.trim().parse::<usize>() {
        Ok(position) if (1..=base_len).contains(&position) => Some(position - 1),
        Ok(position) => {
            log::debug!("bookmark token {position} out of range for {base_len} items, ignoring");
            None
        }
        Err(_) => {
            log::debug!("malformed bookmark token {token:?}, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel::memory::MemoryBookmarkSlot;

    #[test]
    fn valid_token_seeds_a_zero_based_position() {
        let slot = MemoryBookmarkSlot::with_token("3");
        assert_eq!(seed(&slot, 5), Some(2));
    }

    #[test]
    fn boundary_tokens_resolve() {
        let slot = MemoryBookmarkSlot::with_token("1");
        assert_eq!(seed(&slot, 5), Some(0));
        let slot = MemoryBookmarkSlot::with_token("5");
        assert_eq!(seed(&slot, 5), Some(4));
    }

    #[test]
    fn out_of_range_and_malformed_tokens_are_no_bookmark() {
        for token in ["0", "6", "-2", "abc", "2.5", ""] {
            let slot = MemoryBookmarkSlot::with_token(token);
            assert_eq!(seed(&slot, 5), None, "token {token:?}");
        }
        let slot = MemoryBookmarkSlot::new();
        assert_eq!(seed(&slot, 5), None);
    }

    #[test]
    fn publish_writes_the_decimal_token() {
        let mut slot = MemoryBookmarkSlot::new();
        publish(&mut slot, 4);
        assert_eq!(slot.get().as_deref(), Some("4"));
    }
}
