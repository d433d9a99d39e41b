//! Record id allocation

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out unique, increasing record ids.
///
/// Seeded past the largest id found in the journal so ids keep increasing
/// across restarts. Ids are drawn while the writer holds exclusive access,
/// so issuance order matches buffer order; an append that fails to persist
/// leaves a gap.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Allocator whose first id follows `max_seen` (or is 1).
    pub fn after(max_seen: Option<u64>) -> Self {
        Self {
            next: AtomicU64::new(max_seen.map_or(1, |max| max.saturating_add(1))),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to `next_id` returns.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Moves the counter past `max_seen`; never moves it backwards.
    pub fn advance_past(&self, max_seen: Option<u64>) {
        if let Some(max) = max_seen {
            self.next.fetch_max(max.saturating_add(1), Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one() {
        let ids = IdAllocator::after(None);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn test_seeded_past_journal_max() {
        let ids = IdAllocator::after(Some(41));
        assert_eq!(ids.peek(), 42);
        assert_eq!(ids.next_id(), 42);
    }

    #[test]
    fn test_advance_never_rewinds() {
        let ids = IdAllocator::after(Some(10));
        ids.advance_past(Some(3));
        assert_eq!(ids.peek(), 11);
        ids.advance_past(Some(20));
        assert_eq!(ids.peek(), 21);
        ids.advance_past(None);
        assert_eq!(ids.peek(), 21);
    }

    #[test]
    fn test_seed_at_top_of_range_does_not_wrap() {
        let ids = IdAllocator::after(Some(u64::MAX));
        assert_eq!(ids.peek(), u64::MAX);
        ids.advance_past(Some(u64::MAX));
        assert_eq!(ids.peek(), u64::MAX);
    }
}
