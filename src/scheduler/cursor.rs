//! Shared claim cursor: the single piece of cross-thread mutable state.

use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_utils::CachePadded;

/// Atomically-incremented cursor marking the next unclaimed index of one
/// half-open range. Owned by a single `parallel_for` invocation; every
/// worker holds a shared reference whose lifetime ends at the join barrier.
///
/// Claiming is one `fetch_add`: no lock, no compare-and-swap retry loop.
/// The cursor is cache-line padded so contending claims do not false-share
/// with neighboring stack data.
pub(crate) struct SharedCursor {
    /// Next unclaimed start offset. Overshoots `end` once the range is
    /// exhausted; the overshoot is harmless and never corrected.
    next: CachePadded<AtomicI64>,
    end: i64,
    chunk: i64,
}

impl SharedCursor {
    /// `chunk` must already be normalized to >= 1 by the caller.
    pub(crate) fn new(begin: i64, end: i64, chunk: i64) -> Self {
        debug_assert!(end > begin);
        debug_assert!(chunk >= 1);
        Self {
            next: CachePadded::new(AtomicI64::new(begin)),
            end,
            chunk,
        }
    }

    /// Claim the next span of at most `chunk` indices.
    ///
    /// Returns `Some((start, stop))` with `start < stop <= end`, or `None`
    /// once the range is exhausted. Each index in the range is handed out
    /// exactly once across all claimants.
    ///
    /// Relaxed ordering suffices: uniqueness of each claimed span follows
    /// from the atomicity of `fetch_add` alone, and the join barrier is
    /// what publishes callback effects back to the caller.
    pub(crate) fn claim(&self) -> Option<(i64, i64)> {
        let start = self.next.fetch_add(self.chunk, Ordering::Relaxed);
        if start >= self.end {
            return None;
        }
        Some((start, (start + self.chunk).min(self.end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_cover_range_without_overlap() {
        let cursor = SharedCursor::new(0, 10, 3);

        assert_eq!(cursor.claim(), Some((0, 3)));
        assert_eq!(cursor.claim(), Some((3, 6)));
        assert_eq!(cursor.claim(), Some((6, 9)));
        assert_eq!(cursor.claim(), Some((9, 10)));
        assert_eq!(cursor.claim(), None);
        // Exhaustion is sticky.
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn final_claim_is_clamped_to_end() {
        let cursor = SharedCursor::new(5, 7, 100);
        assert_eq!(cursor.claim(), Some((5, 7)));
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn negative_bounds_are_ordinary_indices() {
        let cursor = SharedCursor::new(-4, 2, 4);
        assert_eq!(cursor.claim(), Some((-4, 0)));
        assert_eq!(cursor.claim(), Some((0, 2)));
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn concurrent_claims_are_exclusive_and_exhaustive() {
        let cursor = SharedCursor::new(0, 1000, 7);
        let claimed: Vec<std::sync::Mutex<Vec<(i64, i64)>>> =
            (0..4).map(|_| std::sync::Mutex::new(Vec::new())).collect();

        std::thread::scope(|s| {
            let cursor = &cursor;
            for slot in &claimed {
                s.spawn(move || {
                    while let Some(span) = cursor.claim() {
                        slot.lock().unwrap().push(span);
                    }
                });
            }
        });

        let mut spans: Vec<(i64, i64)> = claimed
            .iter()
            .flat_map(|m| m.lock().unwrap().clone())
            .collect();
        spans.sort_unstable();

        let mut expected_start = 0;
        for (start, stop) in spans {
            assert_eq!(start, expected_start, "gap or overlap between claims");
            assert!(stop > start && stop <= 1000);
            expected_start = stop;
        }
        assert_eq!(expected_start, 1000, "range not fully claimed");
    }
}
