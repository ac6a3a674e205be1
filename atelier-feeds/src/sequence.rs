//! Request sequencing for callers that issue overlapping searches.
//!
//! The pipeline has no cancellation: every cycle runs to completion. A
//! caller takes a ticket before each search and drops any response whose
//! ticket is no longer the latest.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket dispenser.
#[derive(Debug, Default)]
pub struct SearchSequence {
    latest: AtomicU64,
}

impl SearchSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new ticket. Tickets start at 1 and strictly increase.
    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// `true` if no ticket has been issued after `ticket`.
    pub fn is_latest(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::Acquire) == ticket
    }
}
