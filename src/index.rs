//! Time-ordered secondary index over visits.
//!
//! One index exists per user and per location, created together with the
//! owning entity. Entries are keyed by `(visited_at, visit_id)` — the visit
//! id breaks ties, so two visits sharing a timestamp coexist instead of one
//! silently replacing the other.

use std::collections::BTreeSet;

/// Ordered set of `(visited_at, visit_id)` pairs for one user or location.
#[derive(Debug, Default)]
pub(crate) struct VisitIndex {
    entries: BTreeSet<(i64, u32)>,
}

impl VisitIndex {
    pub fn new() -> Self {
        VisitIndex::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, visited_at: i64, visit_id: u32) {
        self.entries.insert((visited_at, visit_id));
    }

    pub fn remove(&mut self, visited_at: i64, visit_id: u32) -> bool {
        self.entries.remove(&(visited_at, visit_id))
    }

    /// Entries in ascending `visited_at` order (visit id breaks ties).
    pub fn iter(&self) -> impl Iterator<Item = (i64, u32)> + '_ {
        self.entries.iter().copied()
    }
}
