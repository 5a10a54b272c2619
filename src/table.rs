//! Dense id-addressed storage for one entity kind.
//!
//! Ids are client-assigned and small (the benchmark stays under ten
//! million), so a plain vector indexed by id gives O(1) lookups without a
//! hash in the hot path. Slots are `Option` so the vector can be grown in
//! chunks ahead of the highest id seen.

use bytes::Bytes;

/// One occupied slot: the record plus its cached canonical JSON.
///
/// The cache is rebuilt by the engine on every mutation of the record, so
/// reading it is always byte-equal to a fresh encode.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    pub record: T,
    pub json: Bytes,
}

/// Dense id → slot table.
#[derive(Debug)]
pub(crate) struct Table<T> {
    slots: Vec<Option<Slot<T>>>,
    len: usize,
}

/// Chunk the slot vector grows by when an id lands past the end.
const GROW_CHUNK: usize = 1024;

impl<T> Table<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(capacity, || None);
        Table { slots, len: 0 }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: u32) -> Option<&Slot<T>> {
        self.slots.get(id as usize)?.as_ref()
    }

    /// Install or overwrite the slot for `id`, growing the table as needed.
    /// Duplicate checks are the caller's concern.
    pub fn put(&mut self, id: u32, record: T, json: Bytes) {
        let idx = id as usize;
        if self.slots.len() <= idx {
            let target = (idx + 1).max(self.slots.len() + GROW_CHUNK);
            self.slots.resize_with(target, || None);
        }
        if self.slots[idx].is_none() {
            self.len += 1;
        }
        self.slots[idx] = Some(Slot { record, json });
    }
}

/// Grow a parallel per-id vector (used for the secondary index families) to
/// cover `id`, with the same chunking as [`Table::put`].
pub(crate) fn ensure_parallel_len<T: Default>(vec: &mut Vec<T>, id: u32) {
    let idx = id as usize;
    if vec.len() <= idx {
        let target = (idx + 1).max(vec.len() + GROW_CHUNK);
        vec.resize_with(target, T::default);
    }
}
