//! Index-based ring buffer with start/end/count bookkeeping

use std::fmt;

use crate::record::NewsRecord;

/// Returned by [`RingBuffer::insert`] when every slot is occupied.
///
/// The capacity gate makes this unreachable on the store's paths; it exists
/// so a broken precondition never overwrites a live record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingFull {
    /// The record that was not inserted
    pub rejected: NewsRecord,
}

impl fmt::Display for RingFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ring buffer full, record {} not inserted", self.rejected.id)
    }
}

impl std::error::Error for RingFull {}

/// Circular store of up to `capacity` records.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Option<NewsRecord>>,
    start: usize,
    end: usize,
    count: usize,
}

impl RingBuffer {
    /// Creates an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            start: 0,
            end: 0,
            count: 0,
        }
    }

    /// Maximum number of records.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Physical index of the oldest record.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Physical index the next insert will use.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Appends at the logical end.
    ///
    /// # Errors
    ///
    /// Returns `RingFull` (and leaves the buffer untouched) if no slot is free.
    pub fn insert(&mut self, record: NewsRecord) -> Result<(), RingFull> {
        if self.is_full() {
            return Err(RingFull { rejected: record });
        }
        debug_assert!(self.slots[self.end].is_none());
        self.slots[self.end] = Some(record);
        self.end = (self.end + 1) % self.capacity();
        self.count += 1;
        Ok(())
    }

    /// Removes and returns the oldest record, or `None` when empty.
    pub fn evict_oldest(&mut self) -> Option<NewsRecord> {
        if self.count == 0 {
            return None;
        }
        let record = self.slots[self.start].take();
        self.start = (self.start + 1) % self.capacity();
        self.count -= 1;
        record
    }

    /// Logical position of the record with the given id (O(count)).
    pub fn find_by_id(&self, id: u64) -> Option<usize> {
        self.iter().position(|record| record.id == id)
    }

    /// Record at a logical position.
    pub fn get(&self, position: usize) -> Option<&NewsRecord> {
        if position >= self.count {
            return None;
        }
        self.slots[self.physical(position)].as_ref()
    }

    /// Replaces the record at a logical position in place, returning the old
    /// one. `start`, `end` and `count` do not move.
    pub fn replace_at(&mut self, position: usize, record: NewsRecord) -> Option<NewsRecord> {
        if position >= self.count {
            return None;
        }
        let index = self.physical(position);
        self.slots[index].replace(record)
    }

    /// Iterates records oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &NewsRecord> + '_ {
        (0..self.count).filter_map(move |i| self.slots[self.physical(i)].as_ref())
    }

    /// Owned copy of the logical sequence.
    pub fn snapshot(&self) -> Vec<NewsRecord> {
        self.iter().cloned().collect()
    }

    /// Drops every record and resets the indices.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.start = 0;
        self.end = 0;
        self.count = 0;
    }

    fn physical(&self, position: usize) -> usize {
        (self.start + position) % self.capacity()
    }
}
