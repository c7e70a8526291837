//! Module implement the value table, backing storage for unique values.
//!
//! Values are appended into fixed size chunks, each chunk is shared, via
//! `Arc`, with reader snapshots. Appending into a chunk that is shared with
//! a reader copies that chunk first, so readers never see a value being
//! written. Reference counts and entry states are private to the writer and
//! are kept in a separate array of slots.
//!
//! Entry life cycle:
//!
//! ```text
//!   push --> Live --(ref_count == 0, commit)--> Held(gen)
//!   Held(gen) --(no reader at or before gen)--> Dead
//!   Dead --(compaction)--> dropped
//! ```
//!
//! A Live entry whose ref_count drops to ZERO can be revived by the writer
//! until it is moved to the hold list.

use std::{convert::TryFrom, mem::size_of, sync::Arc};

use crate::{
    store::{EnumIndex, Footprint},
    util, Error, Result,
};

/// Book keeping cost of a single entry, in addition to the value's footprint.
pub const SLOT_OVERHEAD: u64 = size_of::<Slot>() as u64;

/// State of an entry in the value table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Entry is indexed in the dictionary.
    Live,
    /// Entry is removed from dictionary at the specified generation, readers
    /// bound to that generation or older might still access it.
    Held(u64),
    /// Entry can be reclaimed by compaction.
    Dead,
}

#[derive(Clone, Copy, Debug)]
pub struct Slot {
    pub ref_count: u32,
    pub size: u32,
    pub state: State,
}

pub struct Table<V> {
    chunks: Vec<Arc<Vec<V>>>,
    chunk_size: usize,
    slots: Vec<Slot>,

    limit: u64,
    used: u64,
    held: u64,
    dead: u64,
}

impl<V> Table<V> {
    pub fn new(limit: u64, chunk_size: usize) -> Table<V> {
        Table {
            chunks: Vec::default(),
            chunk_size: std::cmp::max(chunk_size, 1),
            slots: Vec::default(),

            limit,
            used: 0,
            held: 0,
            dead: 0,
        }
    }

    /// Return the number of bytes an entry for `value` shall consume in the
    /// table. The returned size is rounded up to 8 bytes, so that estimates
    /// made from this method never fall short of the actual usage.
    pub fn entry_size(value: &V) -> Result<u64>
    where
        V: Footprint,
    {
        let footprint = value.footprint()?;
        Ok(util::align8(footprint + SLOT_OVERHEAD))
    }

    /// Return number of slots, including held and dead entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn to_chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn to_limit(&self) -> u64 {
        self.limit
    }

    #[inline]
    pub fn to_used(&self) -> u64 {
        self.used
    }

    #[inline]
    pub fn to_held(&self) -> u64 {
        self.held
    }

    #[inline]
    pub fn to_dead(&self) -> u64 {
        self.dead
    }

    #[inline]
    pub fn to_remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Return the bytes consumed by entries that are referred by documents.
    pub fn to_live_bytes(&self) -> u64 {
        let iter = self.slots.iter().filter(|s| s.ref_count > 0);
        iter.map(|s| u64::from(s.size)).sum()
    }

    /// Return the sum of reference counts across all entries.
    pub fn to_total_ref_count(&self) -> u64 {
        self.slots.iter().map(|s| u64::from(s.ref_count)).sum()
    }

    /// Return storage chunks, to be shared with a reader snapshot.
    pub fn to_chunks(&self) -> Vec<Arc<Vec<V>>> {
        self.chunks.iter().map(Arc::clone).collect()
    }

    /// Grow capacity by `by` bytes, capacity shall not exceed `max`.
    /// Entries are not moved, and existing indices remain valid.
    /// Return the new capacity.
    pub fn grow(&mut self, by: u64, max: u64) -> u64 {
        let limit = std::cmp::min(self.limit.saturating_add(by), max);
        self.limit = std::cmp::max(self.limit, limit);
        self.limit
    }

    /// Append a new entry with ZERO reference count.
    pub fn push(&mut self, value: V) -> Result<EnumIndex>
    where
        V: Clone + Footprint,
    {
        let size = Self::entry_size(&value)?;
        if size > self.to_remaining() {
            let (remn, limit) = (self.to_remaining(), self.limit);
            err_at!(Exhausted, msg: "entry {} > remaining {}/{}", size, remn, limit)?;
        }
        let index = EnumIndex::from_offset(self.slots.len())?;

        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < self.chunk_size => {
                Arc::make_mut(chunk).push(value);
            }
            _ => {
                let mut chunk = Vec::with_capacity(self.chunk_size);
                chunk.push(value);
                self.chunks.push(Arc::new(chunk));
            }
        }
        self.slots.push(Slot {
            ref_count: 0,
            size: err_at!(FailConvert, u32::try_from(size))?,
            state: State::Live,
        });
        self.used += size;

        Ok(index)
    }

    pub fn get(&self, index: EnumIndex) -> Result<&V> {
        let off = index.to_offset();
        match self.chunks.get(off / self.chunk_size) {
            Some(chunk) if off < self.slots.len() => Ok(&chunk[off % self.chunk_size]),
            _ => err_at!(KeyNotFound, msg: "missing entry {}", index),
        }
    }

    pub fn to_slot(&self, index: EnumIndex) -> Result<Slot> {
        match self.slots.get(index.to_offset()) {
            Some(slot) => Ok(*slot),
            None => err_at!(KeyNotFound, msg: "missing slot {}", index),
        }
    }

    #[inline]
    pub fn to_ref_count(&self, index: EnumIndex) -> Result<u32> {
        Ok(self.to_slot(index)?.ref_count)
    }

    fn as_mut_live_slot(&mut self, index: EnumIndex) -> Result<&mut Slot> {
        match self.slots.get_mut(index.to_offset()) {
            Some(slot) if slot.state == State::Live => Ok(slot),
            Some(slot) => {
                err_at!(Fatal, msg: "entry {} not live {:?}", index, slot.state)
            }
            None => err_at!(KeyNotFound, msg: "missing slot {}", index),
        }
    }

    /// Increment the reference count, return the new count.
    pub fn inc_ref_count(&mut self, index: EnumIndex) -> Result<u32> {
        let slot = self.as_mut_live_slot(index)?;
        slot.ref_count = match slot.ref_count.checked_add(1) {
            Some(n) => n,
            None => err_at!(Fatal, msg: "ref_count overflow for {}", index)?,
        };
        Ok(slot.ref_count)
    }

    /// Decrement the reference count, return the new count. Reference count
    /// never goes below ZERO.
    pub fn dec_ref_count(&mut self, index: EnumIndex) -> Result<u32> {
        let slot = self.as_mut_live_slot(index)?;
        slot.ref_count = match slot.ref_count.checked_sub(1) {
            Some(n) => n,
            None => err_at!(Fatal, msg: "ref_count underflow for {}", index)?,
        };
        Ok(slot.ref_count)
    }

    pub fn set_ref_count(&mut self, index: EnumIndex, n: u32) -> Result<()> {
        self.as_mut_live_slot(index)?.ref_count = n;
        Ok(())
    }

    /// Move an unreferenced live entry to held state, held at `generation`.
    /// Return the number of bytes held.
    pub fn hold(&mut self, index: EnumIndex, generation: u64) -> Result<u64> {
        let slot = self.as_mut_live_slot(index)?;
        if slot.ref_count > 0 {
            err_at!(Fatal, msg: "hold entry {} ref_count {}", index, slot.ref_count)?;
        }
        slot.state = State::Held(generation);
        let size = u64::from(slot.size);
        self.held += size;
        Ok(size)
    }

    /// Move a held entry to dead state, making it reclaimable.
    pub fn release(&mut self, index: EnumIndex) -> Result<()> {
        match self.slots.get_mut(index.to_offset()) {
            Some(slot) => match slot.state {
                State::Held(_) => {
                    slot.state = State::Dead;
                    let size = u64::from(slot.size);
                    self.held -= size;
                    self.dead += size;
                    Ok(())
                }
                state => err_at!(Fatal, msg: "release entry {} in {:?}", index, state),
            },
            None => err_at!(KeyNotFound, msg: "missing slot {}", index),
        }
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;
