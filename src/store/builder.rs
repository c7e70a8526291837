//! Module implement bulk loading of unique values.
//!
//! Bulk load consumes a [LoadSource] that is already sorted on value, in a
//! single pass. Each run of equal values becomes a single entry whose
//! reference count is the length of the run, and the entry's index is
//! written back to every slot of the run.

use std::cmp::Ordering;

use crate::{
    store::{dict::Dict, table::Table, Comparator, Config, EnumIndex, Footprint},
    Error, Result,
};

/// Source of values for bulk loading, typically a sorted attribute reload.
///
/// Source is forward only and produces each item once. Items must be
/// sorted by the store's comparator, this is not checked.
pub trait LoadSource<V> {
    /// Opaque location, like a document-id, to which an index is written.
    type Slot;

    /// Return the number of items in the source.
    fn size(&self) -> usize;

    /// Read the current item.
    fn read(&mut self) -> Result<(V, Self::Slot)>;

    /// Move to next item.
    fn next(&mut self);

    /// Write the index assigned to the value read from `slot`.
    fn write(&mut self, slot: Self::Slot, index: EnumIndex) -> Result<()>;
}

impl<'a, V, T> LoadSource<V> for &'a mut T
where
    T: LoadSource<V>,
{
    type Slot = T::Slot;

    fn size(&self) -> usize {
        (**self).size()
    }

    fn read(&mut self) -> Result<(V, Self::Slot)> {
        (**self).read()
    }

    fn next(&mut self) {
        (**self).next()
    }

    fn write(&mut self, slot: Self::Slot, index: EnumIndex) -> Result<()> {
        (**self).write(slot, index)
    }
}

/// In-memory [LoadSource] over `(value, docid)` pairs sorted on value.
/// Assigned indices are collected per docid.
pub struct SortedLoad<V> {
    items: Vec<(V, u32)>,
    off: usize,
    indices: Vec<Option<EnumIndex>>,
}

impl<V> SortedLoad<V> {
    pub fn new(items: Vec<(V, u32)>) -> SortedLoad<V> {
        let n_docs = items.iter().map(|(_, doc)| (*doc as usize) + 1).max();
        SortedLoad {
            items,
            off: 0,
            indices: vec![None; n_docs.unwrap_or(0)],
        }
    }

    /// Return assigned indices, indexed by docid. Docids that were not
    /// part of the load are None.
    pub fn into_indices(self) -> Vec<Option<EnumIndex>> {
        self.indices
    }
}

impl<V> LoadSource<V> for SortedLoad<V>
where
    V: Clone,
{
    type Slot = u32;

    fn size(&self) -> usize {
        self.items.len()
    }

    fn read(&mut self) -> Result<(V, u32)> {
        match self.items.get(self.off) {
            Some((value, doc)) => Ok((value.clone(), *doc)),
            None => err_at!(KeyNotFound, msg: "read beyond {}", self.items.len()),
        }
    }

    fn next(&mut self) {
        self.off += 1
    }

    fn write(&mut self, doc: u32, index: EnumIndex) -> Result<()> {
        match self.indices.get_mut(doc as usize) {
            Some(slot) => {
                *slot = Some(index);
                Ok(())
            }
            None => err_at!(InvalidInput, msg: "docid {} out of range", doc),
        }
    }
}

/// Build a value table and its dictionary, to be installed into a store
/// with [EnumStore::reset][crate::EnumStore::reset].
pub struct Builder<V, C> {
    config: Config,
    table: Table<V>,
    dict: Dict<V, C>,
}

impl<V, C> Builder<V, C>
where
    V: Clone + Footprint,
    C: Comparator<V>,
{
    pub fn new(config: &Config) -> Builder<V, C> {
        Builder {
            config: config.clone(),
            table: Table::new(config.initial_limit, config.chunk_size),
            dict: Dict::default(),
        }
    }

    /// Return the number of unique values.
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Insert a new unique value with ZERO reference count. Capacity is
    /// grown as needed, until `max_limit`.
    pub fn insert(&mut self, value: V) -> Result<EnumIndex> {
        if let Some(index) = self.dict.find(&value) {
            err_at!(InvalidInput, msg: "value exists at {}, unsorted input ?", index)?;
        }

        let size = Table::entry_size(&value)?;
        let remaining = self.table.to_remaining();
        if size > remaining {
            let by = std::cmp::max(size - remaining, self.config.grow_bytes);
            self.table.grow(by, self.config.max_limit);
        }

        let index = self.table.push(value.clone())?;
        self.dict.insert(value, index)?;
        Ok(index)
    }

    pub fn set_ref_count(&mut self, index: EnumIndex, n: u32) -> Result<()> {
        self.table.set_ref_count(index, n)
    }

    /// Consume `src` in a single pass. Return the number of items loaded.
    pub fn build_from<S>(&mut self, src: &mut S) -> Result<usize>
    where
        S: LoadSource<V>,
    {
        let n = src.size();

        // (run's value, index, run-length)
        let mut run: Option<(V, EnumIndex, u32)> = None;
        for _ in 0..n {
            let (value, slot) = src.read()?;
            let index = match run.take() {
                Some((prev, index, count)) if C::compare(&prev, &value) == Ordering::Equal => {
                    let count = match count.checked_add(1) {
                        Some(count) => count,
                        None => err_at!(Fatal, msg: "ref_count overflow for {}", index)?,
                    };
                    run = Some((prev, index, count));
                    index
                }
                Some((_, index, count)) => {
                    self.table.set_ref_count(index, count)?;
                    let index = self.insert(value.clone())?;
                    run = Some((value, index, 1));
                    index
                }
                None => {
                    let index = self.insert(value.clone())?;
                    run = Some((value, index, 1));
                    index
                }
            };
            src.write(slot, index)?;
            src.next();
        }

        if let Some((_, index, count)) = run {
            self.table.set_ref_count(index, count)?;
        }

        Ok(n)
    }

    /// Return the total reference count across all values.
    pub fn to_total_ref_count(&self) -> u64 {
        self.table.to_total_ref_count()
    }

    pub(crate) fn into_parts(self) -> (Table<V>, Dict<V, C>) {
        (self.table, self.dict)
    }
}

impl<V, C> Builder<V, C> {
    /// Return the table capacity, in bytes.
    pub fn to_limit(&self) -> u64 {
        self.table.to_limit()
    }

    pub fn to_ref_count(&self, index: EnumIndex) -> Result<u32> {
        self.table.to_ref_count(index)
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
