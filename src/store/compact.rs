//! Module implement compaction and fallback-resize for the value table.
//!
//! Compaction copies all referenced entries into a fresh, packed table, in
//! dictionary order, and swaps it in only after the copy is complete. Any
//! failure before the swap leaves the store untouched. Entries are
//! relocated, so every index held outside the store must be rewritten using
//! the returned [EnumIndexMap].
//!
//! When compaction cannot make enough room, the table is resized in place.
//! Resize never relocates entries.

use log::{info, warn};

use std::cmp;

use crate::{
    store::{dict::Dict, table::Table, Comparator, EnumIndex, EnumStore, Footprint},
    Error, Result,
};

/// Mapping from pre-compaction index to post-compaction index. Every
/// index that was referenced before the compaction has an entry.
#[derive(Clone, Debug, Default)]
pub struct EnumIndexMap {
    map: Vec<Option<EnumIndex>>,
    n_live: usize,
}

impl EnumIndexMap {
    /// Return the new index for `old` index, None if `old` was not live.
    pub fn get(&self, old: EnumIndex) -> Option<EnumIndex> {
        self.map.get(old.to_offset()).copied().flatten()
    }

    /// Same as get, but treat a missing entry as a broken index.
    pub fn remap(&self, old: EnumIndex) -> Result<EnumIndex> {
        match self.get(old) {
            Some(new) => Ok(new),
            None => err_at!(Fatal, msg: "no mapping for {} after compaction", old),
        }
    }

    /// Return the number of relocated entries.
    pub fn len(&self) -> usize {
        self.n_live
    }

    pub fn is_empty(&self) -> bool {
        self.n_live == 0
    }

    /// Iterate over `(old, new)` pairs in old index order.
    pub fn iter(&self) -> impl Iterator<Item = (EnumIndex, EnumIndex)> + '_ {
        self.map
            .iter()
            .enumerate()
            .filter_map(|(off, new)| new.map(|new| (EnumIndex::new(off as u32), new)))
    }
}

/// Implemented by holders of [EnumIndex], like attribute vectors, that
/// must be rewritten after compaction.
pub trait Reenumerate {
    fn re_enumerate(&mut self, map: &EnumIndexMap) -> Result<()>;
}

impl Reenumerate for Vec<EnumIndex> {
    fn re_enumerate(&mut self, map: &EnumIndexMap) -> Result<()> {
        for index in self.iter_mut() {
            *index = map.remap(*index)?;
        }
        Ok(())
    }
}

impl Reenumerate for Vec<Option<EnumIndex>> {
    fn re_enumerate(&mut self, map: &EnumIndexMap) -> Result<()> {
        for index in self.iter_mut() {
            if let Some(old) = index {
                *old = map.remap(*old)?;
            }
        }
        Ok(())
    }
}

impl<V, C> EnumStore<V, C>
where
    V: Clone + Footprint,
    C: Comparator<V>,
{
    /// Compact the value table so that at least `needed` bytes are free
    /// after compaction. Return None if that is not possible, in which case
    /// the store is left untouched.
    ///
    /// Entries with ZERO reference count are dropped, others are relocated,
    /// refer to [EnumIndexMap]. The relocation becomes visible to readers
    /// on the next commit.
    pub fn perform_compaction(&mut self, needed: u64) -> Result<Option<EnumIndexMap>> {
        let (limit, live) = (self.table.to_limit(), self.table.to_live_bytes());
        if live.saturating_add(needed) > limit {
            info!(
                target: "enumstore",
                "{:?}, compaction live:{} + needed:{} > limit:{}",
                self.config.name, live, needed, limit
            );
            return Ok(None);
        }

        let mut table = Table::new(limit, self.table.to_chunk_size());
        let mut dict: Dict<V, C> = Dict::default();
        let mut map = vec![None; self.table.len()];
        let mut n_live = 0;

        for (value, old) in self.dict.iter() {
            let ref_count = self.table.to_ref_count(old)?;
            if ref_count == 0 {
                continue;
            }
            let new = table.push(value.clone())?;
            table.set_ref_count(new, ref_count)?;
            dict.insert(value, new)?;
            map[old.to_offset()] = Some(new);
            n_live += 1;
        }

        if table.to_total_ref_count() != self.table.to_total_ref_count() {
            let (x, y) = (table.to_total_ref_count(), self.table.to_total_ref_count());
            err_at!(Fatal, msg: "ref_count mismatch after compaction {} != {}", x, y)?;
        }

        // swap
        let old_table = std::mem::replace(&mut self.table, table);
        self.dict = dict;

        let retained = old_table.to_used().saturating_sub(live);
        let generation = self.gen.to_current();
        self.held_tables.hold(generation, retained, old_table.to_chunks());
        self.held_entries.clear();
        self.unused.clear();
        self.n_compactions += 1;

        info!(
            target: "enumstore",
            "{:?}, compacted {} slots into {} entries, reclaimed {} bytes",
            self.config.name, old_table.len(), n_live, retained
        );

        Ok(Some(EnumIndexMap { map, n_live }))
    }
}

impl<V, C> EnumStore<V, C> {
    /// Grow table capacity by `max(needed, grow_bytes)`, upto `max_limit`,
    /// without relocating entries. Return the new capacity.
    pub fn fallback_resize(&mut self, needed: u64) -> u64 {
        let old_limit = self.table.to_limit();
        let by = cmp::max(needed, self.config.grow_bytes);
        let limit = self.table.grow(by, self.config.max_limit);
        self.n_resizes += 1;

        warn!(
            target: "enumstore",
            "{:?}, fallback resize {} -> {} for {} bytes",
            self.config.name, old_limit, limit, needed
        );

        limit
    }
}

#[cfg(test)]
#[path = "compact_test.rs"]
mod compact_test;
