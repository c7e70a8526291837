//! Module implement batched insertion of new unique values.
//!
//! A write cycle starts with [EnumStore::batch_updater] and ends with
//! [BatchUpdater::commit]. Within a cycle new unique values are inserted
//! in one shot, making room for them by compaction or, failing that, by
//! resizing the table. Reference counts are adjusted by the caller as
//! documents are updated.

use log::{debug, error, info};

use std::{cmp::Ordering, fmt};

use crate::{
    store::{table::Table, Comparator, EnumIndex, EnumStore, Footprint, Reenumerate},
    Error, Result,
};

/// A value to be written by the current write cycle, along with its
/// resolved index. `scratch` is None until resolved and is reset to None
/// when compaction relocates entries.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingChange<V> {
    pub value: V,
    pub scratch: Option<EnumIndex>,
}

impl<V> PendingChange<V> {
    pub fn new(value: V) -> PendingChange<V> {
        PendingChange {
            value,
            scratch: None,
        }
    }
}

/// Ordered, de-duplicated set of values, from a batch of pending changes,
/// that are not yet in the dictionary.
#[derive(Clone, Debug)]
pub struct UniqueSet<V> {
    values: Vec<V>,
    bytes: u64,
}

impl<V> UniqueSet<V> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return the bytes required to insert all values.
    pub fn to_bytes(&self) -> u64 {
        self.bytes
    }

    pub fn as_values(&self) -> &[V] {
        &self.values
    }
}

impl<V> UniqueSet<V>
where
    V: Clone + Footprint,
{
    fn from_changes<C>(changes: &[PendingChange<V>], store: &EnumStore<V, C>) -> Result<Self>
    where
        C: Comparator<V>,
    {
        let mut values: Vec<V> = changes
            .iter()
            .filter(|c| store.dict.find(&c.value).is_none())
            .map(|c| c.value.clone())
            .collect();
        values.sort_by(C::compare);
        values.dedup_by(|a, b| C::compare(a, b) == Ordering::Equal);

        let mut bytes = 0;
        for value in values.iter() {
            bytes += Table::entry_size(value)?;
        }

        Ok(UniqueSet { values, bytes })
    }
}

/// Writer handle for a single write cycle.
pub struct BatchUpdater<'a, V, C> {
    store: &'a mut EnumStore<V, C>,
    n_inserts: usize,
}

impl<'a, V, C> BatchUpdater<'a, V, C> {
    pub(crate) fn new(store: &'a mut EnumStore<V, C>) -> BatchUpdater<'a, V, C> {
        BatchUpdater {
            store,
            n_inserts: 0,
        }
    }
}

impl<'a, V, C> BatchUpdater<'a, V, C>
where
    V: Clone + Footprint + fmt::Debug,
    C: Comparator<V>,
{
    /// Insert values from `changes` that are not already in the store, each
    /// with ZERO reference count.
    ///
    /// If there isn't enough room, or if a compaction is pending, the store
    /// is compacted. When compaction relocates entries, `holder` is asked to
    /// re-enumerate its indices and every change's scratch index is reset.
    /// When compaction cannot make room, the table is resized. If resize
    /// cannot make room either, the store is exhausted and this returns
    /// [Error::Exhausted], which is not recoverable.
    pub fn insert_new_unique_values<H>(
        &mut self,
        changes: &mut [PendingChange<V>],
        holder: &mut H,
    ) -> Result<UniqueSet<V>>
    where
        H: Reenumerate,
    {
        let mut uniques = UniqueSet::from_changes(changes, self.store)?;
        let name = self.store.config.name.clone();

        let needed = uniques.to_bytes();
        if needed > self.store.remaining() || self.store.pending_compact {
            let (remaining, pending) = (self.store.remaining(), self.store.pending_compact);
            info!(
                target: "enumstore",
                "{:?}, reserve needed:{} remaining:{} pending:{}",
                name, needed, remaining, pending
            );

            self.store.remove_all_old_generations()?;
            self.store.clear_pending_compact();

            info!(target: "enumstore", "{:?}, start compaction for {} bytes", name, needed);
            match self.store.perform_compaction(needed)? {
                Some(map) => {
                    holder.re_enumerate(&map)?;
                    changes.iter_mut().for_each(|c| c.scratch = None);

                    // compaction could have dropped unreferenced values.
                    uniques = UniqueSet::from_changes(changes, self.store)?;
                    let needed = uniques.to_bytes();
                    if needed > self.store.remaining() {
                        self.store.fallback_resize(needed);
                    }
                    info!(
                        target: "enumstore",
                        "{:?}, complete compaction, relocated {} entries",
                        name, map.len()
                    );
                }
                None => {
                    info!(target: "enumstore", "{:?}, failed_compact for {} bytes", name, needed);
                    let limit = self.store.fallback_resize(needed);
                    info!(
                        target: "enumstore",
                        "{:?}, fallbackresize_complete limit:{}", name, limit
                    );
                }
            }

            let (needed, remaining) = (uniques.to_bytes(), self.store.remaining());
            if needed > remaining {
                let limit = self.store.config.max_limit;
                error!(
                    target: "enumstore",
                    "{:?}, exhausted needed:{} remaining:{} max_limit:{}",
                    name, needed, remaining, limit
                );
                err_at!(Exhausted, msg: "needed {} remaining {}", needed, remaining)?;
            }
        }

        for value in uniques.as_values().iter() {
            let index = self.store.table.push(value.clone())?;
            self.store.dict.insert(value.clone(), index)?;
            self.n_inserts += 1;
        }

        Ok(uniques)
    }

    /// Resolve `change` to its index, caching it in the change's scratch.
    pub fn resolve(&self, change: &mut PendingChange<V>) -> Result<EnumIndex> {
        if let Some(index) = change.scratch {
            return Ok(index);
        }
        match self.store.dict.find(&change.value) {
            Some(index) => {
                change.scratch = Some(index);
                Ok(index)
            }
            None => err_at!(KeyNotFound, msg: "value {:?} not inserted", change.value),
        }
    }

    /// Insert a single value if not already present, return its index.
    /// Never compacts, table is resized when short of room.
    pub fn add(&mut self, value: V) -> Result<EnumIndex> {
        let (index, inserted) = self.store.insert_or_resize(value)?;
        if inserted {
            self.n_inserts += 1;
        }
        Ok(index)
    }

    pub fn inc_ref_count(&mut self, index: EnumIndex) -> Result<u32> {
        self.store.table.inc_ref_count(index)
    }

    /// Decrement reference count, when it drops to ZERO the entry is
    /// released on commit, unless revived before that.
    pub fn dec_ref_count(&mut self, index: EnumIndex) -> Result<u32> {
        let n = self.store.table.dec_ref_count(index)?;
        if n == 0 {
            self.store.unused.push(index);
        }
        Ok(n)
    }

    /// End the write cycle, publish all changes to readers.
    pub fn commit(self) -> Result<()> {
        debug!(
            target: "enumstore",
            "{:?}, commit write cycle with {} new values",
            self.store.config.name, self.n_inserts
        );
        self.store.commit()
    }
}

#[cfg(test)]
#[path = "updater_test.rs"]
mod updater_test;
