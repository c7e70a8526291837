//! Module implement readers for the enum-store.
//!
//! Writer publishes an immutable [View] at every commit. A view shares value
//! chunks and dictionary nodes with the writer, so publishing is cheap.
//! [Readers] is a cloneable handle that can be sent across threads, each
//! [Reader] created from it is bound to the latest published view and to the
//! view's generation until it is dropped.

use std::{fmt, sync::Arc};

use crate::{
    store::{
        dict::{self, Dict},
        generation::{GenerationGuard, GenerationHandler},
        table::Table,
        Comparator, EnumIndex,
    },
    util::Spinlock,
    Error, Result,
};

/// Immutable snapshot of the store, as of a generation.
pub(crate) struct View<V, C> {
    generation: u64,
    chunks: Vec<Arc<Vec<V>>>,
    chunk_size: usize,
    n_slots: usize,
    dict: Dict<V, C>,
    fast_search: bool,
}

impl<V, C> View<V, C> {
    pub(crate) fn new(
        generation: u64,
        table: &Table<V>,
        dict: &Dict<V, C>,
        fast_search: bool,
    ) -> View<V, C> {
        View {
            generation,
            chunks: table.to_chunks(),
            chunk_size: table.to_chunk_size(),
            n_slots: table.len(),
            dict: dict.clone(),
            fast_search,
        }
    }
}

/// Handle to create readers, can be shared and sent across threads.
pub struct Readers<V, C> {
    name: String,
    published: Arc<Spinlock<Arc<View<V, C>>>>,
    gen: GenerationHandler,
}

impl<V, C> Clone for Readers<V, C> {
    fn clone(&self) -> Self {
        Readers {
            name: self.name.clone(),
            published: Arc::clone(&self.published),
            gen: self.gen.clone(),
        }
    }
}

impl<V, C> Readers<V, C> {
    pub(crate) fn new(
        name: &str,
        published: Arc<Spinlock<Arc<View<V, C>>>>,
        gen: GenerationHandler,
    ) -> Readers<V, C> {
        Readers {
            name: name.to_string(),
            published,
            gen,
        }
    }

    /// Create a reader bound to the latest published view.
    pub fn reader(&self) -> Reader<V, C> {
        // guard and view are taken under the same latch, a publish can't
        // sneak in between.
        let latch = self.published.read();
        let guard = self.gen.take_guard();
        let view = Arc::clone(&latch);
        Reader { guard, view }
    }
}

impl<V, C> fmt::Debug for Readers<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Readers<{:?}>", self.name)
    }
}

/// Read only handle to a published view of the store.
///
/// Entries visible to a reader are never released or relocated while the
/// reader is alive.
pub struct Reader<V, C> {
    guard: GenerationGuard,
    view: Arc<View<V, C>>,
}

impl<V, C> Reader<V, C> {
    /// Return the generation this reader is bound to.
    pub fn to_generation(&self) -> u64 {
        self.guard.to_generation()
    }

    /// Return the number of unique values visible to this reader.
    pub fn len(&self) -> usize {
        self.view.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.dict.is_empty()
    }

    /// Resolve `index` to its value.
    pub fn get(&self, index: EnumIndex) -> Result<&V> {
        let off = index.to_offset();
        let chunk_size = self.view.chunk_size;
        match self.view.chunks.get(off / chunk_size) {
            Some(chunk) if off < self.view.n_slots => Ok(&chunk[off % chunk_size]),
            _ => err_at!(
                KeyNotFound, msg: "missing entry {} at generation {}", index, self.view.generation
            ),
        }
    }

    /// Iterate over unique values, in comparator order.
    pub fn iter(&self) -> dict::Iter<V> {
        self.view.dict.iter()
    }
}

impl<V, C> Reader<V, C>
where
    V: Clone,
    C: Comparator<V>,
{
    /// Lookup the index for `value`.
    pub fn find(&self, value: &V) -> Option<EnumIndex> {
        match self.view.fast_search {
            true => self.view.dict.find(value),
            false => self.view.dict.scan(value),
        }
    }

    /// Lookup all values that are equal to `value` under the folded order,
    /// like case-insensitive lookup for strings.
    pub fn find_folded(&self, value: &V) -> Vec<(V, EnumIndex)> {
        self.view.dict.find_folded(value)
    }
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod reader_test;
