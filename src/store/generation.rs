//! Module implement generation based reclamation.
//!
//! Every publish of a new snapshot advances the store's generation. A reader
//! takes a [GenerationGuard] for the generation it is bound to, and storage
//! released by the writer at generation `g` is put on a [HoldList] until no
//! reader holds a guard at or before `g`.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

struct Inner {
    current: u64,
    readers: BTreeMap<u64, usize>, // generation -> number of active guards
}

/// Track current generation and active readers per generation. Cloning
/// a handler shares the same generation state.
#[derive(Clone)]
pub struct GenerationHandler {
    inner: Arc<Mutex<Inner>>,
}

impl Default for GenerationHandler {
    fn default() -> GenerationHandler {
        let inner = Inner {
            current: 0,
            readers: BTreeMap::new(),
        };
        GenerationHandler {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}

impl GenerationHandler {
    // generation state is always consistent under the lock, a poisoned
    // lock is still usable.
    fn lock(&self) -> MutexGuard<Inner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Bind a guard to the current generation.
    pub fn take_guard(&self) -> GenerationGuard {
        let mut inner = self.lock();
        let generation = inner.current;
        *inner.readers.entry(generation).or_insert(0) += 1;

        GenerationGuard {
            generation,
            handler: self.clone(),
        }
    }

    /// Advance to next generation, return the new generation.
    pub fn inc_generation(&self) -> u64 {
        let mut inner = self.lock();
        inner.current += 1;
        inner.current
    }

    pub fn to_current(&self) -> u64 {
        self.lock().current
    }

    /// Return the oldest generation that is still bound to a reader, if
    /// there are no readers, return the current generation.
    pub fn oldest_used(&self) -> u64 {
        let inner = self.lock();
        match inner.readers.keys().next() {
            Some(generation) => *generation,
            None => inner.current,
        }
    }

    /// Return the number of active guards.
    pub fn to_reader_count(&self) -> usize {
        self.lock().readers.values().sum()
    }

    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if let Some(n) = inner.readers.get_mut(&generation) {
            *n -= 1;
            if *n == 0 {
                inner.readers.remove(&generation);
            }
        }
    }
}

/// RAII guard binding a reader to a generation, dropping the guard
/// unbinds the reader.
pub struct GenerationGuard {
    generation: u64,
    handler: GenerationHandler,
}

impl GenerationGuard {
    pub fn to_generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.handler.release(self.generation)
    }
}

/// Queue of items released by the writer, tagged with the generation at
/// which they were released.
pub struct HoldList<T> {
    items: VecDeque<(u64, u64, T)>,
    bytes: u64,
}

impl<T> Default for HoldList<T> {
    fn default() -> HoldList<T> {
        HoldList {
            items: VecDeque::default(),
            bytes: 0,
        }
    }
}

impl<T> HoldList<T> {
    /// Hold `item`, of `bytes` size, released at `generation`. Generations
    /// are expected in non-decreasing order.
    pub fn hold(&mut self, generation: u64, bytes: u64, item: T) {
        self.items.push_back((generation, bytes, item));
        self.bytes += bytes;
    }

    /// Free items released before `oldest_used` generation.
    pub fn trim(&mut self, oldest_used: u64) -> Vec<T> {
        let mut items = vec![];
        while let Some((generation, _, _)) = self.items.front() {
            if *generation >= oldest_used {
                break;
            }
            if let Some((_, bytes, item)) = self.items.pop_front() {
                self.bytes -= bytes;
                items.push(item);
            }
        }
        items
    }

    /// Drop all items without regard to generation.
    pub fn clear(&mut self) -> Vec<T> {
        self.bytes = 0;
        self.items.drain(..).map(|(_, _, item)| item).collect()
    }

    #[inline]
    pub fn to_held_bytes(&self) -> u64 {
        self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod generation_test;
