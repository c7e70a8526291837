use cbordata::{Cborize, FromCbor, IntoCbor};
use log::{debug, info};

use std::{cmp::Ordering, fmt, mem, sync::Arc};

use crate::{
    store::{
        dict::{self, Dict},
        generation::{GenerationHandler, HoldList},
        reader::View,
        table::{State, Table},
        AddressSpaceUsage, BatchUpdater, Builder, Comparator, Config, EnumIndex, Footprint,
        LoadSource, NaturalOrder, Reader, Readers, Stats, ValueEntry,
    },
    util::{self, Spinlock},
    Error, Result,
};

const IMAGE_VER: u32 = 0x00010001;

/// Serialized form of the store, live values in dictionary order along
/// with their reference counts.
#[derive(Clone, Debug, Cborize)]
struct Image<V> {
    name: String,
    values: Vec<V>,
    ref_counts: Vec<u32>,
}

impl<V> Image<V> {
    const ID: u32 = IMAGE_VER;
}

/// Initial content for a new store.
pub enum Load<S> {
    /// Start with an empty store.
    Empty,
    /// Bulk load from a source that is sorted on value.
    Sorted(S),
}

/// Capability interface for value dictionaries, like numeric and string
/// attribute stores.
pub trait EnumStoreApi<V> {
    /// Return the index for value, inserting it with ZERO reference count
    /// if not present.
    fn lookup_or_insert(&mut self, value: V) -> Result<EnumIndex>;

    /// Return the value for `index`.
    fn get(&self, index: EnumIndex) -> Result<V>;

    /// Iterate over unique values, in comparator order.
    fn iterate(&self) -> Box<dyn Iterator<Item = Result<(EnumIndex, ValueEntry<V>)>> + '_>;

    fn address_space_usage(&self) -> AddressSpaceUsage;
}

/// Store for numeric values, ordered by their natural order. Use
/// `EnumStore<f64, FloatOrder>` for floating point values.
pub type NumericStore<T> = EnumStore<T, NaturalOrder>;

/// Store for string values, ordered case-insensitive, with case variants
/// kept as distinct values.
pub type StringStore = EnumStore<String, crate::store::FoldedOrder>;

/// Deduplicating, reference counted dictionary of values.
///
/// Type parameter `V` is the value type and `C` is the comparator that
/// defines order and equality for values. There can be only one writer,
/// the owner of the store, while any number of [Reader] can concurrently
/// access the last committed state.
pub struct EnumStore<V, C = NaturalOrder> {
    pub(crate) config: Config,
    pub(crate) table: Table<V>,
    pub(crate) dict: Dict<V, C>,

    pub(crate) gen: GenerationHandler,
    published: Arc<Spinlock<Arc<View<V, C>>>>,
    pub(crate) held_entries: HoldList<EnumIndex>,
    pub(crate) held_tables: HoldList<Vec<Arc<Vec<V>>>>,
    // entries whose ref_count dropped to ZERO in this write cycle.
    pub(crate) unused: Vec<EnumIndex>,

    pub(crate) pending_compact: bool,
    pub(crate) n_compactions: usize,
    pub(crate) n_resizes: usize,
}

impl<V, C> EnumStore<V, C> {
    /// Create an empty store.
    pub fn new(config: &Config) -> EnumStore<V, C> {
        let table = Table::new(config.initial_limit, config.chunk_size);
        let dict = Dict::default();
        let gen = GenerationHandler::default();
        let view = View::new(gen.to_current(), &table, &dict, config.fast_search);

        EnumStore {
            config: config.clone(),
            table,
            dict,

            gen,
            published: Arc::new(Spinlock::new(Arc::new(view))),
            held_entries: HoldList::default(),
            held_tables: HoldList::default(),
            unused: Vec::default(),

            pending_compact: false,
            n_compactions: 0,
            n_resizes: 0,
        }
    }

    pub fn to_name(&self) -> String {
        self.config.name.clone()
    }

    /// Return the number of unique values.
    pub fn num_uniques(&self) -> usize {
        self.dict.len()
    }

    /// Return bytes still available for new entries, without compaction
    /// or resize.
    pub fn remaining(&self) -> u64 {
        self.table.to_remaining()
    }

    pub fn address_space_usage(&self) -> AddressSpaceUsage {
        AddressSpaceUsage {
            used: self.table.to_used(),
            dead: self.table.to_dead(),
            limit: self.table.to_limit(),
        }
    }

    /// Return true if compaction shall be done in the next write cycle.
    pub fn is_pending_compact(&self) -> bool {
        self.pending_compact
    }

    /// Request a compaction for the next write cycle, typically done by a
    /// scheduler watching [address_space_usage][Self::address_space_usage].
    pub fn set_pending_compact(&mut self) {
        self.pending_compact = true
    }

    pub fn clear_pending_compact(&mut self) {
        self.pending_compact = false
    }

    /// Return the value for `index`, including entries that are no more
    /// in the dictionary but not yet reclaimed.
    pub fn get_value(&self, index: EnumIndex) -> Result<&V> {
        self.table.get(index)
    }

    pub fn ref_count(&self, index: EnumIndex) -> Result<u32> {
        self.table.to_ref_count(index)
    }

    /// Release storage that is no more visible to any reader.
    pub fn remove_all_old_generations(&mut self) -> Result<()> {
        let oldest_used = self.gen.oldest_used();
        let indices = self.held_entries.trim(oldest_used);
        for index in indices.iter() {
            self.table.release(*index)?;
        }
        let tables = self.held_tables.trim(oldest_used);

        if !indices.is_empty() || !tables.is_empty() {
            debug!(
                target: "enumstore",
                "{:?}, released {} entries {} tables before generation {}",
                self.config.name, indices.len(), tables.len(), oldest_used
            );
        }
        Ok(())
    }

    /// Start a write cycle.
    pub fn batch_updater(&mut self) -> BatchUpdater<V, C> {
        BatchUpdater::new(self)
    }

    /// Return a handle to create readers, the handle can be cloned and
    /// shared with other threads.
    pub fn to_readers(&self) -> Readers<V, C> {
        let published = Arc::clone(&self.published);
        Readers::new(&self.config.name, published, self.gen.clone())
    }

    /// Create a reader bound to the last committed state.
    pub fn reader(&self) -> Reader<V, C> {
        self.to_readers().reader()
    }

    pub fn to_stats(&self) -> Stats {
        let mut stats = Stats::new(&self.config.name, self.config.fast_search);
        stats.n_uniques = self.dict.len();
        stats.n_slots = self.table.len();
        stats.used = self.table.to_used();
        stats.held = self.table.to_held();
        stats.dead = self.table.to_dead();
        stats.limit = self.table.to_limit();
        stats.retained = self.held_tables.to_held_bytes();
        stats.generation = self.gen.to_current();
        stats.oldest_used = self.gen.oldest_used();
        stats.n_readers = self.gen.to_reader_count();
        stats.pending_compact = self.pending_compact;
        stats.n_compactions = self.n_compactions;
        stats.n_resizes = self.n_resizes;
        stats.spin_stats = self.published.to_stats();
        stats
    }

    // publish writer's state to readers, as next generation.
    fn publish(&mut self) {
        let mut latch = self.published.write();
        let generation = self.gen.inc_generation();
        let view = View::new(generation, &self.table, &self.dict, self.config.fast_search);
        *latch = Arc::new(view);
    }
}

impl<V, C> EnumStore<V, C>
where
    V: Clone + Footprint,
    C: Comparator<V>,
{
    /// Create a store from `load`.
    pub fn load<S>(config: &Config, load: Load<S>) -> Result<EnumStore<V, C>>
    where
        S: LoadSource<V>,
    {
        let mut store = EnumStore::new(config);
        match load {
            Load::Empty => (),
            Load::Sorted(mut src) => {
                let mut builder = Builder::new(config);
                builder.build_from(&mut src)?;
                store.reset(builder)?;
            }
        }
        Ok(store)
    }

    /// Replace the store's content with `builder`'s. All indices handed out
    /// earlier are invalid after this call.
    pub fn reset(&mut self, builder: Builder<V, C>) -> Result<()> {
        let (table, dict) = builder.into_parts();
        let old_table = mem::replace(&mut self.table, table);
        self.dict = dict;

        let generation = self.gen.to_current();
        self.held_tables.hold(generation, old_table.to_used(), old_table.to_chunks());
        self.held_entries.clear();
        self.unused.clear();
        self.publish();

        info!(
            target: "enumstore",
            "{:?}, reset with {} uniques, limit:{}",
            self.config.name, self.dict.len(), self.table.to_limit()
        );
        Ok(())
    }

    /// Return the bytes an entry for `value` shall consume in the table.
    pub fn entry_size(value: &V) -> Result<u64> {
        Table::entry_size(value)
    }

    /// Lookup `value` in the dictionary.
    pub fn find_index(&self, value: &V) -> Option<EnumIndex> {
        self.dict.find(value)
    }

    /// Lookup all values that are equal to `value` under the folded order.
    pub fn find_folded(&self, value: &V) -> Vec<EnumIndex> {
        let items = self.dict.find_folded(value);
        items.into_iter().map(|(_, index)| index).collect()
    }

    pub fn get_entry(&self, index: EnumIndex) -> Result<ValueEntry<V>> {
        let value = self.table.get(index)?.clone();
        let ref_count = self.table.to_ref_count(index)?;
        Ok(ValueEntry { value, ref_count })
    }

    /// Iterate over unique values in comparator order, along with their
    /// reference counts.
    pub fn iter(&self) -> Iter<V> {
        Iter {
            table: &self.table,
            iter: self.dict.iter(),
        }
    }

    /// End a write cycle. Entries that lost all their references are moved
    /// out of the dictionary, the new state is published to readers and
    /// storage not visible to any reader is released.
    pub fn commit(&mut self) -> Result<()> {
        let n = self.free_unused()?;
        self.publish();
        self.remove_all_old_generations()?;

        debug!(
            target: "enumstore",
            "{:?}, published generation {}, freed {} entries",
            self.config.name, self.gen.to_current(), n
        );
        Ok(())
    }

    // Lookup value, if missing insert it, growing the table if needed.
    pub(crate) fn insert_or_resize(&mut self, value: V) -> Result<(EnumIndex, bool)> {
        if let Some(index) = self.dict.find(&value) {
            return Ok((index, false));
        }

        let size = Table::entry_size(&value)?;
        if size > self.table.to_remaining() {
            self.fallback_resize(size);
        }
        let index = self.table.push(value.clone())?;
        self.dict.insert(value, index)?;
        Ok((index, true))
    }

    fn free_unused(&mut self) -> Result<usize> {
        let generation = self.gen.to_current();

        let mut n = 0;
        for index in mem::take(&mut self.unused).into_iter() {
            let slot = self.table.to_slot(index)?;
            if slot.ref_count > 0 || slot.state != State::Live {
                continue;
            }
            let value = self.table.get(index)?.clone();
            match self.dict.remove(&value)? {
                Some(old) if old == index => (),
                old => err_at!(Fatal, msg: "dictionary mismatch {:?} != {}", old, index)?,
            }
            let bytes = self.table.hold(index, generation)?;
            self.held_entries.hold(generation, bytes, index);
            n += 1;
        }

        Ok(n)
    }

    /// Serialize live values, in dictionary order, along with their
    /// reference counts.
    pub fn serialize(&self) -> Result<Vec<u8>>
    where
        V: IntoCbor,
    {
        let mut values = Vec::with_capacity(self.dict.len());
        let mut ref_counts = Vec::with_capacity(self.dict.len());
        for (value, index) in self.dict.iter() {
            values.push(value);
            ref_counts.push(self.table.to_ref_count(index)?);
        }

        let image = Image {
            name: self.config.name.clone(),
            values,
            ref_counts,
        };
        util::into_cbor_bytes(image)
    }

    /// Create a store from serialized `buf`. Return the store and the
    /// indices for serialized values, in serialized order.
    pub fn deserialize(config: &Config, buf: &[u8]) -> Result<(Self, Vec<EnumIndex>)>
    where
        V: FromCbor,
    {
        let (image, n): (Image<V>, usize) = match util::from_cbor_bytes(buf) {
            Ok(res) => res,
            Err(err) => err_at!(InvalidFormat, msg: "{}", err)?,
        };
        if n != buf.len() {
            err_at!(InvalidFormat, msg: "consumed {} bytes of {}", n, buf.len())?;
        }
        if image.values.len() != image.ref_counts.len() {
            let (x, y) = (image.values.len(), image.ref_counts.len());
            err_at!(InvalidFormat, msg: "values {} != ref_counts {}", x, y)?;
        }
        for (i, w) in image.values.windows(2).enumerate() {
            if C::compare(&w[0], &w[1]) != Ordering::Less {
                err_at!(InvalidFormat, msg: "values not sorted at {}", i + 1)?;
            }
        }

        let mut builder = Builder::new(config);
        let mut indices = Vec::with_capacity(image.values.len());
        let iter = image.values.into_iter().zip(image.ref_counts.into_iter());
        for (value, ref_count) in iter {
            let index = builder.insert(value)?;
            builder.set_ref_count(index, ref_count)?;
            indices.push(index);
        }

        let mut store = EnumStore::new(config);
        store.reset(builder)?;
        // unreferenced values shall be freed on first commit.
        for index in indices.iter() {
            if store.table.to_ref_count(*index)? == 0 {
                store.unused.push(*index);
            }
        }

        Ok((store, indices))
    }

    /// Validate the store:
    ///
    /// * Dictionary is a valid tree.
    /// * Every dictionary entry points to a live entry holding an equal
    ///   value, and every live entry is in the dictionary.
    /// * Byte accounting matches the entries.
    pub fn validate(&self) -> Result<()>
    where
        V: fmt::Debug,
    {
        self.dict.validate()?;

        for (value, index) in self.dict.iter() {
            let slot = self.table.to_slot(index)?;
            if slot.state != State::Live {
                err_at!(Fatal, msg: "{:?} {} in {:?}", value, index, slot.state)?;
            }
            let stored = self.table.get(index)?;
            if C::compare(stored, &value) != Ordering::Equal {
                err_at!(Fatal, msg: "{:?} != {:?} at {}", stored, value, index)?;
            }
        }

        let (mut n_live, mut used, mut held, mut dead) = (0, 0, 0, 0);
        for off in 0..self.table.len() {
            let slot = self.table.to_slot(EnumIndex::from_offset(off)?)?;
            let size = u64::from(slot.size);
            used += size;
            match slot.state {
                State::Live => n_live += 1,
                State::Held(_) => held += size,
                State::Dead => dead += size,
            }
        }
        if n_live != self.dict.len() {
            err_at!(Fatal, msg: "live entries {} != {}", n_live, self.dict.len())?;
        }
        let accounts = (self.table.to_used(), self.table.to_held(), self.table.to_dead());
        if (used, held, dead) != accounts {
            err_at!(Fatal, msg: "accounting {:?} != {:?}", (used, held, dead), accounts)?;
        }
        if held != self.held_entries.to_held_bytes() {
            let x = self.held_entries.to_held_bytes();
            err_at!(Fatal, msg: "held bytes {} != hold-list {}", held, x)?;
        }

        Ok(())
    }
}

impl<V, C> EnumStoreApi<V> for EnumStore<V, C>
where
    V: Clone + Footprint,
    C: Comparator<V>,
{
    fn lookup_or_insert(&mut self, value: V) -> Result<EnumIndex> {
        Ok(self.insert_or_resize(value)?.0)
    }

    fn get(&self, index: EnumIndex) -> Result<V> {
        Ok(self.table.get(index)?.clone())
    }

    fn iterate(&self) -> Box<dyn Iterator<Item = Result<(EnumIndex, ValueEntry<V>)>> + '_> {
        Box::new(self.iter())
    }

    fn address_space_usage(&self) -> AddressSpaceUsage {
        EnumStore::address_space_usage(self)
    }
}

/// Iterator over unique values, in comparator order, along with their
/// reference counts.
pub struct Iter<'a, V> {
    table: &'a Table<V>,
    iter: dict::Iter<V>,
}

impl<'a, V> Iterator for Iter<'a, V>
where
    V: Clone,
{
    type Item = Result<(EnumIndex, ValueEntry<V>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (value, index) = self.iter.next()?;
        match self.table.to_ref_count(index) {
            Ok(ref_count) => Some(Ok((index, ValueEntry { value, ref_count }))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<V, C> fmt::Debug for EnumStore<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "EnumStore<{:?} uniques:{} {}>",
            self.config.name,
            self.dict.len(),
            self.address_space_usage()
        )
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
