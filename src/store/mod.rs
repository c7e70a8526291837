//! Module implement the enum-store, a deduplicating value dictionary.
//!
//! [EnumStore] is made up of a value table holding unique values along with
//! their reference counts, and a dictionary mapping values to their index in
//! the table. Refer to the crate documentation for the write cycle and
//! reader model.

mod builder;
mod compact;
mod config;
mod dict;
mod fixup;
mod generation;
mod index;
mod reader;
mod stats;
mod table;
mod types;
mod updater;

pub use builder::{Builder, LoadSource, SortedLoad};
pub use compact::{EnumIndexMap, Reenumerate};
pub use config::{Config, CHUNK_SIZE, GROW_BYTES, INITIAL_LIMIT, MAX_LIMIT};
pub use dict::Iter as DictIter;
pub use index::{EnumStore, EnumStoreApi, Iter, Load, NumericStore, StringStore};
pub use reader::{Reader, Readers};
pub use stats::Stats;
pub use types::{
    AddressSpaceUsage, Comparator, EnumIndex, FloatOrder, FoldedOrder, Footprint, NaturalOrder,
    RefCountDelta, ValueEntry,
};
pub use updater::{BatchUpdater, PendingChange, UniqueSet};
