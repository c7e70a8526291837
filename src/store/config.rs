use arbitrary::{Arbitrary, Unstructured};

use crate::{Error, Result};

/// Default initial capacity of the value table, 64KB.
pub const INITIAL_LIMIT: u64 = 64 * 1024;
/// Default minimum growth for fallback-resize, 64KB.
pub const GROW_BYTES: u64 = 64 * 1024;
/// Default ceiling for value table capacity, 4GB.
pub const MAX_LIMIT: u64 = 4 * 1024 * 1024 * 1024;
/// Default number of values held in a single storage chunk.
pub const CHUNK_SIZE: usize = 1024;

/// Configuration for [EnumStore][crate::EnumStore] type.
///
/// Ordering and equality of values is not part of the configuration, it is
/// selected through the comparator type parameter of the store.
#[derive(Clone, Debug)]
pub struct Config {
    /// Uniquely name the store, used in logs and stats.
    pub name: String,
    /// Enable the dictionary's fast lookup for readers. When disabled,
    /// reader lookups by value scan the dictionary snapshot in order.
    ///
    /// Default: true
    pub fast_search: bool,
    /// Capacity, in bytes, of a freshly created value table.
    ///
    /// Default: [INITIAL_LIMIT]
    pub initial_limit: u64,
    /// Minimum number of bytes added to capacity by fallback-resize.
    ///
    /// Default: [GROW_BYTES]
    pub grow_bytes: u64,
    /// Capacity beyond which the value table shall not grow. Pending writes
    /// that don't fit within this limit fail the write cycle.
    ///
    /// Default: [MAX_LIMIT]
    pub max_limit: u64,
    /// Number of values held in a single storage chunk. Readers share chunks
    /// with the writer, and a shared chunk is copied when the writer appends
    /// into it.
    ///
    /// Default: [CHUNK_SIZE]
    pub chunk_size: usize,
}

impl<'a> Arbitrary<'a> for Config {
    fn arbitrary(u: &mut Unstructured) -> arbitrary::Result<Self> {
        let name: String = u.arbitrary()?;
        let fast_search: bool = u.arbitrary()?;
        let initial_limit = *u.choose(&[0, 128, 1024, INITIAL_LIMIT])?;
        let grow_bytes = *u.choose(&[8, 256, GROW_BYTES])?;
        let chunk_size = *u.choose(&[1, 4, 64, CHUNK_SIZE])?;

        let config = Config {
            name,
            fast_search,
            initial_limit,
            grow_bytes,
            max_limit: MAX_LIMIT,
            chunk_size,
        };
        Ok(config)
    }
}

impl Config {
    pub fn new(name: &str) -> Config {
        Config {
            name: name.to_string(),
            fast_search: true,
            initial_limit: INITIAL_LIMIT,
            grow_bytes: GROW_BYTES,
            max_limit: MAX_LIMIT,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn set_fast_search(&mut self, fast_search: bool) -> &mut Self {
        self.fast_search = fast_search;
        self
    }

    /// Configure initial capacity, growth and the ceiling for the value table.
    /// Initial capacity can't exceed the ceiling.
    pub fn set_limits(&mut self, initial: u64, grow: u64, max: u64) -> Result<&mut Self> {
        if initial > max {
            err_at!(InvalidInput, msg: "initial_limit {} > max_limit {}", initial, max)?;
        }
        self.initial_limit = initial;
        self.grow_bytes = grow;
        self.max_limit = max;
        Ok(self)
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) -> &mut Self {
        self.chunk_size = std::cmp::max(chunk_size, 1);
        self
    }
}
