use std::{fmt, result};

#[allow(unused_imports)]
use crate::store::EnumStore;
use crate::util::spinlock;

/// Statistic type, for [EnumStore] type.
#[derive(Clone, Debug)]
pub struct Stats {
    pub name: String,
    pub fast_search: bool,
    /// Number of unique values in the dictionary.
    pub n_uniques: usize,
    /// Number of slots in the value table, including held and dead entries.
    pub n_slots: usize,
    pub used: u64,
    pub held: u64,
    pub dead: u64,
    pub limit: u64,
    /// Bytes of replaced tables, that are still visible to older readers.
    pub retained: u64,
    pub generation: u64,
    pub oldest_used: u64,
    pub n_readers: usize,
    pub pending_compact: bool,
    pub n_compactions: usize,
    pub n_resizes: usize,
    pub spin_stats: spinlock::Stats,
}

impl Stats {
    pub(crate) fn new(name: &str, fast_search: bool) -> Stats {
        Stats {
            name: name.to_string(),
            fast_search,
            n_uniques: Default::default(),
            n_slots: Default::default(),
            used: Default::default(),
            held: Default::default(),
            dead: Default::default(),
            limit: Default::default(),
            retained: Default::default(),
            generation: Default::default(),
            oldest_used: Default::default(),
            n_readers: Default::default(),
            pending_compact: Default::default(),
            n_compactions: Default::default(),
            n_resizes: Default::default(),
            spin_stats: Default::default(),
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        writeln!(f, "enumstore.name = {}", self.name)?;
        writeln!(
            f,
            "enumstore = {{ n_uniques={}, n_slots={}, fast_search={} }}",
            self.n_uniques, self.n_slots, self.fast_search
        )?;
        writeln!(
            f,
            "enumstore.table = {{ used={}, held={}, dead={}, limit={}, retained={} }}",
            self.used, self.held, self.dead, self.limit, self.retained
        )?;
        writeln!(
            f,
            "enumstore.generation = {{ current={}, oldest_used={}, n_readers={} }}",
            self.generation, self.oldest_used, self.n_readers
        )?;
        writeln!(
            f,
            "enumstore.compact = {{ pending={}, n_compactions={}, n_resizes={} }}",
            self.pending_compact, self.n_compactions, self.n_resizes
        )?;
        writeln!(f, "enumstore.spin_stats = {}", self.spin_stats)
    }
}
