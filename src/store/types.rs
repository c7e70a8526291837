//! Implement value types shared across the enum-store and, Footprint and
//! Comparator traits for native types and std-types.

use std::{cmp::Ordering, convert::TryFrom, fmt, mem::size_of, result};

use crate::{util, Error, Result};

/// Opaque handle identifying a single entry in the value table.
///
/// A handle is stable for the entry's lifetime, it can change only when
/// the table is compacted, refer to [EnumIndexMap][crate::EnumIndexMap].
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumIndex(u32);

impl EnumIndex {
    #[inline]
    pub fn new(offset: u32) -> EnumIndex {
        EnumIndex(offset)
    }

    #[inline]
    pub(crate) fn from_offset(offset: usize) -> Result<EnumIndex> {
        Ok(EnumIndex(util::to_offset32(offset)?))
    }

    /// Return the table offset for this handle.
    #[inline]
    pub fn to_offset(&self) -> usize {
        self.0 as usize
    }
}

impl From<EnumIndex> for u32 {
    fn from(index: EnumIndex) -> u32 {
        index.0
    }
}

impl fmt::Debug for EnumIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "eidx<{}>", self.0)
    }
}

impl fmt::Display for EnumIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self.0)
    }
}

/// A unique value and the number of documents referring to it.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueEntry<V> {
    pub value: V,
    pub ref_count: u32,
}

/// Report on value table capacity, all numbers are in bytes.
///
/// A compaction scheduler can use this to decide when to compact the store
/// ahead of the next write cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddressSpaceUsage {
    /// Bytes allocated to entries, live, held and dead.
    pub used: u64,
    /// Bytes allocated to entries released past all reader generations.
    /// Compaction reclaims these, along with held entries and entries
    /// that are no longer referred.
    pub dead: u64,
    /// Current capacity of the value table.
    pub limit: u64,
}

impl AddressSpaceUsage {
    /// Return bytes still available for new entries.
    #[inline]
    pub fn to_remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Return the fraction of capacity in use, in the range [0.0, 1.0].
    pub fn to_usage(&self) -> f64 {
        match self.limit {
            0 => 0.0,
            limit => (self.used as f64) / (limit as f64),
        }
    }
}

impl fmt::Display for AddressSpaceUsage {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(
            f,
            "{{ used = {}, dead = {}, limit = {} }}",
            self.used, self.dead, self.limit
        )
    }
}

/// A single reference count adjustment, replayed by
/// [fixup_ref_counts][crate::EnumStore::fixup_ref_counts].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefCountDelta {
    pub index: EnumIndex,
    pub delta: i64,
}

impl RefCountDelta {
    pub fn new(index: EnumIndex, delta: i64) -> RefCountDelta {
        RefCountDelta { index, delta }
    }
}

/// Trait to be implemented by value-types, to compute the memory
/// foot-print of an entry in the value table.
///
/// **Note: This can be an approximate measure, but it must always return
/// the same number for equal values.**
pub trait Footprint {
    /// Return the approximate size of the underlying type, when
    /// stored in memory.
    fn footprint(&self) -> Result<u64>;
}

macro_rules! impl_footprint_basic_types {
    ($($type:ty),*) => (
        $(
            impl Footprint for $type {
                fn footprint(&self) -> Result<u64> {
                    err_at!(FailConvert, u64::try_from(size_of::<$type>()))
                }
            }
        )*
    );
}

impl_footprint_basic_types![
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char
];

impl Footprint for String {
    fn footprint(&self) -> Result<u64> {
        // capacity is not stable across clones, count the payload.
        err_at!(FailConvert, u64::try_from(size_of::<String>() + self.len()))
    }
}

impl Footprint for Vec<u8> {
    fn footprint(&self) -> Result<u64> {
        err_at!(FailConvert, u64::try_from(size_of::<Vec<u8>>() + self.len()))
    }
}

/// Pluggable ordering and equality rule for values in the enum-store.
///
/// `compare` must be a total order, values that compare Equal are the
/// same value for the dictionary. `compare_folded` is a coarser order that
/// is consistent with `compare`, that is, values equal under `compare_folded`
/// are adjacent under `compare`.
pub trait Comparator<V: ?Sized> {
    fn compare(a: &V, b: &V) -> Ordering;

    fn compare_folded(a: &V, b: &V) -> Ordering {
        Self::compare(a, b)
    }
}

/// Order values using their natural [Ord] implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl<V: Ord + ?Sized> Comparator<V> for NaturalOrder {
    #[inline]
    fn compare(a: &V, b: &V) -> Ordering {
        a.cmp(b)
    }
}

/// Order floating point values using IEEE-754 total ordering.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatOrder;

impl Comparator<f32> for FloatOrder {
    #[inline]
    fn compare(a: &f32, b: &f32) -> Ordering {
        a.total_cmp(b)
    }
}

impl Comparator<f64> for FloatOrder {
    #[inline]
    fn compare(a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }
}

/// Order strings on their lower-cased form, ties are broken on the raw
/// string. "Foo" and "foo" are distinct values, but adjacent, and equal
/// under `compare_folded`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FoldedOrder;

impl FoldedOrder {
    fn fold_cmp(a: &str, b: &str) -> Ordering {
        let a = a.chars().flat_map(char::to_lowercase);
        let b = b.chars().flat_map(char::to_lowercase);
        a.cmp(b)
    }
}

impl Comparator<String> for FoldedOrder {
    fn compare(a: &String, b: &String) -> Ordering {
        match Self::fold_cmp(a, b) {
            Ordering::Equal => a.cmp(b),
            cmp => cmp,
        }
    }

    fn compare_folded(a: &String, b: &String) -> Ordering {
        Self::fold_cmp(a, b)
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
