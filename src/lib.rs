//! Package implement a deduplicating value dictionary, a.k.a enum-store,
//! for columnar attribute storage.
//!
//! Instead of storing the raw value for every document, an attribute stores a
//! compact [EnumIndex] into a shared table of unique values. Each unique value
//! carries a reference count, that is, the number of documents pointing to it.
//!
//! * Bulk load is done through [Builder], from a source that is already sorted
//!   on value. Equal values are merged into a single entry.
//! * Online insertion is done in write cycles, through [BatchUpdater]. When the
//!   table runs out of room, the updater compacts the table, and when that is
//!   not enough, falls back to growing the table.
//! * Compaction relocates entries and produces an [EnumIndexMap] that the
//!   caller must apply to every index it holds, refer to [Reenumerate].
//! * Readers work on immutable snapshots, guarded by generations. Storage
//!   released by the writer is reclaimed only after all readers that could
//!   observe it have let go of their snapshot.
//!
//! There can be only one writer at any time, that is the `&mut` owner of
//! [EnumStore]. Any number of readers can be created from [Readers] handle,
//! concurrently with the writer.

use std::{error, fmt, result};

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// use crate::Error;
/// err_at!(Fatal, msg: "bad argument");
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailConvert, u32::try_from(n));
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailConvert, u32::try_from(n), "index offset {}", n);
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err(Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err(Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

pub mod store;
pub mod util;

pub use crate::store::{
    AddressSpaceUsage, BatchUpdater, Builder, Comparator, Config, EnumIndex,
    EnumIndexMap, EnumStore, EnumStoreApi, FloatOrder, FoldedOrder, Footprint, Load,
    LoadSource, NaturalOrder, NumericStore, PendingChange, Reader, Readers,
    Reenumerate, RefCountDelta, SortedLoad, Stats, StringStore, UniqueSet, ValueEntry,
};

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that can be returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the
/// error location, and a message.
pub enum Error {
    /// Unrecoverable condition, typically a broken invariant.
    Fatal(String, String),
    /// Argument supplied by the caller is not acceptable.
    InvalidInput(String, String),
    /// Serialized input is corrupt or does not match its expected length.
    InvalidFormat(String, String),
    /// Failure while encoding or decoding cbor.
    FailCbor(String, String),
    /// Failure while converting between numeric types.
    FailConvert(String, String),
    /// Value table cannot be grown to fit pending writes. Unrecoverable.
    Exhausted(String, String),
    /// No entry for the requested value or index.
    KeyNotFound(String, String),
}

impl Error {
    /// Return true if the caller must not proceed with the store. Proceeding
    /// would break the index to value mapping for committed documents.
    /// Deciding whether to halt the process is left to the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Fatal(_, _) | Error::InvalidFormat(_, _) | Error::Exhausted(_, _)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            InvalidInput(p, msg) => write!(f, "{} InvalidInput: {}", p, msg),
            InvalidFormat(p, msg) => write!(f, "{} InvalidFormat: {}", p, msg),
            FailCbor(p, msg) => write!(f, "{} FailCbor: {}", p, msg),
            FailConvert(p, msg) => write!(f, "{} FailConvert: {}", p, msg),
            Exhausted(p, msg) => write!(f, "{} Exhausted: {}", p, msg),
            KeyNotFound(p, msg) => write!(f, "{} KeyNotFound: {}", p, msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}
