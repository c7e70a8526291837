//! Module `spinlock` implement a read-write spinlock, used for publishing
//! snapshots to readers without blocking them on the OS scheduler.
//!
//! The critical sections guarded by this lock are expected to be tiny,
//! typically cloning or swapping an `Arc`. Readers can share the door,
//! a writer first latches the door, so that no new reader can enter, then
//! waits for the readers inside to leave and locks the door.
//!
//! ```ignore
//! let view = Spinlock::new(Arc::new(snapshot));
//! let snapshot = Arc::clone(&view.read());   // reader
//! *view.write() = Arc::new(new_snapshot);    // writer
//! ```

use std::{
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
    result,
    sync::atomic::{AtomicU32, AtomicUsize, Ordering::SeqCst},
};

/// Spinlock implements latch-and-spin mechanism for non-blocking
/// concurrency.
///
/// It uses AtomicU32 for:
/// * reader count, bits [0-29].
/// * latch flag, bit 30.
/// * lock flag, bit 31.
pub struct Spinlock<T> {
    latchlock: AtomicU32,
    read_locks: AtomicUsize,
    write_locks: AtomicUsize,
    conflicts: AtomicUsize,

    value: UnsafeCell<T>,
}

// value is accessed only through ReadGuard and WriteGuard, and the latchlock
// makes sure that a WriteGuard is never alive along with any other guard.
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send + Sync> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    const LATCH_FLAG: u32 = 0x40000000;
    const LOCK_FLAG: u32 = 0x80000000;
    const LATCH_LOCK_FLAG: u32 = 0xC0000000;
    const READERS_FLAG: u32 = 0x3FFFFFFF;

    /// Create a new Spinlock
    pub fn new(value: T) -> Spinlock<T> {
        Spinlock {
            latchlock: AtomicU32::new(0),
            read_locks: AtomicUsize::new(0),
            write_locks: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),

            value: UnsafeCell::new(value),
        }
    }

    /// Acquire latch for read permission.
    pub fn read(&self) -> ReadGuard<T> {
        loop {
            let old = self.latchlock.load(SeqCst);
            if (old & Self::LATCH_LOCK_FLAG) == 0 {
                // latch is not acquired by a writer
                if self
                    .latchlock
                    .compare_exchange(old, old + 1, SeqCst, SeqCst)
                    .is_ok()
                {
                    self.read_locks.fetch_add(1, SeqCst);
                    break ReadGuard { door: self };
                }
            }
            self.conflicts.fetch_add(1, SeqCst);
            std::hint::spin_loop();
        }
    }

    /// Acquire latch for write permission.
    pub fn write(&self) -> WriteGuard<T> {
        // acquire latch
        loop {
            let old = self.latchlock.load(SeqCst);
            if (old & Self::LATCH_LOCK_FLAG) == 0 {
                let new = old | Self::LATCH_FLAG;
                if self
                    .latchlock
                    .compare_exchange(old, new, SeqCst, SeqCst)
                    .is_ok()
                {
                    break;
                }
            }
            self.conflicts.fetch_add(1, SeqCst);
            std::hint::spin_loop();
        }
        // acquire lock, after all readers have left.
        loop {
            let old = self.latchlock.load(SeqCst);
            if (old & Self::READERS_FLAG) == 0 {
                let new = old | Self::LOCK_FLAG;
                if self
                    .latchlock
                    .compare_exchange(old, new, SeqCst, SeqCst)
                    .is_ok()
                {
                    self.write_locks.fetch_add(1, SeqCst);
                    break WriteGuard { door: self };
                }
            }
            self.conflicts.fetch_add(1, SeqCst);
            std::hint::spin_loop();
        }
    }

    pub fn to_stats(&self) -> Stats {
        Stats {
            latchlock: self.latchlock.load(SeqCst),
            read_locks: self.read_locks.load(SeqCst),
            write_locks: self.write_locks.load(SeqCst),
            conflicts: self.conflicts.load(SeqCst),
        }
    }
}

/// Type to handle read-latch, when latchlock gets dropped the latch is released.
pub struct ReadGuard<'a, T> {
    door: &'a Spinlock<T>,
}

impl<'a, T> Deref for ReadGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.door.value.get() }
    }
}

impl<'a, T> Drop for ReadGuard<'a, T> {
    fn drop(&mut self) {
        self.door.latchlock.fetch_sub(1, SeqCst);
    }
}

/// Type to handle write-latch, when latchlock gets dropped the latch is released.
pub struct WriteGuard<'a, T> {
    door: &'a Spinlock<T>,
}

impl<'a, T> Deref for WriteGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.door.value.get() }
    }
}

impl<'a, T> DerefMut for WriteGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.door.value.get() }
    }
}

impl<'a, T> Drop for WriteGuard<'a, T> {
    fn drop(&mut self) {
        // no reader can enter while the door is latched and locked.
        self.door.latchlock.store(0, SeqCst);
    }
}

/// Statistic type, to capture [Spinlock] metrics.
#[derive(Clone, Default, Debug)]
pub struct Stats {
    /// Actual latchlock of the Spinlock when [to_stats][Spinlock::to_stats]
    /// is called.
    pub latchlock: u32,
    /// Total number of read locks so far.
    pub read_locks: usize,
    /// Total number of write locks so far.
    pub write_locks: usize,
    /// Total number of conflicts so far, while acquire the latch.
    pub conflicts: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(
            f,
            concat!(
                "{{ latchlock = {:X}, read_locks = {}, ",
                "write_locks = {}, conflicts = {} }}",
            ),
            self.latchlock, self.read_locks, self.write_locks, self.conflicts,
        )
    }
}

#[cfg(test)]
#[path = "spinlock_test.rs"]
mod spinlock_test;
