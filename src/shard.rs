use crate::config::Config;
use crate::stats::ShardStats;
use crate::table::Table;
use crate::value::Value;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};

/// A single shard containing a [`Table`] protected by a read-write lock.
pub(crate) struct Shard<T> {
    table: RwLock<Table<T>>,
    stats: ShardStats,
}

impl<T> Shard<T> {
    pub fn new(index: usize, config: Config) -> Self {
        Self::from_table(Table::new(index, config))
    }

    pub fn from_table(table: Table<T>) -> Self {
        Self {
            table: RwLock::new(table),
            stats: ShardStats::new(),
        }
    }

    /// Acquire the shared lock.
    #[track_caller]
    pub fn read(&self) -> ReadLocked<'_, T> {
        let held = held::Held::acquire(self.addr());
        #[cfg(feature = "lock-timing")]
        let start = std::time::Instant::now();
        let guard = self.table.read();
        #[cfg(feature = "lock-timing")]
        self.stats.record_lock_wait(start.elapsed().as_nanos() as u64);
        self.stats.record_read();
        ReadLocked {
            guard,
            _held: held,
        }
    }

    /// Acquire the exclusive lock.
    #[track_caller]
    pub fn write(&self) -> Locked<'_, T> {
        let held = held::Held::acquire(self.addr());
        #[cfg(feature = "lock-timing")]
        let start = std::time::Instant::now();
        let guard = self.table.write();
        #[cfg(feature = "lock-timing")]
        self.stats.record_lock_wait(start.elapsed().as_nanos() as u64);
        self.stats.record_write();
        Locked {
            guard,
            _held: held,
        }
    }

    /// Direct access through exclusive ownership; takes no lock.
    pub fn get_mut(&mut self) -> &mut Table<T> {
        self.table.get_mut()
    }

    /// Get the number of entries in this shard. Not counted as a read.
    pub fn len(&self) -> usize {
        let _held = held::Held::acquire(self.addr());
        self.table.read().len()
    }

    /// Panic in debug builds if this thread holds any of `shards`.
    ///
    /// Work handed to other threads bypasses the per-thread check in
    /// [`read`](Self::read), so whole-map operations call this first.
    #[track_caller]
    pub fn assert_none_held(shards: &[Shard<T>]) {
        held::assert_none(shards.iter().map(Shard::addr));
    }

    /// Copy this shard's entries under its shared lock into a buffer sized to
    /// the shard's length at acquisition time.
    pub fn snapshot(&self) -> Vec<(String, Value<T>)>
    where
        T: Clone,
    {
        let table = self.read();
        let mut buffer = Vec::with_capacity(table.len());
        buffer.extend(
            table
                .iter()
                .map(|(key, value)| (key.to_owned(), value.clone())),
        );
        buffer
    }

    /// Get a snapshot of statistics for this shard.
    pub fn stats(&self) -> crate::stats::ShardOps {
        self.stats.snapshot()
    }

    pub fn record_remove(&self) {
        self.stats.record_remove();
    }

    fn addr(&self) -> usize {
        self as *const Self as usize
    }
}

/// Shared lock on one shard. Dereferences to the shard's [`Table`].
pub struct ReadLocked<'a, T> {
    guard: RwLockReadGuard<'a, Table<T>>,
    _held: held::Held,
}

impl<T> Deref for ReadLocked<'_, T> {
    type Target = Table<T>;

    fn deref(&self) -> &Table<T> {
        &self.guard
    }
}

/// Exclusive lock on one shard.
///
/// Holding a `Locked` is what entitles a caller to the mutating no-lock
/// primitives on [`Table`]: the guard dereferences to `&mut Table<T>` and there
/// is no other way to obtain one for a shared map. Only keys that belong to this
/// shard (see [`Table::owns`]) may be passed to those primitives.
pub struct Locked<'a, T> {
    guard: RwLockWriteGuard<'a, Table<T>>,
    _held: held::Held,
}

impl<T> Deref for Locked<'_, T> {
    type Target = Table<T>;

    fn deref(&self) -> &Table<T> {
        &self.guard
    }
}

impl<T> DerefMut for Locked<'_, T> {
    fn deref_mut(&mut self) -> &mut Table<T> {
        &mut self.guard
    }
}

/// Per-thread record of shards currently locked, so that re-entrant locking
/// panics in debug builds instead of deadlocking.
#[cfg(debug_assertions)]
mod held {
    use std::cell::RefCell;

    thread_local! {
        static HELD: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
    }

    pub(crate) struct Held(usize);

    impl Held {
        #[track_caller]
        pub(crate) fn acquire(addr: usize) -> Self {
            let reentrant = HELD.with(|held| {
                let mut held = held.borrow_mut();
                if held.contains(&addr) {
                    true
                } else {
                    held.push(addr);
                    false
                }
            });
            if reentrant {
                panic!("re-entrant lock on a shard already held by this thread would deadlock");
            }
            Held(addr)
        }
    }

    #[track_caller]
    pub(crate) fn assert_none(addrs: impl Iterator<Item = usize>) {
        let reentrant = HELD.with(|held| {
            let held = held.borrow();
            !held.is_empty() && addrs.into_iter().any(|addr| held.contains(&addr))
        });
        if reentrant {
            panic!("re-entrant lock on a shard already held by this thread would deadlock");
        }
    }

    impl Drop for Held {
        fn drop(&mut self) {
            let _ = HELD.try_with(|held| {
                let mut held = held.borrow_mut();
                if let Some(pos) = held.iter().rposition(|addr| *addr == self.0) {
                    held.swap_remove(pos);
                }
            });
        }
    }
}

#[cfg(not(debug_assertions))]
mod held {
    pub(crate) struct Held;

    impl Held {
        #[inline]
        pub(crate) fn acquire(_addr: usize) -> Self {
            Held
        }
    }

    #[inline]
    pub(crate) fn assert_none(_addrs: impl Iterator<Item = usize>) {}
}
