use crate::config::Config;
use crate::error::Error;
use crate::shard::{Locked, ReadLocked, Shard};
use crate::stats::{Diagnostics, ShardOps, Stats};
use crate::table::Table;
use crate::value::Value;
use std::fmt;

/// Concurrent sharded map from string keys to [`Value`]s.
///
/// Splits your data across a fixed number of shards, each with its own
/// read-write lock, so operations on different shards don't block each other.
/// A key always lives in the shard chosen by its hash.
///
/// Single-key operations lock exactly one shard. Whole-map operations
/// ([`len`](Self::len), the iterators) visit shards one lock at a time and never
/// hold two shard locks together, so their results are a union of per-shard
/// point-in-time views rather than one global snapshot.
///
/// The exclusive lock is not re-entrant: a closure passed to
/// [`upsert`](Self::upsert) or [`remove_if`](Self::remove_if) runs under the
/// shard's lock and must not call back into the same map. Debug builds panic
/// on such a call instead of deadlocking.
///
/// # Example
///
/// ```rust
/// use shardnest::ShardMap;
///
/// let map = ShardMap::new();
/// map.set("key1", "value1");
///
/// assert_eq!(map.get("key1"), Some("value1"));
/// assert_eq!(map.get("missing"), None);
/// ```
pub struct ShardMap<T> {
    shards: Vec<Shard<T>>,
    config: Config,
}

/// A shard selected by key, see [`ShardMap::shard_for`].
pub struct ShardHandle<'a, T> {
    index: usize,
    shard: &'a Shard<T>,
}

impl<'a, T> ShardHandle<'a, T> {
    /// Position of this shard in the map.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of entries in this shard, read under its shared lock.
    pub fn len(&self) -> usize {
        self.shard.len()
    }

    /// Whether the shard is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire this shard's shared lock.
    #[track_caller]
    pub fn read(&self) -> ReadLocked<'a, T> {
        self.shard.read()
    }

    /// Acquire this shard's exclusive lock.
    #[track_caller]
    pub fn lock(&self) -> Locked<'a, T> {
        self.shard.write()
    }
}

impl<T> ShardMap<T> {
    /// Create a new map with defaults (32 shards, ahash).
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Create a new map with custom config.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    /// Build from a config that is already known to be valid.
    pub(crate) fn from_config(config: Config) -> Self {
        log::debug!(
            "creating sharded map with {} shards ({:?})",
            config.shard_count,
            config.hash_function
        );
        let shards = (0..config.shard_count)
            .map(|index| Shard::new(index, config))
            .collect();
        Self { shards, config }
    }

    pub(crate) fn shards(&self) -> &[Shard<T>] {
        &self.shards
    }

    /// The configuration this map was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Figure out which shard this key belongs to.
    #[inline]
    pub fn shard_index(&self, key: &str) -> usize {
        self.config.shard_of(key)
    }

    /// The shard `key` belongs to. Takes no lock.
    pub fn shard_for(&self, key: &str) -> ShardHandle<'_, T> {
        let index = self.shard_index(key);
        ShardHandle {
            index,
            shard: &self.shards[index],
        }
    }

    /// Acquire the exclusive lock of the shard owning `key`.
    ///
    /// The returned guard exposes the no-lock primitives of [`Table`] for every
    /// key in that shard, so several operations on `key` can be combined
    /// atomically.
    ///
    /// ```rust
    /// use shardnest::ShardMap;
    ///
    /// let map: ShardMap<()> = ShardMap::new();
    /// {
    ///     let mut shard = map.lock("visits");
    ///     shard.increment("visits");
    ///     shard.increment("visits");
    /// }
    /// assert_eq!(map.counter("visits"), Some(2));
    /// ```
    #[track_caller]
    pub fn lock(&self, key: &str) -> Locked<'_, T> {
        self.shards[self.shard_index(key)].write()
    }

    /// Acquire the shared lock of the shard owning `key`.
    #[track_caller]
    pub fn read(&self, key: &str) -> ReadLocked<'_, T> {
        self.shards[self.shard_index(key)].read()
    }

    /// The table owning `key`, reached through exclusive ownership of the map.
    pub(crate) fn table_mut(&mut self, key: &str) -> &mut Table<T> {
        let index = self.shard_index(key);
        self.shards[index].get_mut()
    }

    /// Whether the map is empty, checked through exclusive ownership.
    pub(crate) fn is_empty_mut(&mut self) -> bool {
        self.shards.iter_mut().all(|shard| shard.get_mut().is_empty())
    }

    /// Whether `key` has an entry of any kind.
    pub fn contains_key(&self, key: &str) -> bool {
        self.read(key).contains_key(key)
    }

    /// Get a clone of the plain value stored under `key`.
    ///
    /// # Panics
    ///
    /// If `key` holds a counter, set, nested map or queue.
    #[track_caller]
    pub fn get(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        self.read(key).get(key).cloned()
    }

    /// Get a clone of the raw value stored under `key`, whatever its variant.
    pub fn get_value(&self, key: &str) -> Option<Value<T>>
    where
        T: Clone,
    {
        self.read(key).value(key).cloned()
    }

    /// Store a plain value under `key`, returning the previous one.
    ///
    /// # Panics
    ///
    /// If `key` holds a non-plain variant.
    #[track_caller]
    pub fn set(&self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        self.lock(&key).set(key, value)
    }

    /// Store every `(key, value)` pair, locking each key's shard in turn.
    pub fn set_many<I, K>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Insert or update `key`: stores `combine(existing, value)` and returns a
    /// clone of it.
    ///
    /// `combine` runs while the shard's exclusive lock is held. It only sees
    /// the existing value and the new one and must not touch this map.
    ///
    /// ```rust
    /// use shardnest::ShardMap;
    ///
    /// let map = ShardMap::new();
    /// map.upsert("total", 5, |old, new| old.map_or(new, |old| old + new));
    /// assert_eq!(map.upsert("total", 5, |old, new| old.map_or(new, |old| old + new)), 10);
    /// ```
    #[track_caller]
    pub fn upsert<F>(&self, key: impl Into<String>, value: T, combine: F) -> T
    where
        T: Clone,
        F: FnOnce(Option<&T>, T) -> T,
    {
        let key = key.into();
        self.lock(&key).upsert(key, value, combine).clone()
    }

    /// Store `value` only if `key` has no entry. Returns true iff it inserted.
    pub fn set_if_absent(&self, key: impl Into<String>, value: T) -> bool {
        let key = key.into();
        self.lock(&key).set_if_absent(key, value)
    }

    /// Remove the entry for `key`, whatever its variant.
    pub fn remove(&self, key: &str) -> Option<Value<T>> {
        let handle = self.shard_for(key);
        let removed = handle.lock().remove(key);
        if removed.is_some() {
            handle.shard.record_remove();
        }
        removed
    }

    /// Remove `key` if `predicate` says so.
    ///
    /// The predicate receives the key and its current value (`None` when
    /// absent) under the exclusive lock. Returns the predicate's verdict, even
    /// when there was nothing to remove.
    pub fn remove_if<F>(&self, key: &str, predicate: F) -> bool
    where
        F: FnOnce(&str, Option<&Value<T>>) -> bool,
    {
        let handle = self.shard_for(key);
        let mut table = handle.lock();
        let existed = table.contains_key(key);
        let removed = table.remove_if(key, predicate);
        if removed && existed {
            handle.shard.record_remove();
        }
        removed
    }

    /// Atomically remove and return the plain value for `key`.
    ///
    /// # Panics
    ///
    /// If `key` holds a non-plain variant.
    #[track_caller]
    pub fn pop(&self, key: &str) -> Option<T> {
        let handle = self.shard_for(key);
        let popped = handle.lock().pop(key);
        if popped.is_some() {
            handle.shard.record_remove();
        }
        popped
    }

    /// Total number of entries across all shards.
    ///
    /// Each shard is counted under its own shared lock, one after another, so
    /// concurrent writers may be reflected in some shards and not others.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.len() == 0)
    }

    /// Number of entries in each shard, in shard order.
    pub fn shard_loads(&self) -> Vec<usize> {
        self.shards.iter().map(Shard::len).collect()
    }

    /// Call `f` for every entry, holding each shard's shared lock while its
    /// entries are visited. `f` must not call back into this map.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Value<T>),
    {
        for shard in &self.shards {
            let table = shard.read();
            for (key, value) in table.iter() {
                f(key, value);
            }
        }
    }

    /// Get detailed statistics about the map and its shards.
    pub fn stats(&self) -> Stats {
        let shard_sizes: Vec<usize> = self.shard_loads();
        let operations: Vec<ShardOps> = self.shards.iter().map(|s| s.stats()).collect();
        let size: usize = shard_sizes.iter().sum();

        Stats {
            size,
            shard_sizes,
            operations,
        }
    }

    /// Per-shard load and operation diagnostics.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::from_stats(self.stats())
    }
}

impl<T> Default for ShardMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy, taking each shard's shared lock in turn.
impl<T: Clone> Clone for ShardMap<T> {
    fn clone(&self) -> Self {
        let shards = self
            .shards
            .iter()
            .map(|shard| Shard::from_table(shard.read().clone()))
            .collect();
        Self {
            shards,
            config: self.config,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ShardMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for shard in &self.shards {
            let table = shard.read();
            map.entries(table.iter());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShardMapBuilder;

    #[test]
    fn test_shard_for_matches_index() {
        let map: ShardMap<i32> = ShardMap::new();
        assert_eq!(map.shard_count(), 32);
        for i in 0..100 {
            let key = format!("key_{}", i);
            let handle = map.shard_for(&key);
            assert_eq!(handle.index(), map.shard_index(&key));
            assert!(handle.lock().owns(&key));
        }
    }

    #[test]
    fn test_clone_is_deep() {
        let map = ShardMap::new();
        map.set("a", 1);
        let copy = map.clone();
        map.set("a", 2);
        assert_eq!(copy.get("a"), Some(1));
        assert_eq!(map.get("a"), Some(2));
    }

    #[test]
    fn test_debug_lists_entries() {
        let map = ShardMapBuilder::new()
            .shard_count(1)
            .unwrap()
            .build::<i32>()
            .unwrap();
        map.set("a", 1);
        assert_eq!(format!("{:?}", map), r#"{"a": Plain(1)}"#);
    }

    #[test]
    fn test_is_empty_mut() {
        let mut map: ShardMap<i32> = ShardMap::new();
        assert!(map.is_empty_mut());
        map.table_mut("a").set("a", 1);
        assert!(!map.is_empty_mut());
        assert_eq!(map.get("a"), Some(1));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "re-entrant")]
    fn test_reentrant_upsert_panics_in_debug() {
        let map = ShardMap::new();
        map.set("k", 1);
        map.upsert("k", 2, |_, new| {
            let _ = map.get("k");
            new
        });
    }
}
