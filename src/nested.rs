//! A full inner [`ShardMap`] per outer key.
//!
//! The outer shard's lock is taken first and held for the whole operation.
//! Writers reach the inner map through exclusive ownership and take no inner
//! locks at all; readers under the outer shared lock take the inner map's
//! shared locks. An inner map belongs to exactly one outer entry, so inner
//! locks are only ever taken after the outer one.
//!
//! The outer key is removed as soon as its inner map becomes empty. Inner
//! entries may be plain values, counters or member sets; an inner set that
//! empties removes its inner key first.

use crate::config::Config;
use crate::error::Error;
use crate::shard::Locked;
use crate::shardmap::ShardMap;
use crate::table::Table;
use crate::value::Value;

impl<T> Table<T> {
    /// The inner map under `key`, created empty if absent.
    ///
    /// Callers must leave at least one inner entry behind.
    #[track_caller]
    fn inner_or_create(&mut self, key: &str) -> &mut ShardMap<T> {
        self.check_owner(key);
        let config = self.nested_config();
        self.items
            .entry_ref(key)
            .or_insert_with(|| Value::Nested(ShardMap::from_config(config)))
            .nested_mut(key)
    }

    /// Apply `f` to an existing inner map, then drop the outer key if the
    /// inner map was left empty. `None` if `key` has no inner map.
    #[track_caller]
    fn update_inner<R, F>(&mut self, key: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut ShardMap<T>) -> R,
    {
        self.check_owner(key);
        let inner = self.items.get_mut(key)?.nested_mut(key);
        let result = f(&mut *inner);
        if inner.is_empty_mut() {
            self.items.remove(key);
            log::trace!("removed key {:?} with empty inner map", key);
        }
        Some(result)
    }

    /// Store `value` under `inner_key` in the inner map of `key`. Returns the
    /// previous inner value.
    ///
    /// # Panics
    ///
    /// If `key` holds something other than a nested map, or `inner_key`
    /// holds something other than a plain value.
    #[track_caller]
    pub fn set_inner(&mut self, key: &str, inner_key: impl Into<String>, value: T) -> Option<T> {
        let inner_key = inner_key.into();
        self.inner_or_create(key)
            .table_mut(&inner_key)
            .set(inner_key, value)
    }

    /// Store `T::default()` under each inner key. An empty `inner_keys` leaves
    /// the map untouched.
    #[track_caller]
    pub fn set_inner_multi<I, S>(&mut self, key: &str, inner_keys: I)
    where
        T: Default,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner_keys = inner_keys.into_iter().peekable();
        if inner_keys.peek().is_none() {
            return;
        }
        let inner = self.inner_or_create(key);
        for inner_key in inner_keys {
            let inner_key = inner_key.into();
            inner.table_mut(&inner_key).set(inner_key, T::default());
        }
    }

    /// Clone of the plain value under `inner_key` in the inner map of `key`.
    #[track_caller]
    pub fn get_inner(&self, key: &str, inner_key: &str) -> Option<T>
    where
        T: Clone,
    {
        self.value(key)?.nested(key).get(inner_key)
    }

    /// Whether the inner map of `key` has an entry for `inner_key`.
    #[track_caller]
    pub fn contains_inner(&self, key: &str, inner_key: &str) -> bool {
        self.value(key)
            .is_some_and(|value| value.nested(key).contains_key(inner_key))
    }

    /// Increment the counter under `inner_key` in the inner map of `key`,
    /// creating both as needed. Returns the new count.
    #[track_caller]
    pub fn increment_inner(&mut self, key: &str, inner_key: &str) -> u64 {
        self.inner_or_create(key)
            .table_mut(inner_key)
            .increment(inner_key)
    }

    /// Increment several inner counters of `key`. An empty `inner_keys`
    /// leaves the map untouched.
    #[track_caller]
    pub fn increment_inner_multi<I, S>(&mut self, key: &str, inner_keys: I) -> Vec<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner_keys = inner_keys.into_iter().peekable();
        if inner_keys.peek().is_none() {
            return Vec::new();
        }
        let inner = self.inner_or_create(key);
        inner_keys
            .map(|inner_key| {
                let inner_key = inner_key.as_ref();
                inner.table_mut(inner_key).increment(inner_key)
            })
            .collect()
    }

    /// Decrement the counter under `inner_key`, removing it at zero and the
    /// outer key once its inner map is empty. Returns true iff the inner key
    /// was removed.
    #[track_caller]
    pub fn decrement_inner(&mut self, key: &str, inner_key: &str) -> bool {
        self.update_inner(key, |inner| {
            inner.table_mut(inner_key).decrement_or_delete(inner_key)
        })
        .unwrap_or(false)
    }

    /// Decrement several inner counters of `key`, returning the inner keys
    /// that were removed.
    #[track_caller]
    pub fn decrement_inner_multi<I, S>(&mut self, key: &str, inner_keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_inner(key, |inner| {
            inner_keys
                .into_iter()
                .filter(|inner_key| {
                    let inner_key = inner_key.as_ref();
                    inner.table_mut(inner_key).decrement_or_delete(inner_key)
                })
                .map(|inner_key| inner_key.as_ref().to_owned())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Remove `inner_key` from the inner map of `key`, removing the outer key
    /// once its inner map is empty. Returns true iff the inner key existed.
    #[track_caller]
    pub fn delete_inner(&mut self, key: &str, inner_key: &str) -> bool {
        self.update_inner(key, |inner| {
            inner.table_mut(inner_key).remove(inner_key).is_some()
        })
        .unwrap_or(false)
    }

    /// Remove several inner keys of `key`. Returns how many existed.
    #[track_caller]
    pub fn delete_inner_multi<I, S>(&mut self, key: &str, inner_keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_inner(key, |inner| {
            inner_keys
                .into_iter()
                .filter(|inner_key| {
                    let inner_key = inner_key.as_ref();
                    inner.table_mut(inner_key).remove(inner_key).is_some()
                })
                .count()
        })
        .unwrap_or(0)
    }

    /// Keys of the inner map of `key`, in no particular order.
    #[track_caller]
    pub fn inner_keys(&self, key: &str) -> Option<Vec<String>> {
        self.value(key)
            .map(|value| value.nested(key).keys_sequential())
    }

    /// Number of entries in the inner map of `key`.
    #[track_caller]
    pub fn inner_len(&self, key: &str) -> Option<usize> {
        self.value(key).map(|value| value.nested(key).len())
    }

    /// Add `member` to the set under `inner_key` in the inner map of `key`.
    /// Returns true iff it was newly added.
    #[track_caller]
    pub fn add_inner_member(
        &mut self,
        key: &str,
        inner_key: &str,
        member: impl Into<String>,
    ) -> bool {
        self.inner_or_create(key)
            .table_mut(inner_key)
            .add_member(inner_key, member)
    }

    /// Remove `member` from the set under `inner_key`. An emptied set removes
    /// its inner key, and an emptied inner map removes `key`. Returns true iff
    /// the member was present.
    #[track_caller]
    pub fn remove_inner_member(&mut self, key: &str, inner_key: &str, member: &str) -> bool {
        self.update_inner(key, |inner| {
            inner.table_mut(inner_key).remove_member(inner_key, member)
        })
        .unwrap_or(false)
    }

    /// Members of the set under `inner_key` in the inner map of `key`.
    #[track_caller]
    pub fn inner_members(&self, key: &str, inner_key: &str) -> Option<Vec<String>> {
        self.value(key)?.nested(key).read(inner_key).members(inner_key)
    }
}

/// Concurrent map of maps: each outer key owns a full inner [`ShardMap`].
///
/// # Example
///
/// ```rust
/// use shardnest::NestedMap;
///
/// let rooms = NestedMap::new();
/// rooms.set_inner("lobby", "alice", 1);
/// rooms.set_inner("lobby", "bob", 2);
///
/// let mut who = rooms.inner_keys("lobby").unwrap();
/// who.sort();
/// assert_eq!(who, vec!["alice", "bob"]);
///
/// rooms.delete_inner("lobby", "alice");
/// rooms.delete_inner("lobby", "bob");
/// assert!(!rooms.contains_key("lobby"));
/// ```
#[derive(Debug)]
pub struct NestedMap<T> {
    map: ShardMap<T>,
}

impl<T> NestedMap<T> {
    /// Create an empty map with the default configuration.
    pub fn new() -> Self {
        Self {
            map: ShardMap::new(),
        }
    }

    /// Create an empty map with a custom configuration. Inner maps use the
    /// same shard count and hash function.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        Ok(Self {
            map: ShardMap::with_config(config)?,
        })
    }

    /// Store `value` under `inner_key` for `key`, creating the inner map on
    /// first use.
    pub fn set_inner(&self, key: &str, inner_key: impl Into<String>, value: T) -> Option<T> {
        self.map.lock(key).set_inner(key, inner_key, value)
    }

    /// Store `T::default()` under each inner key for `key`.
    pub fn set_inner_multi<I, S>(&self, key: &str, inner_keys: I)
    where
        T: Default,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map.lock(key).set_inner_multi(key, inner_keys)
    }

    /// Clone of the inner value under `inner_key` for `key`.
    pub fn get_inner(&self, key: &str, inner_key: &str) -> Option<T>
    where
        T: Clone,
    {
        self.map.read(key).get_inner(key, inner_key)
    }

    /// Whether `key` has an inner entry for `inner_key`.
    pub fn contains_inner(&self, key: &str, inner_key: &str) -> bool {
        self.map.read(key).contains_inner(key, inner_key)
    }

    /// Increment the inner counter `inner_key` for `key`.
    pub fn increment_inner(&self, key: &str, inner_key: &str) -> u64 {
        self.map.lock(key).increment_inner(key, inner_key)
    }

    /// Increment several inner counters for `key` atomically.
    pub fn increment_inner_multi<I, S>(&self, key: &str, inner_keys: I) -> Vec<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map.lock(key).increment_inner_multi(key, inner_keys)
    }

    /// Decrement the inner counter `inner_key` for `key`, removing it at zero.
    pub fn decrement_inner(&self, key: &str, inner_key: &str) -> bool {
        self.map.lock(key).decrement_inner(key, inner_key)
    }

    /// Decrement several inner counters for `key`, returning those removed.
    pub fn decrement_inner_multi<I, S>(&self, key: &str, inner_keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map.lock(key).decrement_inner_multi(key, inner_keys)
    }

    /// Remove `inner_key` for `key`; `key` goes away with its last inner key.
    pub fn delete_inner(&self, key: &str, inner_key: &str) -> bool {
        self.map.lock(key).delete_inner(key, inner_key)
    }

    /// Remove several inner keys for `key`. Returns how many existed.
    pub fn delete_inner_multi<I, S>(&self, key: &str, inner_keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map.lock(key).delete_inner_multi(key, inner_keys)
    }

    /// Inner keys for `key`, in no particular order.
    pub fn inner_keys(&self, key: &str) -> Option<Vec<String>> {
        self.map.read(key).inner_keys(key)
    }

    /// Number of inner entries for `key`.
    pub fn inner_len(&self, key: &str) -> Option<usize> {
        self.map.read(key).inner_len(key)
    }

    /// Add `member` to the inner set `inner_key` for `key`.
    pub fn add_inner_member(&self, key: &str, inner_key: &str, member: impl Into<String>) -> bool {
        self.map.lock(key).add_inner_member(key, inner_key, member)
    }

    /// Remove `member` from the inner set `inner_key` for `key`.
    pub fn remove_inner_member(&self, key: &str, inner_key: &str, member: &str) -> bool {
        self.map.lock(key).remove_inner_member(key, inner_key, member)
    }

    /// Members of the inner set `inner_key` for `key`.
    pub fn inner_members(&self, key: &str, inner_key: &str) -> Option<Vec<String>> {
        self.map.read(key).inner_members(key, inner_key)
    }

    /// Whether `key` has an inner map.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Remove `key` with its whole inner map. Returns true iff it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    /// Number of outer keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether there are no outer keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Lock the outer shard owning `key` to combine nested primitives.
    pub fn lock(&self, key: &str) -> Locked<'_, T> {
        self.map.lock(key)
    }

    /// The underlying outer map.
    pub fn as_map(&self) -> &ShardMap<T> {
        &self.map
    }
}

impl<T> NestedMap<T>
where
    T: Clone + Send + Sync,
{
    /// All outer keys.
    pub fn keys(&self) -> Vec<String> {
        self.map.keys()
    }
}

impl<T> Default for NestedMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
