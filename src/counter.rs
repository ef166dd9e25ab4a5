//! Counters stored in place of plain values.
//!
//! A counter starts at 1 on its first increment and its key is removed when it
//! is decremented back to zero, so no key ever holds a zero count.

use crate::shardmap::ShardMap;
use crate::table::Table;
use crate::value::{mismatch, Kind, Value};

impl<T> Table<T> {
    /// Increment the counter for `key`, creating it at 1. Returns the new count.
    ///
    /// # Panics
    ///
    /// If `key` holds something other than a counter.
    #[track_caller]
    pub fn increment(&mut self, key: &str) -> u64 {
        self.check_owner(key);
        if let Some(value) = self.items.get_mut(key) {
            let count = value.counter_mut(key);
            *count += 1;
            return *count;
        }
        self.items.insert(key.to_owned(), Value::Counter(1));
        1
    }

    /// Decrement the counter for `key`, removing the key when it reaches zero.
    ///
    /// Returns true iff the key was removed. An absent key is left alone.
    ///
    /// # Panics
    ///
    /// If `key` holds something other than a counter.
    #[track_caller]
    pub fn decrement_or_delete(&mut self, key: &str) -> bool {
        self.check_owner(key);
        let Some(value) = self.items.get_mut(key) else {
            return false;
        };
        let count = value.counter_mut(key);
        if *count > 1 {
            *count -= 1;
            return false;
        }
        self.items.remove(key);
        true
    }

    /// Current count for `key`.
    ///
    /// # Panics
    ///
    /// If `key` holds something other than a counter.
    #[track_caller]
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.value(key).map(|value| match value {
            Value::Counter(count) => *count,
            other => mismatch(key, Kind::Counter, other.kind()),
        })
    }
}

impl<T> ShardMap<T> {
    /// Increment the counter for `key`, creating it at 1. Returns the new count.
    ///
    /// ```rust
    /// use shardnest::ShardMap;
    ///
    /// let map: ShardMap<()> = ShardMap::new();
    /// assert_eq!(map.increment("hits"), 1);
    /// assert_eq!(map.increment("hits"), 2);
    /// assert!(!map.decrement_or_delete("hits"));
    /// assert!(map.decrement_or_delete("hits"));
    /// assert!(!map.contains_key("hits"));
    /// ```
    #[track_caller]
    pub fn increment(&self, key: &str) -> u64 {
        self.lock(key).increment(key)
    }

    /// Increment each key in turn. Each key is locked on its own; there is no
    /// atomicity across keys.
    #[track_caller]
    pub fn increment_many<I, S>(&self, keys: I) -> Vec<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| self.increment(key.as_ref()))
            .collect()
    }

    /// Decrement the counter for `key`, removing it at zero. Returns true iff
    /// the key was removed.
    #[track_caller]
    pub fn decrement_or_delete(&self, key: &str) -> bool {
        self.lock(key).decrement_or_delete(key)
    }

    /// Decrement each key in turn, returning the keys that reached zero and
    /// were removed.
    #[track_caller]
    pub fn decrement_many<I, S>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .filter(|key| self.decrement_or_delete(key.as_ref()))
            .map(|key| key.as_ref().to_owned())
            .collect()
    }

    /// Current count for `key`.
    #[track_caller]
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.read(key).counter(key)
    }
}
