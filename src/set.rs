//! A set of string members per key.
//!
//! The set under a key is created by the first member added and the key is
//! removed as soon as its last member is removed. A set is never locked on its
//! own: every access happens under the lock of the shard holding its key.

use crate::config::Config;
use crate::error::Error;
use crate::shard::Locked;
use crate::shardmap::ShardMap;
use crate::table::Table;
use crate::value::{Kind, MemberSet, Value};

impl<T> Table<T> {
    /// Add `member` to the set under `key`, creating the set if needed.
    /// Returns true iff the member was not already present.
    ///
    /// # Panics
    ///
    /// If `key` holds something other than a set.
    #[track_caller]
    pub fn add_member(&mut self, key: &str, member: impl Into<String>) -> bool {
        self.check_owner(key);
        self.items
            .entry_ref(key)
            .or_insert_with(|| Value::Set(MemberSet::new()))
            .set_mut(key)
            .insert(member.into())
    }

    /// Add every member to the set under `key`. Returns how many were new.
    /// An empty `members` leaves the map untouched.
    #[track_caller]
    pub fn add_members<I, S>(&mut self, key: &str, members: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_owner(key);
        let mut members = members.into_iter().peekable();
        if members.peek().is_none() {
            return 0;
        }
        let set = self
            .items
            .entry_ref(key)
            .or_insert_with(|| Value::Set(MemberSet::new()))
            .set_mut(key);
        members
            .map(|member| set.insert(member.into()))
            .filter(|added| *added)
            .count()
    }

    /// Remove `member` from the set under `key`, removing the key if the set
    /// becomes empty. Returns true iff the member was present.
    #[track_caller]
    pub fn remove_member(&mut self, key: &str, member: &str) -> bool {
        self.remove_members(key, [member]) == 1
    }

    /// Remove every member from the set under `key`, removing the key if the
    /// set becomes empty. Returns how many were present.
    #[track_caller]
    pub fn remove_members<I, S>(&mut self, key: &str, members: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_owner(key);
        let Some(value) = self.items.get_mut(key) else {
            return 0;
        };
        let set = value.set_mut(key);
        let removed = members
            .into_iter()
            .filter(|member| set.remove(member.as_ref()))
            .count();
        if set.is_empty() {
            self.items.remove(key);
            log::trace!("removed key {:?} with empty set", key);
        }
        removed
    }

    /// Whether the set under `key` contains `member`.
    #[track_caller]
    pub fn contains_member(&self, key: &str, member: &str) -> bool {
        self.value(key)
            .is_some_and(|value| value.set(key).contains(member))
    }

    /// The members of the set under `key`, in no particular order.
    #[track_caller]
    pub fn members(&self, key: &str) -> Option<Vec<String>> {
        self.value(key)
            .map(|value| value.set(key).iter().cloned().collect())
    }

    /// Number of members in the set under `key`.
    #[track_caller]
    pub fn member_count(&self, key: &str) -> Option<usize> {
        self.value(key).map(|value| value.set(key).len())
    }

    /// Remove the key and return all of its members.
    ///
    /// # Panics
    ///
    /// If `key` holds something other than a set; the entry is left in place.
    #[track_caller]
    pub fn pop_members(&mut self, key: &str) -> Option<Vec<String>> {
        self.check_owner(key);
        self.items.get(key)?.expect_kind(key, Kind::Set);
        match self.items.remove(key) {
            Some(Value::Set(set)) => Some(set.into_iter().collect()),
            _ => None,
        }
    }
}

/// Concurrent map from keys to sets of string members.
///
/// # Example
///
/// ```rust
/// use shardnest::SetMap;
///
/// let subscribers = SetMap::new();
/// assert!(subscribers.add_member("news", "alice"));
/// assert!(!subscribers.add_member("news", "alice"));
/// assert_eq!(subscribers.members("news"), Some(vec!["alice".to_string()]));
///
/// subscribers.remove_member("news", "alice");
/// assert!(!subscribers.contains_key("news"));
/// ```
#[derive(Debug, Default)]
pub struct SetMap {
    map: ShardMap<()>,
}

impl SetMap {
    /// Create an empty map with the default configuration.
    pub fn new() -> Self {
        Self {
            map: ShardMap::new(),
        }
    }

    /// Create an empty map with a custom configuration.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        Ok(Self {
            map: ShardMap::with_config(config)?,
        })
    }

    /// Add `member` under `key`. Returns true iff it was newly added.
    pub fn add_member(&self, key: &str, member: impl Into<String>) -> bool {
        self.map.lock(key).add_member(key, member)
    }

    /// Add several members under `key` atomically. Returns how many were new.
    pub fn add_members<I, S>(&self, key: &str, members: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map.lock(key).add_members(key, members)
    }

    /// Remove `member` from `key`, deleting `key` once its set is empty.
    pub fn remove_member(&self, key: &str, member: &str) -> bool {
        self.map.lock(key).remove_member(key, member)
    }

    /// Remove several members from `key` atomically.
    pub fn remove_members<I, S>(&self, key: &str, members: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map.lock(key).remove_members(key, members)
    }

    /// Whether `member` is in the set under `key`.
    pub fn contains_member(&self, key: &str, member: &str) -> bool {
        self.map.read(key).contains_member(key, member)
    }

    /// The members under `key`, in no particular order.
    pub fn members(&self, key: &str) -> Option<Vec<String>> {
        self.map.read(key).members(key)
    }

    /// Number of members under `key`.
    pub fn member_count(&self, key: &str) -> Option<usize> {
        self.map.read(key).member_count(key)
    }

    /// Atomically remove `key` and return its members.
    pub fn pop_members(&self, key: &str) -> Option<Vec<String>> {
        self.map.lock(key).pop_members(key)
    }

    /// Whether `key` has a set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Remove `key` and its whole set. Returns true iff it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    /// All keys that currently hold a set.
    pub fn keys(&self) -> Vec<String> {
        self.map.keys()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no key holds a set.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Lock the shard owning `key` to combine several set primitives atomically.
    pub fn lock(&self, key: &str) -> Locked<'_, ()> {
        self.map.lock(key)
    }

    /// The underlying sharded map.
    pub fn as_map(&self) -> &ShardMap<()> {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_members_empty_does_not_create_key() {
        let sets = SetMap::new();
        assert_eq!(sets.add_members("k", Vec::<String>::new()), 0);
        assert!(!sets.contains_key("k"));
    }

    #[test]
    fn test_remove_members_vacuums() {
        let sets = SetMap::new();
        assert_eq!(sets.add_members("k", ["a", "b", "a"]), 2);
        assert_eq!(sets.remove_members("k", ["a", "zzz"]), 1);
        assert_eq!(sets.member_count("k"), Some(1));
        assert_eq!(sets.remove_members("k", ["b"]), 1);
        assert!(!sets.contains_key("k"));
        assert_eq!(sets.remove_members("k", ["b"]), 0);
    }

    #[test]
    fn test_pop_members() {
        let sets = SetMap::new();
        sets.add_members("k", ["x", "y"]);
        let mut popped = sets.pop_members("k").unwrap();
        popped.sort();
        assert_eq!(popped, vec!["x".to_string(), "y".to_string()]);
        assert!(!sets.contains_key("k"));
        assert_eq!(sets.pop_members("k"), None);
    }

    #[test]
    #[should_panic(expected = "expected set, found counter")]
    fn test_member_ops_on_counter_panic() {
        let map: ShardMap<()> = ShardMap::new();
        map.increment("k");
        map.lock("k").add_member("k", "a");
    }
}
