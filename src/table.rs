use crate::config::Config;
use crate::value::{Kind, Value};
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

/// The contents of one shard: key to [`Value`] associations.
///
/// Every method on `Table` is a no-lock primitive. For a shared map a `&Table`
/// is only reachable through [`ReadLocked`](crate::ReadLocked) and a
/// `&mut Table` only through [`Locked`](crate::Locked), so having one is proof
/// that the shard's lock is held. Keys passed in must belong to this shard;
/// this is checked in debug builds only.
///
/// Composite primitives (counters, sets, nested maps, queues) live in the
/// modules for those layers.
#[derive(Clone)]
pub struct Table<T> {
    pub(crate) items: HashMap<String, Value<T>>,
    index: usize,
    config: Config,
}

impl<T> Table<T> {
    pub(crate) fn new(index: usize, config: Config) -> Self {
        let items = match config.capacity_per_shard {
            Some(capacity) => HashMap::with_capacity(capacity),
            None => HashMap::new(),
        };
        Self {
            items,
            index,
            config,
        }
    }

    /// Index of the shard this table belongs to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether `key` is routed to this shard.
    pub fn owns(&self, key: &str) -> bool {
        self.config.shard_of(key) == self.index
    }

    #[inline]
    pub(crate) fn check_owner(&self, key: &str) {
        debug_assert!(
            self.owns(key),
            "key {:?} does not belong to shard {}",
            key,
            self.index
        );
    }

    /// Config used to build maps nested in this table's entries.
    pub(crate) fn nested_config(&self) -> Config {
        self.config.nested()
    }

    /// Number of entries in this shard.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this shard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `key` has an entry of any kind.
    pub fn contains_key(&self, key: &str) -> bool {
        self.check_owner(key);
        self.items.contains_key(key)
    }

    /// The raw value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&Value<T>> {
        self.check_owner(key);
        self.items.get(key)
    }

    /// The plain value stored under `key`.
    ///
    /// # Panics
    ///
    /// If `key` holds a non-plain variant.
    #[track_caller]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.value(key).map(|value| value.plain(key))
    }

    /// Store a plain value, returning the previous one.
    ///
    /// # Panics
    ///
    /// If `key` holds a non-plain variant.
    #[track_caller]
    pub fn set(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        self.check_owner(&key);
        if let Some(existing) = self.items.get(&key) {
            existing.expect_kind(&key, Kind::Plain);
        }
        self.items
            .insert(key, Value::Plain(value))
            .and_then(Value::into_plain)
    }

    /// Store `value` only if `key` has no entry. Returns true iff it inserted.
    pub fn set_if_absent(&mut self, key: impl Into<String>, value: T) -> bool {
        let key = key.into();
        self.check_owner(&key);
        if self.items.contains_key(&key) {
            return false;
        }
        self.items.insert(key, Value::Plain(value));
        true
    }

    /// Insert or update: stores `combine(existing, value)` and returns it.
    ///
    /// # Panics
    ///
    /// If `key` holds a non-plain variant.
    #[track_caller]
    pub fn upsert<F>(&mut self, key: impl Into<String>, value: T, combine: F) -> &T
    where
        F: FnOnce(Option<&T>, T) -> T,
    {
        let key = key.into();
        self.check_owner(&key);
        let combined = Value::Plain(combine(self.get(&key), value));
        let slot = match self.items.entry(key) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                *slot = combined;
                slot
            }
            Entry::Vacant(entry) => entry.insert(combined),
        };
        match slot {
            Value::Plain(stored) => stored,
            _ => unreachable!("upsert always stores a plain value"),
        }
    }

    /// Remove the entry for `key`, whatever its variant.
    pub fn remove(&mut self, key: &str) -> Option<Value<T>> {
        self.check_owner(key);
        self.items.remove(key)
    }

    /// Ask `predicate` whether to remove `key`, and remove it if so.
    ///
    /// Returns the predicate's verdict, whether or not an entry existed.
    pub fn remove_if<F>(&mut self, key: &str, predicate: F) -> bool
    where
        F: FnOnce(&str, Option<&Value<T>>) -> bool,
    {
        self.check_owner(key);
        let remove = predicate(key, self.items.get(key));
        if remove {
            self.items.remove(key);
        }
        remove
    }

    /// Remove and return the plain value for `key`.
    ///
    /// # Panics
    ///
    /// If `key` holds a non-plain variant; the entry is left in place.
    #[track_caller]
    pub fn pop(&mut self, key: &str) -> Option<T> {
        self.check_owner(key);
        self.items.get(key)?.expect_kind(key, Kind::Plain);
        self.items.remove(key).and_then(Value::into_plain)
    }

    /// Iterate over this shard's keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.keys().map(String::as_str)
    }

    /// Iterate over this shard's entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value<T>)> + '_ {
        self.items.iter().map(|(key, value)| (key.as_str(), value))
    }
}
