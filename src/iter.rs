use crate::shard::Shard;
use crate::shardmap::ShardMap;
use crate::value::Value;
use hashbrown::HashMap;
use rayon::prelude::*;

/// Snapshot-based iterator over a fully materialized copy of the map.
///
/// Built by copying every shard in parallel, each under its own shared lock
/// into a buffer sized to that shard, then merging the buffers. Each shard's
/// part is a consistent point-in-time view of that shard; the shards were not
/// locked together, so the whole is not a single global snapshot.
pub struct SnapshotIter<T> {
    entries: std::vec::IntoIter<(String, Value<T>)>,
}

impl<T> SnapshotIter<T>
where
    T: Clone + Send + Sync,
{
    pub(crate) fn new(shards: &[Shard<T>]) -> Self {
        let buffers: Vec<Vec<(String, Value<T>)>> =
            shards.par_iter().map(Shard::snapshot).collect();

        let total = buffers.iter().map(Vec::len).sum();
        let mut entries = Vec::with_capacity(total);
        for buffer in buffers {
            entries.extend(buffer);
        }

        Self {
            entries: entries.into_iter(),
        }
    }
}

impl<T> Iterator for SnapshotIter<T> {
    type Item = (String, Value<T>);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<T> ExactSizeIterator for SnapshotIter<T> {}

/// Lazy iterator that copies one shard at a time as it is consumed.
///
/// Each shard is copied under its shared lock into a buffer, the lock is
/// released, and the buffer is drained before the next shard is visited.
/// Entries written to a shard after it was copied are not seen.
pub struct Iter<'a, T> {
    shards: &'a [Shard<T>],
    current_shard: usize,
    buffer: std::vec::IntoIter<(String, Value<T>)>,
}

impl<'a, T> Iter<'a, T>
where
    T: Clone,
{
    pub(crate) fn new(shards: &'a [Shard<T>]) -> Self {
        Self {
            shards,
            current_shard: 0,
            buffer: Vec::new().into_iter(),
        }
    }

    /// Fill the buffer from the next non-empty shard.
    fn fill_buffer(&mut self) -> bool {
        while self.current_shard < self.shards.len() {
            let snapshot = self.shards[self.current_shard].snapshot();
            self.current_shard += 1;
            if !snapshot.is_empty() {
                self.buffer = snapshot.into_iter();
                return true;
            }
        }
        false
    }
}

impl<'a, T> Iterator for Iter<'a, T>
where
    T: Clone,
{
    type Item = (String, Value<T>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(item);
            }
            if !self.fill_buffer() {
                return None;
            }
        }
    }
}

impl<T> ShardMap<T>
where
    T: Clone + Send + Sync,
{
    /// Copy the whole map into a buffered iterator.
    ///
    /// One task per shard copies that shard under its shared lock; the call
    /// returns once every copy has finished and the buffers are merged.
    ///
    /// ```rust
    /// use shardnest::ShardMap;
    ///
    /// let map = ShardMap::new();
    /// map.set("key1", "value1");
    /// map.set("key2", "value2");
    ///
    /// assert_eq!(map.iter_buffered().len(), 2);
    /// ```
    ///
    /// # Panics
    ///
    /// In debug builds, if this thread holds a lock on one of the map's shards.
    #[track_caller]
    pub fn iter_buffered(&self) -> SnapshotIter<T> {
        Shard::assert_none_held(self.shards());
        SnapshotIter::new(self.shards())
    }

    /// Stream the map's entries as a parallel iterator.
    ///
    /// Shards are copied by parallel tasks and each copy is handed on as soon
    /// as it is ready, while other shards are still being copied. Every entry
    /// present in its shard at the moment that shard was copied is delivered
    /// exactly once.
    #[track_caller]
    pub fn par_iter(&self) -> impl ParallelIterator<Item = (String, Value<T>)> + '_ {
        Shard::assert_none_held(self.shards());
        self.shards()
            .par_iter()
            .flat_map_iter(|shard| shard.snapshot().into_iter())
    }

    /// All keys, gathered with one parallel task per shard.
    #[track_caller]
    pub fn keys(&self) -> Vec<String> {
        Shard::assert_none_held(self.shards());
        let buffers: Vec<Vec<String>> = self
            .shards()
            .par_iter()
            .map(|shard| {
                let table = shard.read();
                let mut keys = Vec::with_capacity(table.len());
                keys.extend(table.keys().map(str::to_owned));
                keys
            })
            .collect();
        buffers.into_iter().flatten().collect()
    }

    /// Copy the whole map into a plain `HashMap`.
    pub fn items(&self) -> HashMap<String, Value<T>> {
        self.iter_buffered().collect()
    }
}

impl<T> ShardMap<T>
where
    T: Clone,
{
    /// Lazily iterate over the map, copying one shard at a time.
    ///
    /// ```rust
    /// use shardnest::ShardMap;
    ///
    /// let map = ShardMap::new();
    /// map.set("key1", "value1");
    /// map.set("key2", "value2");
    ///
    /// let mut count = 0;
    /// for (_key, _value) in map.iter() {
    ///     count += 1;
    /// }
    /// assert_eq!(count, 2);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.shards())
    }
}

impl<T> ShardMap<T> {
    /// Keys gathered sequentially, one shared lock at a time.
    ///
    /// Used for maps nested inside an entry whose shard lock is held, where
    /// no parallel work is started.
    pub(crate) fn keys_sequential(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for shard in self.shards() {
            let table = shard.read();
            keys.extend(table.keys().map(str::to_owned));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> ShardMap<usize> {
        let map = ShardMap::new();
        for i in 0..n {
            map.set(format!("key_{}", i), i);
        }
        map
    }

    #[test]
    fn test_modes_agree() {
        let map = filled(500);

        let mut buffered: Vec<String> = map.iter_buffered().map(|(k, _)| k).collect();
        let mut lazy: Vec<String> = map.iter().map(|(k, _)| k).collect();
        let mut streamed: Vec<String> = map.par_iter().map(|(k, _)| k).collect();
        let mut keys = map.keys();

        buffered.sort();
        lazy.sort();
        streamed.sort();
        keys.sort();

        assert_eq!(buffered.len(), 500);
        assert_eq!(buffered, lazy);
        assert_eq!(buffered, streamed);
        assert_eq!(buffered, keys);
        assert_eq!(map.keys_sequential().len(), 500);
    }

    #[test]
    fn test_empty_map_iterates_nothing() {
        let map: ShardMap<usize> = ShardMap::new();
        assert_eq!(map.iter_buffered().len(), 0);
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.par_iter().count(), 0);
        assert!(map.keys().is_empty());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "re-entrant")]
    fn test_buffered_iter_under_own_lock_panics() {
        let map = filled(10);
        let _guard = map.lock("key_1");
        map.iter_buffered();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "re-entrant")]
    fn test_parallel_keys_under_own_lock_panics() {
        let map = filled(10);
        let _guard = map.read("key_2");
        map.keys();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_parallel_iter_under_other_map_lock_is_fine() {
        let map = filled(10);
        let other = filled(1);
        let _guard = other.lock("key_0");
        assert_eq!(map.par_iter().count(), 10);
    }

    #[test]
    fn test_items_materializes_values() {
        let map = filled(10);
        let items = map.items();
        assert_eq!(items.len(), 10);
        assert_eq!(items["key_3"].as_plain(), Some(&3));
    }
}
