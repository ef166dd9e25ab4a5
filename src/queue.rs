//! A priority queue of values per key.
//!
//! Lower priorities pop first. Values inserted with equal priority pop in
//! insertion order. The key is removed when its queue is drained.

use crate::config::Config;
use crate::error::Error;
use crate::shard::Locked;
use crate::shardmap::ShardMap;
use crate::table::Table;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Min-priority queue with FIFO order among equal priorities.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Item<T>>,
    seq: u64,
}

#[derive(Debug, Clone)]
struct Item<T> {
    priority: f64,
    seq: u64,
    value: T,
}

// BinaryHeap is a max-heap, so the comparison is reversed: the lowest
// priority, then the lowest sequence number, compares greatest.
impl<T> Ord for Item<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Item<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Item<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Item<T> {}

impl<T> PriorityQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Insert `value` with `priority`.
    pub fn insert(&mut self, value: T, priority: f64) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Item {
            priority,
            seq,
            value,
        });
    }

    /// Remove and return the value with the lowest priority.
    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|item| item.value)
    }

    /// Lowest priority currently queued.
    pub fn peek_priority(&self) -> Option<f64> {
        self.heap.peek().map(|item| item.priority)
    }

    /// Number of queued values.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Every queued value, in the order they would be popped.
    pub fn ordered(&self) -> Vec<&T> {
        let mut items: Vec<&Item<T>> = self.heap.iter().collect();
        items.sort_by(|a, b| b.cmp(a));
        items.into_iter().map(|item| &item.value).collect()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Table<T> {
    /// Insert `value` into the queue under `key`. Returns true iff the queue
    /// was created by this call.
    ///
    /// # Panics
    ///
    /// If `key` holds something other than a priority queue.
    #[track_caller]
    pub fn queue_insert(&mut self, key: &str, value: T, priority: f64) -> bool {
        self.check_owner(key);
        let created = !self.items.contains_key(key);
        self.items
            .entry_ref(key)
            .or_insert_with(|| Value::Queue(PriorityQueue::new()))
            .queue_mut(key)
            .insert(value, priority);
        created
    }

    /// Pop the lowest-priority value under `key`, removing the key once its
    /// queue is empty.
    #[track_caller]
    pub fn queue_pop(&mut self, key: &str) -> Option<T> {
        self.check_owner(key);
        let queue = self.items.get_mut(key)?.queue_mut(key);
        let value = queue.pop();
        if queue.is_empty() {
            self.items.remove(key);
            log::trace!("removed key {:?} with drained queue", key);
        }
        value
    }

    /// Number of values queued under `key`.
    #[track_caller]
    pub fn queue_len(&self, key: &str) -> Option<usize> {
        self.value(key).map(|value| value.queue(key).len())
    }

    /// Lowest priority queued under `key`.
    #[track_caller]
    pub fn peek_priority(&self, key: &str) -> Option<f64> {
        self.value(key)?.queue(key).peek_priority()
    }
}

/// Concurrent map from keys to priority queues.
///
/// # Example
///
/// ```rust
/// use shardnest::QueueMap;
///
/// let jobs = QueueMap::new();
/// jobs.insert("q", "later", 1.0);
/// jobs.insert("q", "sooner", 0.5);
///
/// assert_eq!(jobs.pop("q"), Some("sooner"));
/// assert_eq!(jobs.pop("q"), Some("later"));
/// assert!(!jobs.contains_key("q"));
/// ```
#[derive(Debug)]
pub struct QueueMap<T> {
    map: ShardMap<T>,
}

impl<T> QueueMap<T> {
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

    /// Insert `value` under `key` with `priority`; lower pops first.
    /// Returns true iff a new queue was created.
    pub fn insert(&self, key: &str, value: T, priority: f64) -> bool {
        self.map.lock(key).queue_insert(key, value, priority)
    }

    /// Pop the lowest-priority value under `key`.
    pub fn pop(&self, key: &str) -> Option<T> {
        self.map.lock(key).queue_pop(key)
    }

    /// Number of values queued under `key`.
    pub fn queue_len(&self, key: &str) -> Option<usize> {
        self.map.read(key).queue_len(key)
    }

    /// Lowest priority queued under `key`.
    pub fn peek_priority(&self, key: &str) -> Option<f64> {
        self.map.read(key).peek_priority(key)
    }

    /// Whether `key` has a queue.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Drop the whole queue under `key`. Returns true iff it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    /// Number of keys holding a queue.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no key holds a queue.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Lock the shard owning `key` to combine queue primitives.
    pub fn lock(&self, key: &str) -> Locked<'_, T> {
        self.map.lock(key)
    }

    /// The underlying sharded map.
    pub fn as_map(&self) -> &ShardMap<T> {
        &self.map
    }
}

impl<T> QueueMap<T>
where
    T: Clone + Send + Sync,
{
    /// All keys that currently hold a queue.
    pub fn keys(&self) -> Vec<String> {
        self.map.keys()
    }
}

impl<T> Default for QueueMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_then_fifo() {
        let mut queue = PriorityQueue::new();
        queue.insert("c", 2.0);
        queue.insert("a1", 1.0);
        queue.insert("b", 1.5);
        queue.insert("a2", 1.0);
        queue.insert("z", -3.0);

        assert_eq!(queue.peek_priority(), Some(-3.0));
        assert_eq!(queue.ordered(), vec![&"z", &"a1", &"a2", &"b", &"c"]);

        let popped: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(popped, vec!["z", "a1", "a2", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_map_vacuums_when_drained() {
        let queues = QueueMap::new();
        assert!(queues.insert("k", 1, 1.0));
        assert!(!queues.insert("k", 2, 0.5));
        assert_eq!(queues.queue_len("k"), Some(2));
        assert_eq!(queues.peek_priority("k"), Some(0.5));

        assert_eq!(queues.pop("k"), Some(2));
        assert_eq!(queues.pop("k"), Some(1));
        assert!(!queues.contains_key("k"));
        assert_eq!(queues.pop("k"), None);
    }

    #[test]
    #[should_panic(expected = "expected priority queue, found plain value")]
    fn test_queue_op_on_plain_panics() {
        let queues = QueueMap::new();
        queues.as_map().set("k", 1);
        queues.insert("k", 2, 1.0);
    }
}
