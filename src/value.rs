//! Values stored under a key.

use crate::queue::PriorityQueue;
use crate::shardmap::ShardMap;
use hashbrown::HashSet;
use std::fmt;

/// Unordered set of members stored under a single key.
pub type MemberSet = HashSet<String>;

/// The value held by a shard entry.
///
/// Each layer only ever reads or writes its own variant. Typed access to a key
/// holding a different variant panics: that is a programming error, not a
/// state to recover from.
#[derive(Debug, Clone)]
pub enum Value<T> {
    /// A plain caller-supplied value.
    Plain(T),
    /// A counter maintained by `increment` / `decrement_or_delete`.
    Counter(u64),
    /// A set of members maintained by the set layer.
    Set(MemberSet),
    /// A nested map owned by this entry.
    Nested(ShardMap<T>),
    /// A min-priority queue.
    Queue(PriorityQueue<T>),
}

/// The variant tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// [`Value::Plain`]
    Plain,
    /// [`Value::Counter`]
    Counter,
    /// [`Value::Set`]
    Set,
    /// [`Value::Nested`]
    Nested,
    /// [`Value::Queue`]
    Queue,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Plain => "plain value",
            Kind::Counter => "counter",
            Kind::Set => "set",
            Kind::Nested => "nested map",
            Kind::Queue => "priority queue",
        };
        f.write_str(name)
    }
}

impl<T> Value<T> {
    /// The variant tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Plain(_) => Kind::Plain,
            Value::Counter(_) => Kind::Counter,
            Value::Set(_) => Kind::Set,
            Value::Nested(_) => Kind::Nested,
            Value::Queue(_) => Kind::Queue,
        }
    }

    /// The plain value, if this is [`Value::Plain`].
    pub fn as_plain(&self) -> Option<&T> {
        match self {
            Value::Plain(value) => Some(value),
            _ => None,
        }
    }

    /// The count, if this is [`Value::Counter`].
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            Value::Counter(count) => Some(*count),
            _ => None,
        }
    }

    /// The members, if this is [`Value::Set`].
    pub fn as_set(&self) -> Option<&MemberSet> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// The inner map, if this is [`Value::Nested`].
    pub fn as_nested(&self) -> Option<&ShardMap<T>> {
        match self {
            Value::Nested(map) => Some(map),
            _ => None,
        }
    }

    /// The queue, if this is [`Value::Queue`].
    pub fn as_queue(&self) -> Option<&PriorityQueue<T>> {
        match self {
            Value::Queue(queue) => Some(queue),
            _ => None,
        }
    }

    /// Consume the value, returning the plain value if this is [`Value::Plain`].
    pub fn into_plain(self) -> Option<T> {
        match self {
            Value::Plain(value) => Some(value),
            _ => None,
        }
    }

    /// Panic unless this value is of kind `expected`.
    #[track_caller]
    pub(crate) fn expect_kind(&self, key: &str, expected: Kind) {
        let found = self.kind();
        if found != expected {
            mismatch(key, expected, found);
        }
    }

    #[track_caller]
    pub(crate) fn plain(&self, key: &str) -> &T {
        match self {
            Value::Plain(value) => value,
            other => mismatch(key, Kind::Plain, other.kind()),
        }
    }

    #[track_caller]
    pub(crate) fn counter_mut(&mut self, key: &str) -> &mut u64 {
        match self {
            Value::Counter(count) => count,
            other => mismatch(key, Kind::Counter, other.kind()),
        }
    }

    #[track_caller]
    pub(crate) fn set(&self, key: &str) -> &MemberSet {
        match self {
            Value::Set(set) => set,
            other => mismatch(key, Kind::Set, other.kind()),
        }
    }

    #[track_caller]
    pub(crate) fn set_mut(&mut self, key: &str) -> &mut MemberSet {
        match self {
            Value::Set(set) => set,
            other => mismatch(key, Kind::Set, other.kind()),
        }
    }

    #[track_caller]
    pub(crate) fn nested(&self, key: &str) -> &ShardMap<T> {
        match self {
            Value::Nested(map) => map,
            other => mismatch(key, Kind::Nested, other.kind()),
        }
    }

    #[track_caller]
    pub(crate) fn nested_mut(&mut self, key: &str) -> &mut ShardMap<T> {
        match self {
            Value::Nested(map) => map,
            other => mismatch(key, Kind::Nested, other.kind()),
        }
    }

    #[track_caller]
    pub(crate) fn queue(&self, key: &str) -> &PriorityQueue<T> {
        match self {
            Value::Queue(queue) => queue,
            other => mismatch(key, Kind::Queue, other.kind()),
        }
    }

    #[track_caller]
    pub(crate) fn queue_mut(&mut self, key: &str) -> &mut PriorityQueue<T> {
        match self {
            Value::Queue(queue) => queue,
            other => mismatch(key, Kind::Queue, other.kind()),
        }
    }
}

/// Abort on a key holding the wrong variant.
#[cold]
#[track_caller]
pub(crate) fn mismatch(key: &str, expected: Kind, found: Kind) -> ! {
    panic!(
        "variant mismatch for key {:?}: expected {}, found {}",
        key, expected, found
    )
}
