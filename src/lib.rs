//! # shardnest
//!
//! A concurrent sharded map from string keys to typed values, with counting,
//! set, nested-map and priority-queue layers on top.
//!
//! Keys are spread across a fixed number of shards, each with its own
//! read-write lock, so operations on different shards don't block each other.
//! Every composite operation (check, then mutate) runs under the lock of the
//! one shard that owns its key.
//!
//! ## Features
//!
//! - **Sharded**: one lock per shard, a key always maps to the same shard
//! - **Typed values**: plain values, counters, member sets, nested maps and
//!   priority queues under one key space
//! - **Self-cleaning**: counters at zero, empty sets, empty inner maps and
//!   drained queues remove their key
//! - **Snapshots**: parallel buffered, parallel streamed and lazy iteration
//! - **Statistics**: per-shard load and operation tracking
//!
//! ## Example
//!
//! ```rust
//! use shardnest::{NestedMap, SetMap, ShardMap};
//!
//! let map = ShardMap::new();
//! map.set("key1", "value1");
//! assert_eq!(map.get("key1"), Some("value1"));
//!
//! let hits: ShardMap<()> = ShardMap::new();
//! hits.increment("/index");
//! assert_eq!(hits.counter("/index"), Some(1));
//!
//! let rooms = SetMap::new();
//! rooms.add_member("lobby", "alice");
//! assert!(rooms.contains_member("lobby", "alice"));
//!
//! let sessions: NestedMap<u32> = NestedMap::new();
//! sessions.set_inner("alice", "web", 3);
//! assert_eq!(sessions.get_inner("alice", "web"), Some(3));
//! ```
//!
//! ## Combining primitives atomically
//!
//! [`ShardMap::lock`] returns the owning shard's exclusive guard. It derefs to
//! [`Table`], whose methods are the no-lock primitives every layer is built
//! from.
//!
//! ```rust
//! use shardnest::ShardMap;
//!
//! let map: ShardMap<()> = ShardMap::new();
//! let mut shard = map.lock("followers");
//! if !shard.contains_member("followers", "bob") {
//!     shard.add_member("followers", "bob");
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use shardnest::{ShardMapBuilder, HashFunction};
//!
//! let map = ShardMapBuilder::new()
//!     .shard_count(64)?  // Must be power of two
//!     .hash_function(HashFunction::AHash)
//!     .build::<i32>()?;
//! # Ok::<(), shardnest::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Configuration and builder types.
pub mod config;
/// Counter primitives.
pub mod counter;
/// Error types.
pub mod error;
/// Serialization of map contents.
#[cfg(feature = "serde")]
pub mod export;
/// Hash function implementations.
pub mod hash;
/// Iterator implementations.
pub mod iter;
/// Map-of-maps layer.
pub mod nested;
/// Priority-queue layer.
pub mod queue;
/// Set layer.
pub mod set;
mod shard;
/// Main ShardMap implementation.
pub mod shardmap;
/// Statistics and metrics collection.
pub mod stats;
/// Per-shard contents and no-lock primitives.
pub mod table;
/// Values stored under a key.
pub mod value;

// Re-export main types
pub use config::{Config, HashFunction, ShardMapBuilder, DEFAULT_SHARD_COUNT};
pub use error::Error;
pub use iter::{Iter, SnapshotIter};
pub use nested::NestedMap;
pub use queue::{PriorityQueue, QueueMap};
pub use set::SetMap;
pub use shard::{Locked, ReadLocked};
pub use shardmap::{ShardHandle, ShardMap};
pub use stats::{Diagnostics, ShardDiagnostics, ShardOps, Stats};
pub use table::Table;
pub use value::{Kind, MemberSet, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let map = ShardMap::new();

        // Set
        assert!(map.set("key1", "value1").is_none());
        assert_eq!(map.set("key1", "value2"), Some("value1"));

        // Get
        assert_eq!(map.get("key1"), Some("value2"));
        assert!(map.get("nonexistent").is_none());

        // Pop
        assert_eq!(map.pop("key1"), Some("value2"));
        assert!(map.get("key1").is_none());
    }

    #[test]
    fn test_layers_share_one_key_space() {
        let map: ShardMap<i32> = ShardMap::new();
        map.set("plain", 1);
        map.increment("count");
        map.lock("set").add_member("set", "m");
        map.lock("nested").set_inner("nested", "x", 2);
        map.lock("queue").queue_insert("queue", 3, 1.0);

        let kinds: Vec<Kind> = ["plain", "count", "set", "nested", "queue"]
            .iter()
            .map(|key| map.get_value(key).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![Kind::Plain, Kind::Counter, Kind::Set, Kind::Nested, Kind::Queue]
        );
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_stats() {
        let map = ShardMap::new();
        map.set("key1", "value1");
        map.set("key2", "value2");

        let stats = map.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.shard_sizes.len(), DEFAULT_SHARD_COUNT);
    }

    #[test]
    fn test_builder() {
        let map = ShardMapBuilder::new()
            .shard_count(8)
            .unwrap()
            .build::<i32>()
            .unwrap();

        map.set("test", 42);
        assert_eq!(map.get("test"), Some(42));
        assert_eq!(map.shard_count(), 8);
    }
}
