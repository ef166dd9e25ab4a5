//! Serialization of map contents.
//!
//! A map serializes as an object keyed by its string keys. Each value is
//! written in the natural shape of its variant: plain values as themselves,
//! counters as integers, sets as sorted lists of members, nested maps as
//! objects and queues as lists of values in pop order.
//!
//! Every shard is copied under its own shared lock first, so the output is a
//! union of per-shard views like any other whole-map read.

use crate::nested::NestedMap;
use crate::queue::{PriorityQueue, QueueMap};
use crate::set::SetMap;
use crate::shardmap::ShardMap;
use crate::value::{MemberSet, Value};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

impl<T> Serialize for ShardMap<T>
where
    T: Serialize + Clone + Send + Sync,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.iter_buffered();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(&key, &value)?;
        }
        map.end()
    }
}

impl<T> Serialize for Value<T>
where
    T: Serialize + Clone + Send + Sync,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Plain(value) => value.serialize(serializer),
            Value::Counter(count) => serializer.serialize_u64(*count),
            Value::Set(members) => serialize_members(members, serializer),
            Value::Nested(inner) => serialize_nested(inner, serializer),
            Value::Queue(queue) => queue.serialize(serializer),
        }
    }
}

impl<T: Serialize> Serialize for PriorityQueue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ordered = self.ordered();
        let mut seq = serializer.serialize_seq(Some(ordered.len()))?;
        for value in ordered {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

fn serialize_members<S: Serializer>(members: &MemberSet, serializer: S) -> Result<S::Ok, S::Error> {
    let mut sorted: Vec<&String> = members.iter().collect();
    sorted.sort();
    serializer.collect_seq(sorted)
}

// A `Value` may be serialized by a caller still holding its outer shard's
// lock, so inner maps are walked one shard at a time with no parallel work.
fn serialize_nested<T, S>(inner: &ShardMap<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize + Clone + Send + Sync,
    S: Serializer,
{
    let mut map = serializer.serialize_map(None)?;
    for (key, value) in inner.iter() {
        map.serialize_entry(&key, &value)?;
    }
    map.end()
}

impl Serialize for SetMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_map().serialize(serializer)
    }
}

impl<T> Serialize for NestedMap<T>
where
    T: Serialize + Clone + Send + Sync,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_map().serialize(serializer)
    }
}

impl<T> Serialize for QueueMap<T>
where
    T: Serialize + Clone + Send + Sync,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_map().serialize(serializer)
    }
}
