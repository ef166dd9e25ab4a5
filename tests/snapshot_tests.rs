use rayon::prelude::*;
use shardnest::{ShardMap, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_len_bounded_during_bulk_insert() {
    const BEFORE: usize = 1000;
    const ADDED: usize = 5000;

    let map = Arc::new(ShardMap::new());
    for i in 0..BEFORE {
        map.set(format!("before_{}", i), i);
    }

    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let map = Arc::clone(&map);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last = BEFORE;
            while !done.load(Ordering::Acquire) {
                let len = map.len();
                assert!((BEFORE..=BEFORE + ADDED).contains(&len));
                // Only inserts are running, so the count never goes backwards.
                assert!(len >= last);
                last = len;

                let snapshot = map.iter_buffered().len();
                assert!((BEFORE..=BEFORE + ADDED).contains(&snapshot));
            }
        })
    };

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in (t..ADDED).step_by(4) {
                    map.set(format!("added_{}", i), i);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    observer.join().unwrap();

    assert_eq!(map.len(), BEFORE + ADDED);
}

#[test]
fn test_iteration_modes_agree() {
    let map: ShardMap<u32> = ShardMap::new();
    for i in 0..300 {
        map.set(format!("plain_{}", i), i);
        map.increment(&format!("count_{}", i % 7));
    }
    map.lock("set").add_members("set", ["a", "b"]);

    let mut buffered: Vec<String> = map.iter_buffered().map(|(k, _)| k).collect();
    let mut lazy: Vec<String> = map.iter().map(|(k, _)| k).collect();
    let mut streamed: Vec<String> = map.par_iter().map(|(k, _)| k).collect();
    buffered.sort();
    lazy.sort();
    streamed.sort();

    assert_eq!(buffered.len(), 300 + 7 + 1);
    assert_eq!(buffered, lazy);
    assert_eq!(buffered, streamed);

    let counters: u64 = map
        .iter_buffered()
        .filter_map(|(_, value)| value.as_counter())
        .sum();
    assert_eq!(counters, 300);
}

#[test]
fn test_snapshot_is_a_copy() {
    let map = ShardMap::new();
    map.set("a", 1);

    let items = map.items();
    map.set("a", 2);
    map.set("b", 3);

    assert_eq!(items.len(), 1);
    assert!(matches!(items.get("a"), Some(Value::Plain(1))));
}

#[test]
fn test_lazy_iter_holds_no_lock_between_items() {
    let map = ShardMap::new();
    for i in 0..64 {
        map.set(format!("key_{}", i), i);
    }

    let mut iter = map.iter();
    assert!(iter.next().is_some());

    // Between calls the iterator holds no shard lock, so this thread can still
    // write to and lock every key. Debug builds would panic otherwise.
    for i in 0..64 {
        let key = format!("key_{}", i);
        map.set(key.as_str(), i + 100);
        drop(map.lock(&key));
    }
    assert_eq!(map.len(), 64);
    assert!(iter.count() < 64);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "re-entrant")]
fn test_buffered_snapshot_while_holding_shard_panics() {
    let map = ShardMap::new();
    map.set("k", 1);
    let _guard = map.lock("k");
    let _ = map.iter_buffered().len();
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "re-entrant")]
fn test_streamed_iter_while_holding_shard_panics() {
    let map = ShardMap::new();
    map.set("k", 1);
    let _guard = map.read("k");
    let _ = map.par_iter().count();
}
