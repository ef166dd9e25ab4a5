//! Load tests: concurrent churn across every layer, then verify that all keys
//! were vacuumed and introspection agrees.

use shardnest::{NestedMap, SetMap, ShardMap};
use std::sync::Arc;
use std::thread;

#[test]
fn test_under_load_then_introspect() {
    let map = Arc::new(ShardMap::new());
    let mut handles = vec![];

    for t in 0..4 {
        let map = Arc::clone(&map);
        let handle = thread::spawn(move || {
            for i in 0..2000 {
                let key = format!("t{}_k{}", t, i);
                map.set(key, i);
            }
            for i in 0..2000 {
                let key = format!("t{}_k{}", t, i);
                let _ = map.remove(&key);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    let loads = map.shard_loads();
    assert_eq!(loads.iter().sum::<usize>(), 0);
}

#[test]
fn test_layer_churn_vacuums_everything() {
    let counters: Arc<ShardMap<()>> = Arc::new(ShardMap::new());
    let sets = Arc::new(SetMap::new());
    let nested: Arc<NestedMap<u32>> = Arc::new(NestedMap::new());
    let mut handles = vec![];

    for t in 0..4 {
        let counters = Arc::clone(&counters);
        let sets = Arc::clone(&sets);
        let nested = Arc::clone(&nested);
        handles.push(thread::spawn(move || {
            for i in 0..500 {
                let key = format!("k{}", i % 50);
                let member = format!("t{}_{}", t, i);
                counters.increment(&key);
                sets.add_member(&key, member.clone());
                nested.set_inner(&key, member, i);
            }
            for i in 0..500 {
                let key = format!("k{}", i % 50);
                let member = format!("t{}_{}", t, i);
                counters.decrement_or_delete(&key);
                assert!(sets.remove_member(&key, &member));
                assert!(nested.delete_inner(&key, &member));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(counters.is_empty());
    assert!(sets.is_empty());
    assert!(nested.is_empty());
    assert!(counters.shard_loads().iter().all(|&load| load == 0));
}
