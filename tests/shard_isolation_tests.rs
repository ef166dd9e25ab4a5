use shardnest::ShardMapBuilder;
use std::sync::Arc;
use std::thread;

#[test]
fn test_shard_isolation() {
    let map = ShardMapBuilder::new()
        .shard_count(4)
        .unwrap()
        .build::<i32>()
        .unwrap();

    for i in 0..100 {
        map.set(format!("key_{}", i), i);
    }

    let stats = map.stats();
    assert_eq!(stats.shard_sizes.len(), 4);
    assert_eq!(stats.shard_sizes.iter().sum::<usize>(), 100);

    // Every key sits in the shard its hash picks, and only there.
    for i in 0..100 {
        let key = format!("key_{}", i);
        let handle = map.shard_for(&key);
        assert_eq!(handle.index(), map.shard_index(&key));
        let table = handle.read();
        assert!(table.owns(&key));
        assert!(table.contains_key(&key));
    }
}

#[test]
fn test_locked_shard_does_not_block_others() {
    let map = Arc::new(
        ShardMapBuilder::new()
            .shard_count(2)
            .unwrap()
            .build::<i32>()
            .unwrap(),
    );

    // Find a key in the other shard.
    let held = "key_0".to_string();
    let other = (1..)
        .map(|i| format!("key_{}", i))
        .find(|key| map.shard_index(key) != map.shard_index(&held))
        .unwrap();

    let _guard = map.lock(&held);
    let writer = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            map.set(other.clone(), 1);
            map.get(&other)
        })
    };
    assert_eq!(writer.join().unwrap(), Some(1));
}

#[test]
fn test_deterministic_shard_assignment() {
    let map1 = ShardMapBuilder::new()
        .shard_count(8)
        .unwrap()
        .build::<i32>()
        .unwrap();

    let map2 = ShardMapBuilder::new()
        .shard_count(8)
        .unwrap()
        .build::<i32>()
        .unwrap();

    // Insert same keys in both maps
    for i in 0..50 {
        let key = format!("key_{}", i);
        map1.set(key.clone(), i);
        map2.set(key, i);
    }

    // Get stats for both
    let stats1 = map1.stats();
    let stats2 = map2.stats();

    // Shard sizes should be identical (deterministic hashing)
    assert_eq!(stats1.shard_sizes, stats2.shard_sizes);
}

#[test]
fn test_shard_distribution() {
    let map = ShardMapBuilder::new()
        .shard_count(16)
        .unwrap()
        .build::<i32>()
        .unwrap();

    // Insert many keys
    for i in 0..1000 {
        map.set(format!("key_{}", i), i);
    }

    let stats = map.stats();

    // Verify distribution across shards (should be relatively even)
    let max_shard_size = *stats.shard_sizes.iter().max().unwrap();
    let min_shard_size = *stats.shard_sizes.iter().min().unwrap();

    // With 1000 keys and 16 shards, we expect ~62-63 keys per shard
    // Allow some variance, but not too extreme
    assert!(
        max_shard_size < 100,
        "Shard distribution too uneven (max: {})",
        max_shard_size
    );
    assert!(
        min_shard_size > 30,
        "Shard distribution too uneven (min: {})",
        min_shard_size
    );
}
