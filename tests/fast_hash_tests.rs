//! Hash maps and sets behave identically under every hasher feature.
//!
//! Run with `--features fxhash` or `--features ahash` to exercise the fast
//! hashers; the default build uses the standard library hasher.

use rstest::rstest;
use trieste::persistent::{PersistentHashMap, PersistentHashSet, TransientHashMap};

#[rstest]
#[case::empty("")]
#[case::nul("\0")]
#[case::whitespace(" \t\n")]
#[case::repeated("aaaa")]
#[case::non_ascii("こんにちは")]
fn test_string_keys_round_trip(#[case] key: &str) {
    let map = PersistentHashMap::new()
        .insert("a".to_string(), 0)
        .insert(key.to_string(), 42);
    assert_eq!(map.get(key), Some(&42));
    assert_eq!(map.remove(key).get(key), None);
}

#[rstest]
fn test_equal_maps_built_in_different_orders() {
    let forward: PersistentHashMap<String, usize> =
        (0..500).map(|index| (format!("key_{index}"), index)).collect();
    let backward: PersistentHashMap<String, usize> = (0..500)
        .rev()
        .map(|index| (format!("key_{index}"), index))
        .collect();
    assert_eq!(forward, backward);
}

#[rstest]
#[case(i64::MIN)]
#[case(-1)]
#[case(0)]
#[case(i64::MAX)]
fn test_boundary_integer_keys(#[case] key: i64) {
    let map: PersistentHashMap<i64, i64> = (-100..100).map(|other| (other, other)).collect();
    let map = map.insert(key, 7);
    assert_eq!(map.get(&key), Some(&7));
}

#[rstest]
fn test_large_scale_insert_and_retrieve() {
    const COUNT: i32 = 20_000;

    let mut transient = TransientHashMap::new();
    for key in 0..COUNT {
        transient.insert(key, key * 2);
    }
    let map = transient.persistent();

    assert_eq!(map.len(), COUNT as usize);
    assert!((0..COUNT).all(|key| map.get(&key) == Some(&(key * 2))));
    assert!((COUNT..COUNT + 100).all(|key| map.get(&key).is_none()));
}

#[rstest]
fn test_large_scale_removal_to_empty() {
    let map: PersistentHashMap<u64, u64> = (0..5_000).map(|key| (key, key)).collect();
    let emptied = (0..5_000).fold(map, |map, key| map.remove(&key));
    assert!(emptied.is_empty());
    assert_eq!(emptied.iter().count(), 0);
}

#[rstest]
fn test_hashset_borrowed_lookup() {
    let set: PersistentHashSet<String> =
        ["alpha", "beta", "gamma"].into_iter().map(String::from).collect();
    assert!(set.contains("beta"));
    assert!(!set.contains("delta"));
    assert_eq!(set.remove("beta").len(), 2);
}
