//! Unit tests for PersistentHashMap and TransientHashMap.

use std::hash::{Hash, Hasher};
use std::ops::ControlFlow;

use rstest::rstest;
use trieste::persistent::{PersistentHashMap, TransientHashMap};

/// A key whose hash ignores its identity, forcing every instance into the
/// same collision bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CollidingKey(u32);

impl Hash for CollidingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        0_u8.hash(state);
    }
}

// =============================================================================
// Construction and lookup
// =============================================================================

#[rstest]
fn test_new_creates_empty_map() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert_eq!(map.get("key"), None);
}

#[rstest]
fn test_singleton_creates_single_entry_map() {
    let map = PersistentHashMap::singleton("key".to_string(), 42);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("key"), Some(&42));
}

#[rstest]
fn test_from_entries_keeps_last_binding() {
    let map = PersistentHashMap::from_entries([("a", 1), ("b", 2), ("a", 3)]);
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&"a"), Some(&3));
}

#[rstest]
#[case("present", 1)]
#[case("absent", -1)]
fn test_get_or(#[case] key: &str, #[case] expected: i32) {
    let map = PersistentHashMap::singleton("present".to_string(), 1);
    assert_eq!(*map.get_or(key, &-1), expected);
}

// =============================================================================
// Insert, insert, remove
// =============================================================================

#[rstest]
fn test_insert_insert_remove() {
    let map = PersistentHashMap::new()
        .insert("a".to_string(), 1)
        .insert("b".to_string(), 2)
        .remove("a");

    assert_eq!(map.len(), 1);
    assert_eq!(map.get_or("a", &-1), &-1);
    assert_eq!(map.get_or("b", &-1), &2);
}

#[rstest]
fn test_insert_does_not_mutate_source() {
    let original: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    let updated = original.insert(50, -50).remove(&10);

    assert_eq!(original.get(&50), Some(&50));
    assert_eq!(original.get(&10), Some(&10));
    assert_eq!(original.len(), 100);
    assert_eq!(updated.get(&50), Some(&-50));
    assert_eq!(updated.get(&10), None);
    assert_eq!(updated.len(), 99);
}

#[rstest]
fn test_remove_everything_empties_map() {
    let keys: Vec<i32> = (0..1000).collect();
    let map: PersistentHashMap<i32, i32> = keys.iter().map(|key| (*key, *key)).collect();
    let emptied = keys.iter().fold(map, |map, key| map.remove(key));
    assert!(emptied.is_empty());
    assert_eq!(emptied.iter().count(), 0);
}

// =============================================================================
// Forced hash collisions
// =============================================================================

#[rstest]
fn test_colliding_keys_are_all_retrievable() {
    let map = PersistentHashMap::new()
        .insert(CollidingKey(1), "one")
        .insert(CollidingKey(2), "two")
        .insert(CollidingKey(3), "three");

    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&CollidingKey(1)), Some(&"one"));
    assert_eq!(map.get(&CollidingKey(2)), Some(&"two"));
    assert_eq!(map.get(&CollidingKey(3)), Some(&"three"));

    let fewer = map.remove(&CollidingKey(2));
    assert_eq!(fewer.len(), 2);
    assert_eq!(fewer.get(&CollidingKey(2)), None);
    assert_eq!(fewer.get(&CollidingKey(3)), Some(&"three"));

    let single = fewer.remove(&CollidingKey(1));
    assert_eq!(single.len(), 1);
    assert_eq!(single.get(&CollidingKey(3)), Some(&"three"));
}

#[rstest]
fn test_colliding_keys_through_transient() {
    let mut transient = TransientHashMap::new();
    for id in 0..20 {
        transient.insert(CollidingKey(id), id);
    }
    assert_eq!(transient.remove(&CollidingKey(7)), Some(7));
    let map = transient.persistent();

    assert_eq!(map.len(), 19);
    assert!((0..20).filter(|id| *id != 7).all(|id| map.get(&CollidingKey(id)) == Some(&id)));
}

// =============================================================================
// Nil entry
// =============================================================================

#[rstest]
fn test_nil_entry_is_counted_and_listed_first() {
    let map = PersistentHashMap::new()
        .insert("a".to_string(), 1)
        .insert_nil(0);

    assert_eq!(map.len(), 2);
    assert!(map.contains_nil());
    assert_eq!(map.get_nil(), Some(&0));
    assert_eq!(map.entries().next(), Some((None, &0)));
    assert_eq!(map.iter().count(), 1);

    let without = map.remove_nil();
    assert_eq!(without.len(), 1);
    assert!(!without.contains_nil());
    assert!(map.contains_nil());
}

// =============================================================================
// Folding, updating, merging
// =============================================================================

#[rstest]
fn test_kv_reduce_stops_early() {
    let map: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, 1)).collect();
    let visited = map.kv_reduce(0, |count, _, _| {
        if count == 10 {
            ControlFlow::Break(count)
        } else {
            ControlFlow::Continue(count + 1)
        }
    });
    assert_eq!(visited, 10);
}

#[rstest]
fn test_update_with_can_insert_change_and_remove() {
    let map = PersistentHashMap::singleton("count".to_string(), 1);

    let incremented = map.update_with("count", |value| value.map(|value| value + 1));
    assert_eq!(incremented.get("count"), Some(&2));

    let removed = map.update_with("count", |_| None);
    assert!(removed.is_empty());
}

#[rstest]
fn test_merge_prefers_right_side() {
    let left: PersistentHashMap<i32, &str> = [(1, "left"), (2, "left")].into_iter().collect();
    let right: PersistentHashMap<i32, &str> = [(2, "right"), (3, "right")].into_iter().collect();
    let merged = left.merge(&right);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get(&1), Some(&"left"));
    assert_eq!(merged.get(&2), Some(&"right"));
    assert_eq!(merged.get(&3), Some(&"right"));
}

#[rstest]
fn test_equality_ignores_insertion_order() {
    let forward: PersistentHashMap<i32, i32> = (0..200).map(|key| (key, key)).collect();
    let backward: PersistentHashMap<i32, i32> = (0..200).rev().map(|key| (key, key)).collect();
    assert_eq!(forward, backward);
    assert_ne!(forward, backward.insert(0, 1));
}

// =============================================================================
// Transients
// =============================================================================

#[rstest]
fn test_transient_insert_and_remove_report_previous_values() {
    let mut transient = TransientHashMap::new();
    assert_eq!(transient.insert("a", 1), None);
    assert_eq!(transient.insert("a", 2), Some(1));
    assert_eq!(transient.remove(&"a"), Some(2));
    assert_eq!(transient.remove(&"a"), None);
    assert!(transient.is_empty());
}

#[rstest]
fn test_transient_does_not_disturb_source() {
    let source: PersistentHashMap<i32, i32> = (0..500).map(|key| (key, key)).collect();
    let mut transient = source.transient();
    for key in 0..250 {
        transient.remove(&key);
    }
    transient.insert(1000, 1000);
    let edited = transient.persistent();

    assert_eq!(source.len(), 500);
    assert!((0..500).all(|key| source.get(&key) == Some(&key)));
    assert_eq!(edited.len(), 251);
    assert_eq!(edited.get(&0), None);
    assert_eq!(edited.get(&1000), Some(&1000));
}

#[rstest]
#[should_panic(expected = "transient used after it was sealed")]
fn test_transient_rejects_use_after_seal() {
    let mut transient: TransientHashMap<i32, i32> = TransientHashMap::new();
    let _map = transient.seal();
    transient.insert(1, 1);
}
