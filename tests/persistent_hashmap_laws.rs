//! Property-based tests for PersistentHashMap laws.
//!
//! Every operation sequence is replayed against `std::collections::HashMap`
//! as a model.

use std::collections::HashMap;

use proptest::prelude::*;
use trieste::persistent::PersistentHashMap;

#[derive(Clone, Debug)]
enum Operation {
    Insert(u16, i32),
    Remove(u16),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (any::<u16>(), any::<i32>()).prop_map(|(key, value)| Operation::Insert(key, value)),
        1 => any::<u16>().prop_map(Operation::Remove),
    ]
}

proptest! {
    /// The map agrees with the model after any sequence of inserts and removes
    #[test]
    fn prop_agrees_with_model(operations in prop::collection::vec(operation(), 0..400)) {
        let mut model = HashMap::new();
        let mut map = PersistentHashMap::new();

        for operation in operations {
            match operation {
                Operation::Insert(key, value) => {
                    model.insert(key, value);
                    map = map.insert(key, value);
                }
                Operation::Remove(key) => {
                    model.remove(&key);
                    map = map.remove(&key);
                }
            }
        }

        prop_assert_eq!(map.len(), model.len());
        for (key, value) in &model {
            prop_assert_eq!(map.get(key), Some(value));
        }
        prop_assert_eq!(map.iter().count(), model.len());
    }

    /// Get-Insert Law: a freshly inserted key maps to its value
    #[test]
    fn prop_get_insert_law(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..100),
        key: i32,
        value: i32
    ) {
        let map: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let inserted = map.insert(key, value);
        prop_assert_eq!(inserted.get(&key), Some(&value));
    }

    /// Insert-Remove Law: removing a just-inserted absent key restores the map
    #[test]
    fn prop_insert_remove_law(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..100),
        key: i32,
        value: i32
    ) {
        let map: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let without_key = map.remove(&key);
        prop_assert_eq!(without_key.insert(key, value).remove(&key), without_key);
    }

    /// Idempotent insert: inserting the same pair twice equals inserting once
    #[test]
    fn prop_insert_idempotent(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..100),
        key: i32,
        value: i32
    ) {
        let map: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let once = map.insert(key, value);
        prop_assert_eq!(once.insert(key, value), once);
    }

    /// Count invariant: n distinct inserts then m removes leave n - m entries
    #[test]
    fn prop_count_invariant(
        keys in prop::collection::hash_set(any::<i64>(), 0..300),
        removed in 0_usize..300
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let map: PersistentHashMap<i64, ()> = keys.iter().map(|key| (*key, ())).collect();
        prop_assert_eq!(map.len(), keys.len());

        let removed = removed.min(keys.len());
        let map = keys[..removed].iter().fold(map, |map, key| map.remove(key));
        prop_assert_eq!(map.len(), keys.len() - removed);
    }

    /// Structural sharing: updates never change the source map
    #[test]
    fn prop_updates_preserve_source(
        entries in prop::collection::vec((any::<u8>(), any::<i32>()), 1..100),
        value: i32
    ) {
        let map: PersistentHashMap<u8, i32> = entries.iter().copied().collect();
        let snapshot: HashMap<u8, i32> = map.iter().map(|(key, value)| (*key, *value)).collect();

        let (first_key, _) = entries[0];
        let _inserted = map.insert(first_key, value);
        let _removed = map.remove(&first_key);

        prop_assert_eq!(map.len(), snapshot.len());
        for (key, value) in &snapshot {
            prop_assert_eq!(map.get(key), Some(value));
        }
    }
}
