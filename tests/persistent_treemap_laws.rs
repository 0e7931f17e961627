//! Property-based tests for PersistentTreeMap laws.
//!
//! Operation sequences are replayed against `BTreeMap` as a model.

use std::collections::BTreeMap;
use std::ops::Bound;

use proptest::prelude::*;
use trieste::persistent::PersistentTreeMap;

#[derive(Clone, Debug)]
enum Operation {
    Insert(i16, i32),
    Remove(i16),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (any::<i16>(), any::<i32>()).prop_map(|(key, value)| Operation::Insert(key, value)),
        2 => any::<i16>().prop_map(Operation::Remove),
    ]
}

fn bound() -> impl Strategy<Value = Bound<i16>> {
    prop_oneof![
        any::<i16>().prop_map(Bound::Included),
        any::<i16>().prop_map(Bound::Excluded),
        Just(Bound::Unbounded),
    ]
}

proptest! {
    /// The map agrees with `BTreeMap`, including iteration order
    #[test]
    fn prop_agrees_with_model(operations in prop::collection::vec(operation(), 0..500)) {
        let mut model = BTreeMap::new();
        let mut map = PersistentTreeMap::new();

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
        prop_assert!(map.iter().eq(model.iter()));
        prop_assert!(map.iter_rev().eq(model.iter().rev()));
        prop_assert_eq!(map.min(), model.first_key_value());
        prop_assert_eq!(map.max(), model.last_key_value());
    }

    /// Range scans agree with `BTreeMap::range` in both directions
    #[test]
    fn prop_range_agrees_with_model(
        keys in prop::collection::btree_set(any::<i16>(), 0..300),
        start in bound(),
        end in bound()
    ) {
        let model: BTreeMap<i16, ()> = keys.iter().map(|key| (*key, ())).collect();
        let map: PersistentTreeMap<i16, ()> = keys.iter().map(|key| (*key, ())).collect();

        let empty_range = match (start, end) {
            (Bound::Included(low) | Bound::Excluded(low), Bound::Included(high) | Bound::Excluded(high)) => {
                low > high
                    || (low == high
                        && (matches!(start, Bound::Excluded(_)) || matches!(end, Bound::Excluded(_))))
            }
            _ => false,
        };

        let expected: Vec<i16> = if empty_range {
            Vec::new()
        } else {
            model.range((start, end)).map(|(key, _)| *key).collect()
        };

        let ascending: Vec<i16> = map.range((start, end)).map(|(key, _)| *key).collect();
        let descending: Vec<i16> = map.range_rev((start, end)).map(|(key, _)| *key).collect();

        prop_assert_eq!(&ascending, &expected);
        prop_assert_eq!(descending, expected.into_iter().rev().collect::<Vec<_>>());
    }

    /// Idempotent insert: inserting the same pair twice equals inserting once
    #[test]
    fn prop_insert_idempotent(
        entries in prop::collection::vec((any::<i16>(), any::<i32>()), 0..200),
        key: i16,
        value: i32
    ) {
        let map: PersistentTreeMap<i16, i32> = entries.into_iter().collect();
        let once = map.insert(key, value);
        prop_assert_eq!(once.insert(key, value), once);
    }

    /// Structural sharing: updates never change the source map
    #[test]
    fn prop_updates_preserve_source(
        entries in prop::collection::vec((any::<i16>(), any::<i32>()), 1..200),
        value: i32
    ) {
        let map: PersistentTreeMap<i16, i32> = entries.iter().copied().collect();
        let before: Vec<(i16, i32)> = map.iter().map(|(key, value)| (*key, *value)).collect();

        let (key, _) = entries[0];
        let _replaced = map.insert(key, value);
        let _removed = map.remove(&key);

        let after: Vec<(i16, i32)> = map.iter().map(|(key, value)| (*key, *value)).collect();
        prop_assert_eq!(before, after);
    }
}
