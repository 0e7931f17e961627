//! Property-based tests for PersistentHashSet laws.

use std::collections::HashSet;

use proptest::prelude::*;
use trieste::persistent::PersistentHashSet;

fn to_model(set: &PersistentHashSet<i16>) -> HashSet<i16> {
    set.iter().copied().collect()
}

proptest! {
    /// Set algebra matches `std::collections::HashSet`
    #[test]
    fn prop_set_algebra_matches_model(
        left in prop::collection::hash_set(any::<i16>(), 0..200),
        right in prop::collection::hash_set(any::<i16>(), 0..200)
    ) {
        let left_set: PersistentHashSet<i16> = left.iter().copied().collect();
        let right_set: PersistentHashSet<i16> = right.iter().copied().collect();

        prop_assert_eq!(to_model(&left_set.union(&right_set)), &left | &right);
        prop_assert_eq!(to_model(&left_set.intersection(&right_set)), &left & &right);
        prop_assert_eq!(to_model(&left_set.difference(&right_set)), &left - &right);
        prop_assert_eq!(to_model(&left_set.symmetric_difference(&right_set)), &left ^ &right);
        prop_assert_eq!(left_set.is_subset(&right_set), left.is_subset(&right));
    }

    /// Union is commutative
    #[test]
    fn prop_union_commutative(
        left in prop::collection::vec(any::<i16>(), 0..100),
        right in prop::collection::vec(any::<i16>(), 0..100)
    ) {
        let left: PersistentHashSet<i16> = left.into_iter().collect();
        let right: PersistentHashSet<i16> = right.into_iter().collect();
        prop_assert_eq!(left.union(&right), right.union(&left));
    }

    /// Insert is idempotent
    #[test]
    fn prop_insert_idempotent(
        elements in prop::collection::vec(any::<i16>(), 0..100),
        element: i16
    ) {
        let set: PersistentHashSet<i16> = elements.into_iter().collect();
        let once = set.insert(element);
        prop_assert_eq!(once.insert(element), once.clone());
        prop_assert!(once.contains(&element));
    }

    /// Transient round trip returns an equal set
    #[test]
    fn prop_transient_round_trip(elements in prop::collection::vec(any::<i16>(), 0..300)) {
        let set: PersistentHashSet<i16> = elements.into_iter().collect();
        prop_assert_eq!(set.transient().persistent(), set);
    }
}
