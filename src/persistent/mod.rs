//! Persistent (immutable) collections and their transient builders.
//!
//! - [`PersistentHashMap`] / [`PersistentHashSet`]: hash array mapped trie
//! - [`PersistentVector`]: 32-way bit-partitioned trie with a tail buffer
//! - [`Subvector`]: a `[start, end)` window over a vector, sharing its storage
//! - [`PersistentTreeMap`] / [`PersistentTreeSet`]: red-black tree ordered by a
//!   [`Comparator`]
//!
//! # Structural Sharing
//!
//! Every update returns a new value that copies only the nodes on the path to
//! the change; every other node is shared by reference with the original.
//!
//! # Transients
//!
//! Hash maps, hash sets and vectors can be turned into a transient with
//! `transient()`. A transient edits nodes it owns in place and copies a
//! shared node once, on first touch. `persistent()` seals it back into an
//! immutable value without copying.
//!
//! ```rust
//! use trieste::persistent::PersistentVector;
//!
//! let mut transient = PersistentVector::new().transient();
//! for index in 0..1000 {
//!     transient.push_back(index);
//! }
//! let vector = transient.persistent();
//!
//! assert_eq!(vector.len(), 1000);
//! assert_eq!(vector.nth(999), Ok(&999));
//! ```
//!
//! # Examples
//!
//! ```rust
//! use trieste::persistent::{PersistentHashMap, PersistentTreeMap};
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(updated.get("one"), Some(&100));
//!
//! let sorted: PersistentTreeMap<i32, &str> =
//!     [(3, "three"), (1, "one"), (2, "two")].into_iter().collect();
//! let keys: Vec<&i32> = sorted.keys().collect();
//! assert_eq!(keys, vec![&1, &2, &3]);
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod edit;
mod hamt;
mod hash;
mod hashmap;
mod hashset;
#[cfg(feature = "serde")]
mod serde;
mod subvector;
mod treemap;
mod treeset;
mod vector;

pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIntoIterator;
pub use hashmap::PersistentHashMapIterator;
pub use hashmap::TransientHashMap;
pub use hashset::PersistentHashSet;
pub use hashset::PersistentHashSetIntoIterator;
pub use hashset::PersistentHashSetIterator;
pub use hashset::TransientHashSet;
pub use subvector::Subvector;
pub use subvector::SubvectorIterator;
pub use treemap::Comparator;
pub use treemap::FnComparator;
pub use treemap::NaturalOrder;
pub use treemap::PersistentTreeMap;
pub use treemap::PersistentTreeMapIntoIterator;
pub use treemap::PersistentTreeMapIterator;
pub use treemap::PersistentTreeMapRangeIterator;
pub use treeset::PersistentTreeSet;
pub use treeset::PersistentTreeSetIterator;
pub use vector::PersistentVector;
pub use vector::PersistentVectorChunks;
pub use vector::PersistentVectorIntoIterator;
pub use vector::PersistentVectorIterator;
pub use vector::TransientVector;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_make_mut_copies_only_when_shared() {
        let mut unique: ReferenceCounter<Vec<i32>> = ReferenceCounter::new(vec![1]);
        let address = ReferenceCounter::as_ptr(&unique);
        ReferenceCounter::make_mut(&mut unique).push(2);
        assert_eq!(ReferenceCounter::as_ptr(&unique), address);

        let shared = unique.clone();
        ReferenceCounter::make_mut(&mut unique).push(3);
        assert!(!ReferenceCounter::ptr_eq(&unique, &shared));
        assert_eq!(*shared, vec![1, 2]);
        assert_eq!(*unique, vec![1, 2, 3]);
    }

    #[rstest]
    fn test_reference_counter_strong_count() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
        let reference_counter_clone = reference_counter.clone();
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 2);
        drop(reference_counter_clone);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
    }
}
