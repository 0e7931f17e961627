//! Persistent (immutable) hash set.
//!
//! [`PersistentHashSet`] is a thin wrapper over `PersistentHashMap<T, ()>`:
//! `insert` and `remove` are the map's insert and remove with a unit value.
//! [`TransientHashSet`] wraps a [`TransientHashMap`] the same way.
//!
//! # Examples
//!
//! ```rust
//! use trieste::persistent::PersistentHashSet;
//!
//! let set = PersistentHashSet::new()
//!     .insert(1)
//!     .insert(2)
//!     .insert(3);
//!
//! assert!(set.contains(&1));
//! assert!(!set.contains(&4));
//!
//! let updated = set.insert(4);
//! assert_eq!(set.len(), 3);      // Original unchanged
//! assert_eq!(updated.len(), 4);  // New version
//! ```
//!
//! # Set Operations
//!
//! ```rust
//! use trieste::persistent::PersistentHashSet;
//!
//! let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
//! let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
//!
//! assert_eq!(set_a.union(&set_b).len(), 4);
//! assert_eq!(set_a.intersection(&set_b).len(), 2);
//! assert_eq!(set_a.difference(&set_b).len(), 1);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;

use super::hashmap::{PersistentHashMapIntoIterator, PersistentHashMapIterator};
use super::{PersistentHashMap, TransientHashMap};

// =============================================================================
// PersistentHashSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on HAMT.
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::PersistentHashSet;
///
/// let set = PersistentHashSet::singleton(42);
/// assert!(set.contains(&42));
/// ```
#[derive(Clone)]
pub struct PersistentHashSet<T> {
    inner: PersistentHashMap<T, ()>,
}

impl<T> PersistentHashSet<T> {
    /// Creates a new empty set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: PersistentHashMap::new(),
        }
    }

    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the elements of the set.
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T: Hash + Eq> PersistentHashSet<T> {
    /// Returns `true` if the set contains the element.
    ///
    /// The element may be any borrowed form of the set's element type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::new().insert("hello".to_string());
    /// assert!(set.contains("hello"));
    /// assert!(!set.contains("world"));
    /// ```
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Returns the stored element equal to `element`.
    #[must_use]
    pub fn get<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get_key_value(element).map(|(stored, ())| stored)
    }

    /// Returns `true` if every element of `self` is also in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashSet;
    ///
    /// let subset: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let superset: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    ///
    /// assert!(subset.is_subset(&superset));
    /// assert!(!superset.is_subset(&subset));
    /// ```
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|element| other.contains(element))
    }

    /// Returns `true` if every element of `other` is also in `self`.
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns `true` if the two sets share no element.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        !smaller.iter().any(|element| larger.contains(element))
    }
}

impl<T: Clone + Hash + Eq> PersistentHashSet<T> {
    /// Creates a set containing a single element.
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::new().insert(element)
    }

    /// Adds an element (conj).
    ///
    /// Adding an element already present returns a set sharing `self`'s root.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Removes an element (disj).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::new().insert(1).insert(2);
    /// let removed = set.remove(&1);
    ///
    /// assert!(!removed.contains(&1));
    /// assert!(set.contains(&1));
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }

    /// Returns the union of two sets.
    ///
    /// # Complexity
    ///
    /// O(m * log32 (n + m)) where m is the size of the smaller set
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut transient = larger.transient();
        transient.extend(smaller.iter().cloned());
        transient.persistent()
    }

    /// Returns the elements present in both sets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let intersection = set_a.intersection(&set_b);
    /// assert_eq!(intersection.len(), 2);
    /// assert!(intersection.contains(&2));
    /// assert!(intersection.contains(&3));
    /// ```
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        smaller
            .iter()
            .filter(|element| larger.contains(*element))
            .cloned()
            .collect()
    }

    /// Returns the elements of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        if other.len() < self.len() {
            let mut transient = self.transient();
            for element in other {
                transient.remove(element);
            }
            return transient.persistent();
        }
        self.iter()
            .filter(|element| !other.contains(*element))
            .cloned()
            .collect()
    }

    /// Returns the elements in exactly one of the two sets.
    #[must_use]
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.difference(other).union(&other.difference(self))
    }

    /// Opens a transient session over this set.
    #[must_use]
    pub fn transient(&self) -> TransientHashSet<T> {
        TransientHashSet {
            inner: self.inner.transient(),
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIterator<'a, T> {
    inner: PersistentHashMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentHashSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIterator<'_, T> {}

/// An owning iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIntoIterator<T> {
    inner: PersistentHashMapIntoIterator<T, ()>,
}

impl<T> Iterator for PersistentHashSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentHashSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for PersistentHashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = TransientHashSet::new();
        transient.extend(iter);
        transient.persistent()
    }
}

impl<T: Clone> IntoIterator for PersistentHashSet<T> {
    type Item = T;
    type IntoIter = PersistentHashSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentHashSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentHashSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Hash + Eq> PartialEq for PersistentHashSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Hash + Eq> Eq for PersistentHashSet<T> {}

impl<T: fmt::Debug> fmt::Debug for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientHashSet Definition
// =============================================================================

/// A transient (temporarily mutable) hash set for efficient batch updates.
///
/// Wraps a [`TransientHashMap<T, ()>`](TransientHashMap) and follows the same
/// ownership rules: nodes are copied on first touch, edited in place
/// afterwards, and handed over without copying by
/// [`persistent()`](Self::persistent).
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::PersistentHashSet;
///
/// let persistent: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
///
/// let mut transient = persistent.transient();
/// transient.insert(4);
/// transient.remove(&1);
/// let updated = transient.persistent();
///
/// assert_eq!(updated.len(), 3);
/// assert!(!updated.contains(&1));
/// assert!(persistent.contains(&1));
/// ```
pub struct TransientHashSet<T> {
    inner: TransientHashMap<T, ()>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientHashSet<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientHashSet<String>: Send, Sync);

impl<T> TransientHashSet<T> {
    /// Creates a new empty transient set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: TransientHashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` once the transient has been sealed.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.inner.is_sealed()
    }

    /// Retires the edit token and returns the finished persistent set.
    ///
    /// # Panics
    ///
    /// Panics if the transient has already been sealed.
    pub fn seal(&mut self) -> PersistentHashSet<T> {
        PersistentHashSet {
            inner: self.inner.seal(),
        }
    }

    /// Converts the transient into a persistent set.
    ///
    /// # Panics
    ///
    /// Panics if the transient has already been sealed.
    #[must_use]
    pub fn persistent(mut self) -> PersistentHashSet<T> {
        self.seal()
    }
}

impl<T: Hash + Eq> TransientHashSet<T> {
    /// Returns `true` if the set contains the element.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }
}

impl<T: Clone + Hash + Eq> TransientHashSet<T> {
    /// Adds an element (conj!).
    ///
    /// Returns `true` if the element was not present.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::TransientHashSet;
    ///
    /// let mut transient: TransientHashSet<i32> = TransientHashSet::new();
    /// assert!(transient.insert(1));
    /// assert!(!transient.insert(1));
    /// assert_eq!(transient.len(), 1);
    /// ```
    pub fn insert(&mut self, element: T) -> bool {
        self.inner.insert(element, ()).is_none()
    }

    /// Removes an element (disj!).
    ///
    /// Returns `true` if the element was present.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.remove(element).is_some()
    }
}

impl<T> Default for TransientHashSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> Extend<T> for TransientHashSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.insert(element);
        }
    }
}

impl<T> fmt::Debug for TransientHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientHashSet")
            .field("inner", &self.inner)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
