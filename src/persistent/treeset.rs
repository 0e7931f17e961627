//! Persistent (immutable) sorted set.
//!
//! [`PersistentTreeSet`] is a [`PersistentTreeMap`] whose values are `()`.
//!
//! # Examples
//!
//! ```rust
//! use trieste::persistent::PersistentTreeSet;
//!
//! let set: PersistentTreeSet<i32> = [5, 3, 8, 1].into_iter().collect();
//! assert_eq!(set.first(), Some(&1));
//! assert_eq!(set.last(), Some(&8));
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 8]);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::iter::FromIterator;
use std::ops::RangeBounds;

use super::treemap::{Comparator, NaturalOrder, PersistentTreeMap, PersistentTreeMapIterator};

/// A persistent (immutable) set ordered by a [`Comparator`].
pub struct PersistentTreeSet<T, C = NaturalOrder> {
    inner: PersistentTreeMap<T, (), C>,
}

impl<T> PersistentTreeSet<T> {
    /// Creates a new empty set ordered by the elements' [`Ord`].
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: PersistentTreeMap::new(),
        }
    }
}

impl<T, C> PersistentTreeSet<T, C> {
    /// Creates a new empty set ordered by `comparator`.
    #[inline]
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            inner: PersistentTreeMap::with_comparator(comparator),
        }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the smallest element.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.inner.min().map(|(element, ())| element)
    }

    /// Returns the largest element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.inner.max().map(|(element, ())| element)
    }

    /// Returns an iterator over the elements in ascending order.
    #[must_use]
    pub fn iter(&self) -> PersistentTreeSetIterator<'_, T> {
        PersistentTreeSetIterator {
            inner: self.inner.iter(),
        }
    }

    /// Returns an iterator over the elements in descending order.
    #[must_use]
    pub fn iter_rev(&self) -> PersistentTreeSetIterator<'_, T> {
        PersistentTreeSetIterator {
            inner: self.inner.iter_rev(),
        }
    }

    /// Returns `true` if the set contains `element`.
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.inner.contains_key(element)
    }
}

impl<T: Clone, C: Clone> PersistentTreeSet<T, C> {
    /// Adds an element (conj). Adding a present element shares the tree.
    #[must_use]
    pub fn insert(&self, element: T) -> Self
    where
        C: Comparator<T>,
    {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Removes an element (disj).
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }
}

impl<T: Clone, C: Comparator<T>> PersistentTreeSet<T, C> {
    /// Returns a lazy ascending iterator over the elements within `range`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentTreeSet;
    ///
    /// let set: PersistentTreeSet<i32> = (0..10).collect();
    /// assert_eq!(set.range(3..6).copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    /// ```
    pub fn range<R: RangeBounds<T>>(&self, range: R) -> impl Iterator<Item = &T> {
        self.inner.range(range).map(|(element, ())| element)
    }

    /// Returns a lazy descending iterator over the elements within `range`.
    pub fn range_rev<R: RangeBounds<T>>(&self, range: R) -> impl Iterator<Item = &T> {
        self.inner.range_rev(range).map(|(element, ())| element)
    }
}

/// An iterator over the elements of a [`PersistentTreeSet`].
pub struct PersistentTreeSetIterator<'a, T> {
    inner: PersistentTreeMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentTreeSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentTreeSetIterator<'_, T> {}

impl<T, C: Clone> Clone for PersistentTreeSet<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, C: Default> Default for PersistentTreeSet<T, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T: Clone + Ord> FromIterator<T> for PersistentTreeSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |set, element| set.insert(element))
    }
}

impl<'a, T, C> IntoIterator for &'a PersistentTreeSet<T, C> {
    type Item = &'a T;
    type IntoIter = PersistentTreeSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone, C> IntoIterator for PersistentTreeSet<T, C> {
    type Item = T;
    type IntoIter = std::iter::Map<super::PersistentTreeMapIntoIterator<T, ()>, fn((T, ())) -> T>;

    fn into_iter(self) -> Self::IntoIter {
        let element: fn((T, ())) -> T = |(element, ())| element;
        self.inner.into_iter().map(element)
    }
}

impl<T, C: Comparator<T>> PartialEq for PersistentTreeSet<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T, C: Comparator<T>> Eq for PersistentTreeSet<T, C> {}

impl<T: fmt::Debug, C> fmt::Debug for PersistentTreeSet<T, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}
