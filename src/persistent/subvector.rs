//! Windowed views over a [`PersistentVector`].
//!
//! A [`Subvector`] is a `[start, end)` window onto a base vector. Creating one
//! is O(1) and shares all of the base's storage; indices are translated by
//! `start` and bounds-checked against `end`.
//!
//! # Examples
//!
//! ```rust
//! use trieste::persistent::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..100).collect();
//! let window = vector.subvec(10, 20).unwrap();
//! let narrower = window.subvec(2, 5).unwrap();
//!
//! assert_eq!(narrower.iter().copied().collect::<Vec<_>>(), vec![12, 13, 14]);
//! ```

use std::fmt;

use super::PersistentVector;
use crate::error::{CollectionError, Result};

/// A persistent `[start, end)` window over a [`PersistentVector`].
///
/// Subvectors of subvectors collapse onto the same base vector, so a view is
/// never more than one level deep.
#[derive(Clone)]
pub struct Subvector<T> {
    base: PersistentVector<T>,
    start: usize,
    end: usize,
}

impl<T> Subvector<T> {
    pub(crate) fn new(base: PersistentVector<T>, start: usize, end: usize) -> Result<Self> {
        if end > base.len() {
            return Err(CollectionError::index_out_of_bounds(end, base.len()));
        }
        if start > end {
            return Err(CollectionError::index_out_of_bounds(start, end));
        }
        Ok(Self { base, start, end })
    }

    /// Returns the number of elements in the window.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the window is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the element at `index` within the window.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        self.base.get(self.start + index)
    }

    /// Returns the element at `index` within the window, or an error.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) when
    /// `index >= len()`.
    pub fn nth(&self, index: usize) -> Result<&T> {
        self.get(index)
            .ok_or(CollectionError::index_out_of_bounds(index, self.len()))
    }

    /// Returns the element at `index`, or `default` when out of bounds.
    #[must_use]
    pub fn get_or<'a>(&'a self, index: usize, default: &'a T) -> &'a T {
        self.get(index).unwrap_or(default)
    }

    /// Returns the first element of the window.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the last element of the window.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// Returns an iterator over the elements of the window.
    #[must_use]
    pub fn iter(&self) -> SubvectorIterator<'_, T> {
        SubvectorIterator {
            vector: &self.base,
            offset: self.start,
            end: self.end,
            current: [].iter(),
            remaining: self.len(),
        }
    }
}

impl<T: Clone> Subvector<T> {
    /// Appends an element after the window.
    ///
    /// The base vector receives the element at index `end`, replacing
    /// whatever the base held there outside the window.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// let window = vector.subvec(2, 4).unwrap().push_back(100);
    ///
    /// assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 100]);
    /// assert_eq!(vector.get(4), Some(&4));
    /// ```
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        let base = match self.base.assoc_n(self.end, element) {
            Ok(base) => base,
            Err(_) => unreachable!("subvector end {} lies beyond its base", self.end),
        };
        Self {
            base,
            start: self.start,
            end: self.end + 1,
        }
    }

    /// Replaces the element at `index`, or appends when `index == len()`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) when
    /// `index > len()`.
    pub fn assoc_n(&self, index: usize, element: T) -> Result<Self> {
        let length = self.len();
        if index > length {
            return Err(CollectionError::index_out_of_bounds(index, length));
        }
        if index == length {
            return Ok(self.push_back(element));
        }
        Ok(Self {
            base: self.base.assoc_n(self.start + index, element)?,
            start: self.start,
            end: self.end,
        })
    }

    /// Drops the last element of the window.
    ///
    /// A window popped down to nothing releases its base vector.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCollection`](CollectionError::EmptyCollection) when the
    /// window is empty.
    pub fn pop(&self) -> Result<Self> {
        if self.is_empty() {
            return Err(CollectionError::empty("subvector"));
        }
        if self.end - 1 == self.start {
            return Ok(Self {
                base: PersistentVector::new(),
                start: 0,
                end: 0,
            });
        }
        Ok(Self {
            base: self.base.clone(),
            start: self.start,
            end: self.end - 1,
        })
    }

    /// Returns a narrower window `[start, end)` relative to this one.
    ///
    /// The result views the same base vector directly.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) unless
    /// `start <= end <= len()`.
    pub fn subvec(&self, start: usize, end: usize) -> Result<Self> {
        if end > self.len() {
            return Err(CollectionError::index_out_of_bounds(end, self.len()));
        }
        if start > end {
            return Err(CollectionError::index_out_of_bounds(start, end));
        }
        Ok(Self {
            base: self.base.clone(),
            start: self.start + start,
            end: self.start + end,
        })
    }

    /// Copies the window into a standalone vector.
    #[must_use]
    pub fn to_vector(&self) -> PersistentVector<T> {
        self.iter().cloned().collect()
    }
}

/// An iterator over the elements of a [`Subvector`].
pub struct SubvectorIterator<'a, T> {
    vector: &'a PersistentVector<T>,
    offset: usize,
    end: usize,
    current: std::slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for SubvectorIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.current.next() {
                self.remaining -= 1;
                return Some(element);
            }
            if self.offset >= self.end {
                return None;
            }
            let (chunk_start, chunk) = self.vector.chunk_at(self.offset);
            let upper = (self.end - chunk_start).min(chunk.len());
            self.current = chunk[self.offset - chunk_start..upper].iter();
            self.offset = chunk_start + upper;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for SubvectorIterator<'_, T> {}

impl<'a, T> IntoIterator for &'a Subvector<T> {
    type Item = &'a T;
    type IntoIter = SubvectorIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for Subvector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for Subvector<T> {}

impl<T: PartialEq> PartialEq<PersistentVector<T>> for Subvector<T> {
    fn eq(&self, other: &PersistentVector<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for Subvector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vector(count: i32) -> PersistentVector<i32> {
        (0..count).collect()
    }

    #[rstest]
    fn test_window_translates_indices() {
        let window = vector(100).subvec(30, 70).unwrap();
        assert_eq!(window.len(), 40);
        assert_eq!(window.get(0), Some(&30));
        assert_eq!(window.get(39), Some(&69));
        assert_eq!(window.get(40), None);
        assert_eq!(window.nth(40), Err(CollectionError::index_out_of_bounds(40, 40)));
        assert_eq!(window.get_or(40, &-1), &-1);
    }

    #[rstest]
    #[case(0, 101)]
    #[case(60, 50)]
    fn test_invalid_bounds_are_rejected(#[case] start: usize, #[case] end: usize) {
        assert!(vector(100).subvec(start, end).is_err());
    }

    #[rstest]
    fn test_nested_window_collapses() {
        let outer = vector(100).subvec(10, 90).unwrap();
        let inner = outer.subvec(5, 10).unwrap();
        assert_eq!(inner.start, 15);
        assert_eq!(inner.end, 20);
        assert_eq!(inner.iter().copied().collect::<Vec<_>>(), vec![15, 16, 17, 18, 19]);
    }

    #[rstest]
    fn test_iteration_spans_leaves_and_tail() {
        let base = vector(1050);
        let window = base.subvec(20, 1040).unwrap();
        let collected: Vec<i32> = window.iter().copied().collect();
        assert_eq!(collected, (20..1040).collect::<Vec<_>>());
        assert_eq!(window.iter().len(), 1020);
    }

    #[rstest]
    fn test_assoc_within_and_at_end() {
        let base = vector(10);
        let window = base.subvec(2, 5).unwrap();

        let replaced = window.assoc_n(1, 99).unwrap();
        assert_eq!(replaced.get(1), Some(&99));
        assert_eq!(base.get(3), Some(&3));

        let appended = window.assoc_n(3, 42).unwrap();
        assert_eq!(appended.len(), 4);
        assert_eq!(appended.last(), Some(&42));

        assert!(window.assoc_n(4, 0).is_err());
    }

    #[rstest]
    fn test_pop_to_empty() {
        let window = vector(10).subvec(4, 6).unwrap();
        let one = window.pop().unwrap();
        assert_eq!(one.len(), 1);
        let empty = one.pop().unwrap();
        assert!(empty.is_empty());
        assert!(empty.base.is_empty());
        assert_eq!(empty.pop(), Err(CollectionError::empty("subvector")));
    }

    #[rstest]
    fn test_to_vector_and_equality() {
        let window = vector(50).subvec(10, 20).unwrap();
        let standalone = window.to_vector();
        assert_eq!(standalone, (10..20).collect::<PersistentVector<_>>());
        assert!(window == standalone);
    }
}
