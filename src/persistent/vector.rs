//! Persistent (immutable) vector based on a 32-way bit-partitioned trie.
//!
//! This module provides [`PersistentVector`], an immutable vector that
//! uses structural sharing, and [`TransientVector`], its mutable builder.
//!
//! # Overview
//!
//! Elements live in 32-element leaves under a trie of 32-way branch nodes.
//! The last (up to) 32 elements are kept out of the trie in a *tail* buffer,
//! which makes appending amortized O(1).
//!
//! - O(log32 N) get and update
//! - O(1) amortized `push_back` / `pop_back`
//! - O(1) len and `is_empty`
//!
//! # Examples
//!
//! ```rust
//! use trieste::persistent::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..100).collect();
//! assert_eq!(vector.get(50), Some(&50));
//!
//! // Structural sharing: the original vector is preserved
//! let updated = vector.update(50, 999).unwrap();
//! assert_eq!(vector.get(50), Some(&50));     // Original unchanged
//! assert_eq!(updated.get(50), Some(&999));   // New version
//! ```
//!
//! # Internal Structure
//!
//! `shift` is the bit offset of the root level: 5 for a two-level trie, 10
//! for three levels and so on. The index of a child at level `shift` is
//! `(index >> shift) & 31`; leaves sit at shift 0.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{ControlFlow, Index};
use std::rc::Rc;

use arrayvec::ArrayVec;

use super::ReferenceCounter;
use super::Subvector;
use super::edit::{Owner, OwnerToken, Stamped, editable};
use crate::error::{CollectionError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Branching factor (2^5 = 32)
const BRANCHING_FACTOR: usize = 32;

/// Bits per level in the trie
const BITS_PER_LEVEL: usize = 5;

/// Bit mask for extracting index within a node
const MASK: usize = BRANCHING_FACTOR - 1;

// =============================================================================
// Node Definition
// =============================================================================

type Children<T> = [Option<ReferenceCounter<Node<T>>>; BRANCHING_FACTOR];

/// Internal node structure for the vector trie.
#[derive(Clone)]
enum Node<T> {
    /// Branch node containing child nodes
    Branch {
        owner: Option<OwnerToken>,
        children: Children<T>,
    },
    /// Leaf node holding exactly 32 elements
    Leaf {
        owner: Option<OwnerToken>,
        elements: ArrayVec<T, BRANCHING_FACTOR>,
    },
}

impl<T> Node<T> {
    fn empty_branch(owner: Option<OwnerToken>) -> Self {
        Self::Branch {
            owner,
            children: std::array::from_fn(|_| None),
        }
    }

    /// Wraps `node` in single-child branches until it sits `level` bits below
    /// the returned node.
    fn new_path(owner: Option<OwnerToken>, level: usize, node: ReferenceCounter<Self>) -> ReferenceCounter<Self> {
        if level == 0 {
            return node;
        }
        let mut children: Children<T> = std::array::from_fn(|_| None);
        children[0] = Some(Self::new_path(owner, level - BITS_PER_LEVEL, node));
        ReferenceCounter::new(Self::Branch { owner, children })
    }

    fn children(&self) -> &Children<T> {
        match self {
            Self::Branch { children, .. } => children,
            Self::Leaf { .. } => unreachable!("vector trie leaf found above level 0"),
        }
    }

    fn into_elements(this: ReferenceCounter<Self>) -> ArrayVec<T, BRANCHING_FACTOR>
    where
        T: Clone,
    {
        match ReferenceCounter::unwrap_or_clone(this) {
            Self::Leaf { elements, .. } => elements,
            Self::Branch { .. } => unreachable!("vector trie branch found at level 0"),
        }
    }
}

impl<T: Clone> Stamped for Node<T> {
    fn owner(&self) -> Option<OwnerToken> {
        match self {
            Self::Branch { owner, .. } | Self::Leaf { owner, .. } => *owner,
        }
    }

    fn set_owner(&mut self, token: OwnerToken) {
        match self {
            Self::Branch { owner, .. } | Self::Leaf { owner, .. } => *owner = Some(token),
        }
    }
}

/// Returns the index of the first element held in the tail.
#[inline]
const fn tail_offset(length: usize) -> usize {
    if length < BRANCHING_FACTOR {
        0
    } else {
        ((length - 1) >> BITS_PER_LEVEL) << BITS_PER_LEVEL
    }
}

/// Returns `true` when the trie of a vector with `length` elements (tail
/// full) has no room left for another leaf at the current `shift`.
#[inline]
const fn root_overflows(length: usize, shift: usize) -> bool {
    (length >> BITS_PER_LEVEL) > (1 << shift)
}

/// Returns the leaf holding `index`, which must lie below the tail offset.
fn leaf_for<T>(root: &Node<T>, shift: usize, index: usize) -> &[T] {
    let mut node = root;
    let mut level = shift;
    loop {
        match node {
            Node::Branch { children, .. } => match &children[(index >> level) & MASK] {
                Some(child) => {
                    node = child;
                    level = level.saturating_sub(BITS_PER_LEVEL);
                }
                None => unreachable!("vector trie has no leaf for index {index}"),
            },
            Node::Leaf { elements, .. } => return elements,
        }
    }
}

// =============================================================================
// PersistentVector Definition
// =============================================================================

/// A persistent (immutable) vector based on a 32-way trie with a tail buffer.
///
/// # Time Complexity
///
/// | Operation    | Complexity                    |
/// |--------------|-------------------------------|
/// | `new`        | O(1)                          |
/// | `get`        | O(log32 N)                    |
/// | `push_back`  | O(log32 N) amortized O(1)     |
/// | `pop_back`   | O(log32 N) amortized O(1)     |
/// | `update`     | O(log32 N)                    |
/// | `len`        | O(1)                          |
/// | `subvec`     | O(1)                          |
/// | `iter`       | O(1) to create, O(N) to iterate |
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..100).collect();
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.get(50), Some(&50));
/// ```
#[derive(Clone)]
pub struct PersistentVector<T> {
    /// Total number of elements
    length: usize,
    /// Bit offset of the root level, a positive multiple of `BITS_PER_LEVEL`
    shift: usize,
    /// Root node of the trie, always a branch
    root: ReferenceCounter<Node<T>>,
    /// Elements not yet pushed into the trie, exactly `length - tail_offset`
    tail: ReferenceCounter<[T]>,
}

impl<T> PersistentVector<T> {
    /// Creates a new empty vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = PersistentVector::new();
    /// assert!(vector.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            length: 0,
            shift: BITS_PER_LEVEL,
            root: ReferenceCounter::new(Node::empty_branch(None)),
            tail: ReferenceCounter::from(Vec::<T>::new()),
        }
    }

    /// Creates a vector containing a single element.
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self {
            length: 1,
            shift: BITS_PER_LEVEL,
            root: ReferenceCounter::new(Node::empty_branch(None)),
            tail: ReferenceCounter::from(vec![element]),
        }
    }

    /// Returns the number of elements in the vector.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the vector contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    const fn tail_offset(&self) -> usize {
        tail_offset(self.length)
    }

    /// Returns the chunk (trie leaf or tail) holding `index` together with
    /// the index of its first element.
    pub(crate) fn chunk_at(&self, index: usize) -> (usize, &[T]) {
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            (tail_offset, &self.tail)
        } else {
            (index & !MASK, leaf_for(&self.root, self.shift, index))
        }
    }

    /// Returns a reference to the element at the given index.
    ///
    /// Returns `None` if the index is out of bounds.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// assert_eq!(vector.get(0), Some(&1));
    /// assert_eq!(vector.get(4), Some(&5));
    /// assert_eq!(vector.get(10), None);
    /// ```
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        let (start, chunk) = self.chunk_at(index);
        chunk.get(index - start)
    }

    /// Returns the element at `index`, or an
    /// [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) error.
    ///
    /// # Errors
    ///
    /// Fails when `index >= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::CollectionError;
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..3).collect();
    /// assert_eq!(vector.nth(2), Ok(&2));
    /// assert_eq!(vector.nth(3), Err(CollectionError::index_out_of_bounds(3, 3)));
    /// ```
    pub fn nth(&self, index: usize) -> Result<&T> {
        self.get(index)
            .ok_or(CollectionError::index_out_of_bounds(index, self.length))
    }

    /// Returns the element at `index`, or `default` when out of bounds.
    #[must_use]
    pub fn get_or<'a>(&'a self, index: usize, default: &'a T) -> &'a T {
        self.get(index).unwrap_or(default)
    }

    /// Returns a reference to the first element.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns a reference to the last element.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tail.last()
    }

    /// Returns an iterator over the leaf-aligned chunks of the vector.
    ///
    /// Every chunk but the last is a full 32-element trie leaf; the last one
    /// is the tail.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..70).collect();
    /// let sizes: Vec<usize> = vector.chunks().map(<[i32]>::len).collect();
    /// assert_eq!(sizes, vec![32, 32, 6]);
    /// ```
    #[must_use]
    pub const fn chunks(&self) -> PersistentVectorChunks<'_, T> {
        PersistentVectorChunks {
            vector: self,
            offset: 0,
        }
    }

    /// Returns an iterator over the elements of the vector.
    #[must_use]
    pub fn iter(&self) -> PersistentVectorIterator<'_, T> {
        PersistentVectorIterator {
            chunks: self.chunks(),
            current: [].iter(),
            remaining: self.length,
        }
    }

    /// Folds every `(index, element)` pair in order, stopping as soon as
    /// `function` returns [`ControlFlow::Break`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::ControlFlow;
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=100).collect();
    /// let first_over_ten = vector.kv_reduce(None, |_, index, element| {
    ///     if *element > 10 {
    ///         ControlFlow::Break(Some(index))
    ///     } else {
    ///         ControlFlow::Continue(None)
    ///     }
    /// });
    /// assert_eq!(first_over_ten, Some(10));
    /// ```
    pub fn kv_reduce<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(B, usize, &T) -> ControlFlow<B, B>,
    {
        let mut accumulator = init;
        let mut index = 0;
        for chunk in self.chunks() {
            for element in chunk {
                accumulator = match function(accumulator, index, element) {
                    ControlFlow::Continue(accumulator) => accumulator,
                    ControlFlow::Break(result) => return result,
                };
                index += 1;
            }
        }
        accumulator
    }
}

impl<T: Clone> PersistentVector<T> {
    /// Creates a vector from a slice, building through a transient.
    #[must_use]
    pub fn from_slice(slice: &[T]) -> Self {
        slice.iter().cloned().collect()
    }

    /// Appends an element to the back of the vector (conj).
    ///
    /// # Complexity
    ///
    /// O(log32 N) worst case, amortized O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::new().push_back(1).push_back(2);
    /// assert_eq!(vector.len(), 2);
    /// assert_eq!(vector.last(), Some(&2));
    /// ```
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        if self.length - self.tail_offset() < BRANCHING_FACTOR {
            let tail: ReferenceCounter<[T]> = self
                .tail
                .iter()
                .cloned()
                .chain(std::iter::once(element))
                .collect();
            return Self {
                length: self.length + 1,
                shift: self.shift,
                root: self.root.clone(),
                tail,
            };
        }

        let tail_leaf = ReferenceCounter::new(Node::Leaf {
            owner: None,
            elements: self.tail.iter().cloned().collect(),
        });

        let (root, shift) = if root_overflows(self.length, self.shift) {
            let mut children: Children<T> = std::array::from_fn(|_| None);
            children[0] = Some(self.root.clone());
            children[1] = Some(Node::new_path(None, self.shift, tail_leaf));
            let shift = self.shift + BITS_PER_LEVEL;
            tracing::trace!(old_shift = self.shift, new_shift = shift, "vector trie grew a level");
            (ReferenceCounter::new(Node::Branch { owner: None, children }), shift)
        } else {
            let root = Self::push_tail(&self.root, self.shift, self.length - 1, tail_leaf);
            (root, self.shift)
        };

        Self {
            length: self.length + 1,
            shift,
            root,
            tail: ReferenceCounter::from(vec![element]),
        }
    }

    /// Path-copies `node` with `tail_leaf` inserted as the leaf holding
    /// `last_index`.
    fn push_tail(
        node: &Node<T>,
        level: usize,
        last_index: usize,
        tail_leaf: ReferenceCounter<Node<T>>,
    ) -> ReferenceCounter<Node<T>> {
        let subindex = (last_index >> level) & MASK;
        let mut children = node.children().clone();

        children[subindex] = Some(if level == BITS_PER_LEVEL {
            tail_leaf
        } else {
            match &node.children()[subindex] {
                Some(child) => Self::push_tail(child, level - BITS_PER_LEVEL, last_index, tail_leaf),
                None => Node::new_path(None, level - BITS_PER_LEVEL, tail_leaf),
            }
        });

        ReferenceCounter::new(Node::Branch { owner: None, children })
    }

    /// Removes the last element, returning the shorter vector and the element.
    ///
    /// Returns `None` if the vector is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=3).collect();
    /// let (rest, last) = vector.pop_back().unwrap();
    /// assert_eq!(last, 3);
    /// assert_eq!(rest.len(), 2);
    /// ```
    #[must_use]
    pub fn pop_back(&self) -> Option<(Self, T)> {
        let element = self.last()?.clone();
        Some((self.without_last(), element))
    }

    /// Removes the last element.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCollection`](CollectionError::EmptyCollection) when the
    /// vector is empty.
    pub fn pop(&self) -> Result<Self> {
        if self.is_empty() {
            return Err(CollectionError::empty("vector"));
        }
        Ok(self.without_last())
    }

    fn without_last(&self) -> Self {
        if self.length == 1 {
            return Self::new();
        }

        if self.length - self.tail_offset() > 1 {
            return Self {
                length: self.length - 1,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::from(&self.tail[..self.tail.len() - 1]),
            };
        }

        let new_tail = ReferenceCounter::from(leaf_for(&self.root, self.shift, self.length - 2));
        let mut root = Self::pop_tail(&self.root, self.shift, self.length - 2)
            .unwrap_or_else(|| ReferenceCounter::new(Node::empty_branch(None)));
        let mut shift = self.shift;

        if shift > BITS_PER_LEVEL && root.children()[1].is_none() {
            if let Some(only_child) = root.children()[0].clone() {
                root = only_child;
            }
            tracing::trace!(old_shift = shift, new_shift = shift - BITS_PER_LEVEL, "vector trie lost a level");
            shift -= BITS_PER_LEVEL;
        }

        Self {
            length: self.length - 1,
            shift,
            root,
            tail: new_tail,
        }
    }

    /// Path-copies `node` without the leaf holding `last_index`.
    ///
    /// `None` means the subtree became empty.
    fn pop_tail(node: &Node<T>, level: usize, last_index: usize) -> Option<ReferenceCounter<Node<T>>> {
        let subindex = (last_index >> level) & MASK;

        let new_child = if level > BITS_PER_LEVEL {
            let child = node.children()[subindex]
                .as_deref()
                .unwrap_or_else(|| unreachable!("vector trie has no node on the last path"));
            let new_child = Self::pop_tail(child, level - BITS_PER_LEVEL, last_index);
            if new_child.is_none() && subindex == 0 {
                return None;
            }
            new_child
        } else if subindex == 0 {
            return None;
        } else {
            None
        };

        let mut children = node.children().clone();
        children[subindex] = new_child;
        Some(ReferenceCounter::new(Node::Branch { owner: None, children }))
    }

    /// Replaces the element at `index`.
    ///
    /// Returns `None` if the index is out of bounds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..5).collect();
    /// let updated = vector.update(2, 100).unwrap();
    /// assert_eq!(updated.get(2), Some(&100));
    /// assert_eq!(vector.get(2), Some(&2));
    /// assert!(vector.update(5, 0).is_none());
    /// ```
    #[must_use]
    pub fn update(&self, index: usize, element: T) -> Option<Self> {
        if index >= self.length {
            return None;
        }

        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            let mut tail = self.tail.to_vec();
            tail[index - tail_offset] = element;
            return Some(Self {
                length: self.length,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::from(tail),
            });
        }

        Some(Self {
            length: self.length,
            shift: self.shift,
            root: ReferenceCounter::new(Self::assoc_path(&self.root, self.shift, index, element)),
            tail: self.tail.clone(),
        })
    }

    fn assoc_path(node: &Node<T>, level: usize, index: usize, element: T) -> Node<T> {
        match node {
            Node::Leaf { elements, .. } => {
                let mut elements = elements.clone();
                elements[index & MASK] = element;
                Node::Leaf { owner: None, elements }
            }
            Node::Branch { children, .. } => {
                let subindex = (index >> level) & MASK;
                let child = children[subindex]
                    .as_deref()
                    .unwrap_or_else(|| unreachable!("vector trie has no node for index {index}"));
                let mut new_children = children.clone();
                new_children[subindex] = Some(ReferenceCounter::new(Self::assoc_path(
                    child,
                    level.saturating_sub(BITS_PER_LEVEL),
                    index,
                    element,
                )));
                Node::Branch {
                    owner: None,
                    children: new_children,
                }
            }
        }
    }

    /// Replaces the element at `index`, or appends when `index == len()`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) when
    /// `index > len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..3).collect();
    /// assert_eq!(vector.assoc_n(1, 10).unwrap().get(1), Some(&10));
    /// assert_eq!(vector.assoc_n(3, 3).unwrap().len(), 4);
    /// assert!(vector.assoc_n(4, 4).is_err());
    /// ```
    pub fn assoc_n(&self, index: usize, element: T) -> Result<Self> {
        if index == self.length {
            return Ok(self.push_back(element));
        }
        self.update(index, element)
            .ok_or(CollectionError::index_out_of_bounds(index, self.length))
    }

    /// Returns a view of the elements in `[start, end)`, sharing storage.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) unless
    /// `start <= end <= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// let middle = vector.subvec(3, 7).unwrap();
    /// assert_eq!(middle.len(), 4);
    /// assert_eq!(middle.get(0), Some(&3));
    /// ```
    pub fn subvec(&self, start: usize, end: usize) -> Result<Subvector<T>> {
        Subvector::new(self.clone(), start, end)
    }

    /// Opens a transient session over this vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// let mut transient = vector.transient();
    /// transient.push_back(10);
    /// transient.assoc_n(0, -1).unwrap();
    /// let updated = transient.persistent();
    ///
    /// assert_eq!(updated.len(), 11);
    /// assert_eq!(updated.get(0), Some(&-1));
    /// assert_eq!(vector.get(0), Some(&0));
    /// ```
    #[must_use]
    pub fn transient(&self) -> TransientVector<T> {
        TransientVector::from_parts(
            self.length,
            self.shift,
            self.root.clone(),
            self.tail.iter().cloned().collect(),
        )
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the leaf-aligned chunks of a [`PersistentVector`].
pub struct PersistentVectorChunks<'a, T> {
    vector: &'a PersistentVector<T>,
    offset: usize,
}

impl<'a, T> Iterator for PersistentVectorChunks<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.vector.length {
            return None;
        }
        let (_, chunk) = self.vector.chunk_at(self.offset);
        self.offset += chunk.len();
        Some(chunk)
    }
}

/// An iterator over the elements of a [`PersistentVector`].
///
/// Walks one leaf at a time, so each element costs O(1).
pub struct PersistentVectorIterator<'a, T> {
    chunks: PersistentVectorChunks<'a, T>,
    current: std::slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for PersistentVectorIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.current.next() {
                self.remaining -= 1;
                return Some(element);
            }
            self.current = self.chunks.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for PersistentVectorIterator<'_, T> {}

/// An owning iterator over the elements of a [`PersistentVector`].
pub struct PersistentVectorIntoIterator<T> {
    vector: PersistentVector<T>,
    offset: usize,
    buffer: std::vec::IntoIter<T>,
}

impl<T: Clone> Iterator for PersistentVectorIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.buffer.next() {
                return Some(element);
            }
            if self.offset >= self.vector.length {
                return None;
            }
            let (_, chunk) = self.vector.chunk_at(self.offset);
            self.offset += chunk.len();
            self.buffer = chunk.to_vec().into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.length - self.offset + self.buffer.len();
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for PersistentVectorIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentVector<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for PersistentVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = TransientVector::new();
        transient.extend(iter);
        transient.persistent()
    }
}

impl<T: Clone> IntoIterator for PersistentVector<T> {
    type Item = T;
    type IntoIter = PersistentVectorIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentVectorIntoIterator {
            vector: self,
            offset: 0,
            buffer: Vec::new().into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentVector<T> {
    type Item = &'a T;
    type IntoIter = PersistentVectorIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Index<usize> for PersistentVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Some(element) => element,
            None => panic!("{}", CollectionError::index_out_of_bounds(index, self.length)),
        }
    }
}

impl<T: PartialEq> PartialEq for PersistentVector<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        if ReferenceCounter::ptr_eq(&self.root, &other.root)
            && ReferenceCounter::ptr_eq(&self.tail, &other.tail)
        {
            return true;
        }
        self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for PersistentVector<T> {}

impl<T: Hash> Hash for PersistentVector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientVector Definition
// =============================================================================

/// A transient (temporarily mutable) vector for efficient batch updates.
///
/// The tail is a fixed-capacity buffer owned by the transient; trie nodes
/// are copied on first touch and edited in place afterwards.
/// [`persistent()`](Self::persistent) trims the tail to its exact length,
/// retires the edit token and returns the vector without copying the trie.
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::TransientVector;
///
/// let mut transient = TransientVector::new();
/// for index in 0..1000 {
///     transient.push_back(index);
/// }
/// let vector = transient.persistent();
///
/// assert_eq!(vector.len(), 1000);
/// assert_eq!(vector.nth(0), Ok(&0));
/// assert_eq!(vector.nth(999), Ok(&999));
/// ```
pub struct TransientVector<T> {
    owner: Owner,
    length: usize,
    shift: usize,
    root: ReferenceCounter<Node<T>>,
    tail: ArrayVec<T, BRANCHING_FACTOR>,
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientVector<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientVector<String>: Send, Sync);

#[cfg(feature = "arc")]
mod arc_send_sync_verification_vector {
    use super::TransientVector;
    use std::sync::Arc;

    static_assertions::assert_not_impl_any!(TransientVector<Arc<i32>>: Send, Sync);
}

impl<T> TransientVector<T> {
    fn from_parts(
        length: usize,
        shift: usize,
        root: ReferenceCounter<Node<T>>,
        tail: ArrayVec<T, BRANCHING_FACTOR>,
    ) -> Self {
        let owner = Owner::new();
        tracing::trace!(edit = owner.token().id(), length, "opened transient vector");
        Self {
            owner,
            length,
            shift,
            root,
            tail,
            _marker: PhantomData,
        }
    }

    /// Creates a new empty transient vector.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(
            0,
            BITS_PER_LEVEL,
            ReferenceCounter::new(Node::empty_branch(None)),
            ArrayVec::new(),
        )
    }

    /// Returns the number of elements.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owner.token();
        self.length
    }

    /// Returns `true` if the transient holds no elements.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the transient has been sealed.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.owner.is_sealed()
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.owner.token();
        if index >= self.length {
            return None;
        }
        let tail_offset = tail_offset(self.length);
        if index >= tail_offset {
            self.tail.get(index - tail_offset)
        } else {
            leaf_for(&self.root, self.shift, index).get(index & MASK)
        }
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) when
    /// `index >= len()`.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn nth(&self, index: usize) -> Result<&T> {
        self.get(index)
            .ok_or(CollectionError::index_out_of_bounds(index, self.length))
    }

    /// Retires the edit token and returns the finished persistent vector.
    ///
    /// The tail is trimmed to its exact length. The handle is left empty and
    /// sealed; any further use panics.
    ///
    /// # Panics
    ///
    /// Panics if the transient has already been sealed.
    pub fn seal(&mut self) -> PersistentVector<T> {
        let token = self.owner.seal();
        tracing::trace!(edit = token.id(), length = self.length, "sealed transient vector");
        let tail: ReferenceCounter<[T]> = std::mem::take(&mut self.tail).into_iter().collect();
        PersistentVector {
            length: std::mem::take(&mut self.length),
            shift: std::mem::replace(&mut self.shift, BITS_PER_LEVEL),
            root: std::mem::replace(
                &mut self.root,
                ReferenceCounter::new(Node::empty_branch(None)),
            ),
            tail,
        }
    }

    /// Converts the transient into a persistent vector.
    ///
    /// # Panics
    ///
    /// Panics if the transient has already been sealed.
    #[must_use]
    pub fn persistent(mut self) -> PersistentVector<T> {
        self.seal()
    }
}

impl<T: Clone> TransientVector<T> {
    /// Appends an element (conj!).
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn push_back(&mut self, element: T) {
        let token = self.owner.token();

        if self.length - tail_offset(self.length) < BRANCHING_FACTOR {
            self.tail.push(element);
            self.length += 1;
            return;
        }

        let mut full_tail = ArrayVec::new();
        full_tail.push(element);
        let tail_leaf = ReferenceCounter::new(Node::Leaf {
            owner: Some(token),
            elements: std::mem::replace(&mut self.tail, full_tail),
        });

        if root_overflows(self.length, self.shift) {
            let mut children: Children<T> = std::array::from_fn(|_| None);
            children[1] = Some(Node::new_path(Some(token), self.shift, tail_leaf));
            let old_root = std::mem::replace(
                &mut self.root,
                ReferenceCounter::new(Node::empty_branch(Some(token))),
            );
            children[0] = Some(old_root);
            self.root = ReferenceCounter::new(Node::Branch {
                owner: Some(token),
                children,
            });
            tracing::trace!(old_shift = self.shift, new_shift = self.shift + BITS_PER_LEVEL, "vector trie grew a level");
            self.shift += BITS_PER_LEVEL;
        } else {
            Self::push_tail_mut(&mut self.root, token, self.shift, self.length - 1, tail_leaf);
        }
        self.length += 1;
    }

    fn push_tail_mut(
        node: &mut ReferenceCounter<Node<T>>,
        token: OwnerToken,
        level: usize,
        last_index: usize,
        tail_leaf: ReferenceCounter<Node<T>>,
    ) {
        let Node::Branch { children, .. } = editable(node, token) else {
            unreachable!("vector trie leaf found above level 0");
        };
        let slot = &mut children[(last_index >> level) & MASK];

        if level == BITS_PER_LEVEL {
            *slot = Some(tail_leaf);
            return;
        }
        match slot {
            Some(child) => Self::push_tail_mut(child, token, level - BITS_PER_LEVEL, last_index, tail_leaf),
            None => *slot = Some(Node::new_path(Some(token), level - BITS_PER_LEVEL, tail_leaf)),
        }
    }

    /// Removes and returns the last element (pop!).
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCollection`](CollectionError::EmptyCollection) when the
    /// transient is empty.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn pop(&mut self) -> Result<T> {
        let token = self.owner.token();
        let element = self
            .tail
            .pop()
            .ok_or(CollectionError::empty("transient vector"))?;
        self.length -= 1;

        if !self.tail.is_empty() || self.length == 0 {
            return Ok(element);
        }

        let (leaf, _) = Self::pop_tail_mut(&mut self.root, token, self.shift, self.length - 1);
        self.tail = Node::into_elements(leaf);

        if self.shift > BITS_PER_LEVEL && self.root.children()[1].is_none() {
            if let Some(only_child) = self.root.children()[0].clone() {
                self.root = only_child;
            }
            tracing::trace!(old_shift = self.shift, new_shift = self.shift - BITS_PER_LEVEL, "vector trie lost a level");
            self.shift -= BITS_PER_LEVEL;
        }
        Ok(element)
    }

    /// Detaches the leaf holding `last_index`. Also reports whether `node`
    /// was left without children.
    fn pop_tail_mut(
        node: &mut ReferenceCounter<Node<T>>,
        token: OwnerToken,
        level: usize,
        last_index: usize,
    ) -> (ReferenceCounter<Node<T>>, bool) {
        let Node::Branch { children, .. } = editable(node, token) else {
            unreachable!("vector trie leaf found above level 0");
        };
        let subindex = (last_index >> level) & MASK;

        let Some(child) = children[subindex].as_mut() else {
            unreachable!("vector trie has no node on the last path");
        };
        if level == BITS_PER_LEVEL {
            let leaf = child.clone();
            children[subindex] = None;
            return (leaf, subindex == 0);
        }

        let (leaf, child_emptied) = Self::pop_tail_mut(child, token, level - BITS_PER_LEVEL, last_index);
        if child_emptied {
            children[subindex] = None;
        }
        (leaf, child_emptied && subindex == 0)
    }

    /// Replaces the element at `index`, or appends when `index == len()`
    /// (assoc-n!).
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`](CollectionError::IndexOutOfBounds) when
    /// `index > len()`.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn assoc_n(&mut self, index: usize, element: T) -> Result<()> {
        let token = self.owner.token();

        if index == self.length {
            self.push_back(element);
            return Ok(());
        }
        if index > self.length {
            return Err(CollectionError::index_out_of_bounds(index, self.length));
        }

        let tail_offset = tail_offset(self.length);
        if index >= tail_offset {
            self.tail[index - tail_offset] = element;
        } else {
            Self::assoc_mut(&mut self.root, token, self.shift, index, element);
        }
        Ok(())
    }

    fn assoc_mut(
        node: &mut ReferenceCounter<Node<T>>,
        token: OwnerToken,
        level: usize,
        index: usize,
        element: T,
    ) {
        match editable(node, token) {
            Node::Leaf { elements, .. } => elements[index & MASK] = element,
            Node::Branch { children, .. } => match &mut children[(index >> level) & MASK] {
                Some(child) => Self::assoc_mut(
                    child,
                    token,
                    level.saturating_sub(BITS_PER_LEVEL),
                    index,
                    element,
                ),
                None => unreachable!("vector trie has no node for index {index}"),
            },
        }
    }
}

impl<T> Default for TransientVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Extend<T> for TransientVector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.push_back(element);
        }
    }
}

impl<T> fmt::Debug for TransientVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientVector")
            .field("length", &self.length)
            .field("shift", &self.shift)
            .field("sealed", &self.owner.is_sealed())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
