//! Persistent (immutable) tree map based on a Red-Black Tree.
//!
//! This module provides [`PersistentTreeMap`], an immutable ordered map
//! that uses structural sharing for efficient operations.
//!
//! # Overview
//!
//! Every update path-copies the nodes from the root to the change and
//! rebalances on the way back up; the original tree is never touched.
//! Entries are ordered by a [`Comparator`] chosen when the map is created,
//! [`NaturalOrder`] (the key's `Ord`) by default.
//!
//! - O(log N) get
//! - O(log N) insert
//! - O(log N) remove
//! - O(log N) min/max
//! - O(log N + k) range scans where k is the number of results
//! - O(1) len and `is_empty`
//!
//! # Examples
//!
//! ```rust
//! use trieste::persistent::PersistentTreeMap;
//!
//! let map = PersistentTreeMap::new()
//!     .insert(3, "three")
//!     .insert(1, "one")
//!     .insert(2, "two");
//!
//! // Entries are always in sorted order
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&1, &2, &3]);
//!
//! // Range scans are lazy
//! let range: Vec<(&i32, &&str)> = map.range(1..3).collect();
//! assert_eq!(range.len(), 2); // 1 and 2
//! ```
//!
//! # Internal Structure
//!
//! The Red-Black Tree maintains the following invariants:
//! 1. Every node is either red or black
//! 2. The root is black
//! 3. Red nodes have only black children
//! 4. Every path from root to leaf has the same number of black nodes
//!
//! These invariants keep the tree height O(log N). Reaching a state that
//! breaks them during rebalancing is a bug and panics.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::ops::{Bound, RangeBounds};

use smallvec::SmallVec;

use super::ReferenceCounter;

// =============================================================================
// Comparators
// =============================================================================

/// A total order over keys.
///
/// The comparator must be consistent: `compare(a, b)` and `compare(b, a)`
/// are reverses of each other and the order is transitive. A comparator that
/// is not a total order yields an unspecified (but memory-safe) tree.
pub trait Comparator<T: ?Sized> {
    /// Compares two keys.
    fn compare(&self, left: &T, right: &T) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord + ?Sized> Comparator<T> for NaturalOrder {
    #[inline]
    fn compare(&self, left: &T, right: &T) -> Ordering {
        left.cmp(right)
    }
}

/// Orders keys with a closure.
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::{FnComparator, PersistentTreeMap};
///
/// let descending = FnComparator::new(|left: &i32, right: &i32| right.cmp(left));
/// let map = PersistentTreeMap::with_comparator(descending)
///     .insert(1, "one")
///     .insert(3, "three")
///     .insert(2, "two");
///
/// let keys: Vec<i32> = map.keys().copied().collect();
/// assert_eq!(keys, vec![3, 2, 1]);
/// ```
#[derive(Clone, Copy)]
pub struct FnComparator<F>(F);

impl<F> FnComparator<F> {
    /// Wraps a comparison closure.
    pub const fn new(function: F) -> Self {
        Self(function)
    }
}

impl<T: ?Sized, F: Fn(&T, &T) -> Ordering> Comparator<T> for FnComparator<F> {
    #[inline]
    fn compare(&self, left: &T, right: &T) -> Ordering {
        (self.0)(left, right)
    }
}

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("FnComparator")
    }
}

// =============================================================================
// Node Definition
// =============================================================================

/// The color of a Red-Black Tree node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

type Link<K, V> = ReferenceCounter<Node<K, V>>;

/// Internal node structure for the Red-Black Tree.
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Option<Link<K, V>>,
    right: Option<Link<K, V>>,
}

impl<K, V> Node<K, V> {
    fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    fn is_black(&self) -> bool {
        self.color == Color::Black
    }
}

/// `false` for an empty subtree.
fn is_black<K, V>(node: Option<&Link<K, V>>) -> bool {
    node.is_some_and(|node| node.is_black())
}

/// Outcome of inserting into a subtree.
enum Insertion<K, V> {
    /// The key was present with an equal value.
    Unchanged,
    /// The key was present; its value was replaced without restructuring.
    Replaced(Link<K, V>),
    /// A new node was added; the subtree may need rebalancing above.
    Added(Link<K, V>),
}

impl<K: Clone, V: Clone> Node<K, V> {
    fn build(color: Color, key: K, value: V, left: Option<Link<K, V>>, right: Option<Link<K, V>>) -> Link<K, V> {
        ReferenceCounter::new(Self {
            key,
            value,
            color,
            left,
            right,
        })
    }

    fn red(key: K, value: V, left: Option<Link<K, V>>, right: Option<Link<K, V>>) -> Link<K, V> {
        Self::build(Color::Red, key, value, left, right)
    }

    fn black(key: K, value: V, left: Option<Link<K, V>>, right: Option<Link<K, V>>) -> Link<K, V> {
        Self::build(Color::Black, key, value, left, right)
    }

    fn recolored(&self, color: Color) -> Link<K, V> {
        Self::build(color, self.key.clone(), self.value.clone(), self.left.clone(), self.right.clone())
    }

    fn blacken(link: &Link<K, V>) -> Link<K, V> {
        if link.is_red() {
            link.recolored(Color::Black)
        } else {
            link.clone()
        }
    }

    fn redden(node: Option<&Link<K, V>>) -> Link<K, V> {
        match node {
            Some(node) if node.is_black() => node.recolored(Color::Red),
            _ => unreachable!("red-black invariant violated: expected a black node to redden"),
        }
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    fn insert<C: Comparator<K>>(node: Option<&Link<K, V>>, key: K, value: V, comparator: &C) -> Insertion<K, V>
    where
        V: PartialEq,
    {
        let Some(node) = node else {
            return Insertion::Added(Self::red(key, value, None, None));
        };

        match comparator.compare(&key, &node.key) {
            Ordering::Equal if node.value == value => Insertion::Unchanged,
            Ordering::Equal => Insertion::Replaced(Self::build(
                node.color,
                node.key.clone(),
                value,
                node.left.clone(),
                node.right.clone(),
            )),
            Ordering::Less => match Self::insert(node.left.as_ref(), key, value, comparator) {
                Insertion::Unchanged => Insertion::Unchanged,
                Insertion::Replaced(left) => Insertion::Replaced(Self::build(
                    node.color,
                    node.key.clone(),
                    node.value.clone(),
                    Some(left),
                    node.right.clone(),
                )),
                Insertion::Added(left) => Insertion::Added(Self::add_left(node, left)),
            },
            Ordering::Greater => match Self::insert(node.right.as_ref(), key, value, comparator) {
                Insertion::Unchanged => Insertion::Unchanged,
                Insertion::Replaced(right) => Insertion::Replaced(Self::build(
                    node.color,
                    node.key.clone(),
                    node.value.clone(),
                    node.left.clone(),
                    Some(right),
                )),
                Insertion::Added(right) => Insertion::Added(Self::add_right(node, right)),
            },
        }
    }

    fn add_left(parent: &Self, inserted: Link<K, V>) -> Link<K, V> {
        if parent.is_red() {
            Self::red(parent.key.clone(), parent.value.clone(), Some(inserted), parent.right.clone())
        } else {
            Self::balance_left(inserted, parent)
        }
    }

    fn add_right(parent: &Self, inserted: Link<K, V>) -> Link<K, V> {
        if parent.is_red() {
            Self::red(parent.key.clone(), parent.value.clone(), parent.left.clone(), Some(inserted))
        } else {
            Self::balance_right(inserted, parent)
        }
    }

    /// Rebuilds black `parent` with `inserted` as its new left child.
    fn balance_left(inserted: Link<K, V>, parent: &Self) -> Link<K, V> {
        if inserted.is_red() {
            if let Some(left) = inserted.left.as_ref()
                && left.is_red()
            {
                return Self::red(
                    inserted.key.clone(),
                    inserted.value.clone(),
                    Some(Self::blacken(left)),
                    Some(Self::black(
                        parent.key.clone(),
                        parent.value.clone(),
                        inserted.right.clone(),
                        parent.right.clone(),
                    )),
                );
            }
            if let Some(right) = inserted.right.as_ref()
                && right.is_red()
            {
                return Self::red(
                    right.key.clone(),
                    right.value.clone(),
                    Some(Self::black(
                        inserted.key.clone(),
                        inserted.value.clone(),
                        inserted.left.clone(),
                        right.left.clone(),
                    )),
                    Some(Self::black(
                        parent.key.clone(),
                        parent.value.clone(),
                        right.right.clone(),
                        parent.right.clone(),
                    )),
                );
            }
        }
        Self::black(parent.key.clone(), parent.value.clone(), Some(inserted), parent.right.clone())
    }

    /// Rebuilds black `parent` with `inserted` as its new right child.
    fn balance_right(inserted: Link<K, V>, parent: &Self) -> Link<K, V> {
        if inserted.is_red() {
            if let Some(right) = inserted.right.as_ref()
                && right.is_red()
            {
                return Self::red(
                    inserted.key.clone(),
                    inserted.value.clone(),
                    Some(Self::black(
                        parent.key.clone(),
                        parent.value.clone(),
                        parent.left.clone(),
                        inserted.left.clone(),
                    )),
                    Some(Self::blacken(right)),
                );
            }
            if let Some(left) = inserted.left.as_ref()
                && left.is_red()
            {
                return Self::red(
                    left.key.clone(),
                    left.value.clone(),
                    Some(Self::black(
                        parent.key.clone(),
                        parent.value.clone(),
                        parent.left.clone(),
                        left.left.clone(),
                    )),
                    Some(Self::black(
                        inserted.key.clone(),
                        inserted.value.clone(),
                        left.right.clone(),
                        inserted.right.clone(),
                    )),
                );
            }
        }
        Self::black(parent.key.clone(), parent.value.clone(), parent.left.clone(), Some(inserted))
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Removes `key` from the subtree.
    ///
    /// Returns `None` when the key is absent, otherwise the new subtree
    /// (itself `None` when it became empty).
    fn remove<Q, C>(node: Option<&Link<K, V>>, key: &Q, comparator: &C) -> Option<Option<Link<K, V>>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let node = node?;
        match comparator.compare(key, node.key.borrow()) {
            Ordering::Equal => Some(Self::append(node.left.as_ref(), node.right.as_ref())),
            Ordering::Less => {
                let removed = Self::remove(node.left.as_ref(), key, comparator)?;
                let (key, value) = (node.key.clone(), node.value.clone());
                Some(Some(if is_black(node.left.as_ref()) {
                    Self::balance_left_del(key, value, removed, node.right.clone())
                } else {
                    Self::red(key, value, removed, node.right.clone())
                }))
            }
            Ordering::Greater => {
                let removed = Self::remove(node.right.as_ref(), key, comparator)?;
                let (key, value) = (node.key.clone(), node.value.clone());
                Some(Some(if is_black(node.right.as_ref()) {
                    Self::balance_right_del(key, value, node.left.clone(), removed)
                } else {
                    Self::red(key, value, node.left.clone(), removed)
                }))
            }
        }
    }

    /// Joins the two subtrees of a removed node.
    fn append(left: Option<&Link<K, V>>, right: Option<&Link<K, V>>) -> Option<Link<K, V>> {
        let (left, right) = match (left, right) {
            (None, right) => return right.cloned(),
            (left, None) => return left.cloned(),
            (Some(left), Some(right)) => (left, right),
        };

        Some(match (left.is_red(), right.is_red()) {
            (true, true) => match Self::append(left.right.as_ref(), right.left.as_ref()) {
                Some(middle) if middle.is_red() => Self::red(
                    middle.key.clone(),
                    middle.value.clone(),
                    Some(Self::red(
                        left.key.clone(),
                        left.value.clone(),
                        left.left.clone(),
                        middle.left.clone(),
                    )),
                    Some(Self::red(
                        right.key.clone(),
                        right.value.clone(),
                        middle.right.clone(),
                        right.right.clone(),
                    )),
                ),
                middle => Self::red(
                    left.key.clone(),
                    left.value.clone(),
                    left.left.clone(),
                    Some(Self::red(right.key.clone(), right.value.clone(), middle, right.right.clone())),
                ),
            },
            (true, false) => Self::red(
                left.key.clone(),
                left.value.clone(),
                left.left.clone(),
                Self::append(left.right.as_ref(), Some(right)),
            ),
            (false, true) => Self::red(
                right.key.clone(),
                right.value.clone(),
                Self::append(Some(left), right.left.as_ref()),
                right.right.clone(),
            ),
            (false, false) => match Self::append(left.right.as_ref(), right.left.as_ref()) {
                Some(middle) if middle.is_red() => Self::red(
                    middle.key.clone(),
                    middle.value.clone(),
                    Some(Self::black(
                        left.key.clone(),
                        left.value.clone(),
                        left.left.clone(),
                        middle.left.clone(),
                    )),
                    Some(Self::black(
                        right.key.clone(),
                        right.value.clone(),
                        middle.right.clone(),
                        right.right.clone(),
                    )),
                ),
                middle => Self::balance_left_del(
                    left.key.clone(),
                    left.value.clone(),
                    left.left.clone(),
                    Some(Self::black(right.key.clone(), right.value.clone(), middle, right.right.clone())),
                ),
            },
        })
    }

    /// Restores black height after the left subtree lost a black node.
    fn balance_left_del(key: K, value: V, removed: Option<Link<K, V>>, right: Option<Link<K, V>>) -> Link<K, V> {
        if let Some(removed) = removed.as_ref()
            && removed.is_red()
        {
            return Self::red(key, value, Some(Self::blacken(removed)), right);
        }
        match right.as_ref() {
            Some(sibling) if sibling.is_black() => {
                Self::right_balance(key, value, removed, Some(Self::redden(Some(sibling))))
            }
            Some(sibling) if is_black(sibling.left.as_ref()) => {
                let Some(nephew) = sibling.left.as_ref() else {
                    unreachable!("red-black invariant violated: red sibling without a left child");
                };
                Self::red(
                    nephew.key.clone(),
                    nephew.value.clone(),
                    Some(Self::black(key, value, removed, nephew.left.clone())),
                    Some(Self::right_balance(
                        sibling.key.clone(),
                        sibling.value.clone(),
                        nephew.right.clone(),
                        Some(Self::redden(sibling.right.as_ref())),
                    )),
                )
            }
            _ => unreachable!("red-black invariant violated while rebalancing a left deletion"),
        }
    }

    /// Restores black height after the right subtree lost a black node.
    fn balance_right_del(key: K, value: V, left: Option<Link<K, V>>, removed: Option<Link<K, V>>) -> Link<K, V> {
        if let Some(removed) = removed.as_ref()
            && removed.is_red()
        {
            return Self::red(key, value, left, Some(Self::blacken(removed)));
        }
        match left.as_ref() {
            Some(sibling) if sibling.is_black() => {
                Self::left_balance(key, value, Some(Self::redden(Some(sibling))), removed)
            }
            Some(sibling) if is_black(sibling.right.as_ref()) => {
                let Some(nephew) = sibling.right.as_ref() else {
                    unreachable!("red-black invariant violated: red sibling without a right child");
                };
                Self::red(
                    nephew.key.clone(),
                    nephew.value.clone(),
                    Some(Self::left_balance(
                        sibling.key.clone(),
                        sibling.value.clone(),
                        Some(Self::redden(sibling.left.as_ref())),
                        nephew.left.clone(),
                    )),
                    Some(Self::black(key, value, nephew.right.clone(), removed)),
                )
            }
            _ => unreachable!("red-black invariant violated while rebalancing a right deletion"),
        }
    }

    fn left_balance(key: K, value: V, inserted: Option<Link<K, V>>, right: Option<Link<K, V>>) -> Link<K, V> {
        if let Some(node) = inserted.as_ref()
            && node.is_red()
        {
            if let Some(outer) = node.left.as_ref()
                && outer.is_red()
            {
                return Self::red(
                    node.key.clone(),
                    node.value.clone(),
                    Some(Self::blacken(outer)),
                    Some(Self::black(key, value, node.right.clone(), right)),
                );
            }
            if let Some(inner) = node.right.as_ref()
                && inner.is_red()
            {
                return Self::red(
                    inner.key.clone(),
                    inner.value.clone(),
                    Some(Self::black(
                        node.key.clone(),
                        node.value.clone(),
                        node.left.clone(),
                        inner.left.clone(),
                    )),
                    Some(Self::black(key, value, inner.right.clone(), right)),
                );
            }
        }
        Self::black(key, value, inserted, right)
    }

    fn right_balance(key: K, value: V, left: Option<Link<K, V>>, inserted: Option<Link<K, V>>) -> Link<K, V> {
        if let Some(node) = inserted.as_ref()
            && node.is_red()
        {
            if let Some(outer) = node.right.as_ref()
                && outer.is_red()
            {
                return Self::red(
                    node.key.clone(),
                    node.value.clone(),
                    Some(Self::black(key, value, left, node.left.clone())),
                    Some(Self::blacken(outer)),
                );
            }
            if let Some(inner) = node.left.as_ref()
                && inner.is_red()
            {
                return Self::red(
                    inner.key.clone(),
                    inner.value.clone(),
                    Some(Self::black(key, value, left, inner.left.clone())),
                    Some(Self::black(
                        node.key.clone(),
                        node.value.clone(),
                        inner.right.clone(),
                        node.right.clone(),
                    )),
                );
            }
        }
        Self::black(key, value, left, inserted)
    }
}

// =============================================================================
// PersistentTreeMap Definition
// =============================================================================

/// A persistent (immutable) ordered map based on a Red-Black Tree.
///
/// # Time Complexity
///
/// | Operation      | Complexity     |
/// |----------------|----------------|
/// | `new`          | O(1)           |
/// | `get`          | O(log N)       |
/// | `insert`       | O(log N)       |
/// | `remove`       | O(log N)       |
/// | `min`/`max`    | O(log N)       |
/// | `range`        | O(log N + k)   |
/// | `len`          | O(1)           |
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::PersistentTreeMap;
///
/// let map = PersistentTreeMap::new()
///     .insert("banana", 2)
///     .insert("apple", 1);
///
/// assert_eq!(map.min(), Some((&"apple", &1)));
/// assert_eq!(map.get("banana"), Some(&2));
/// ```
pub struct PersistentTreeMap<K, V, C = NaturalOrder> {
    root: Option<Link<K, V>>,
    length: usize,
    comparator: C,
}

impl<K, V> PersistentTreeMap<K, V> {
    /// Creates a new empty map ordered by the keys' [`Ord`].
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, C> PersistentTreeMap<K, V, C> {
    /// Creates a new empty map ordered by `comparator`.
    #[inline]
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            root: None,
            length: 0,
            comparator,
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the comparator that orders this map.
    #[inline]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Returns the entry with the smallest key.
    #[must_use]
    pub fn min(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some((&node.key, &node.value))
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn max(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some((&node.key, &node.value))
    }

    /// Returns an iterator over entries in ascending key order.
    ///
    /// The iterator walks the tree lazily with a stack of ancestors.
    #[must_use]
    pub fn iter(&self) -> PersistentTreeMapIterator<'_, K, V> {
        PersistentTreeMapIterator::new(self.root.as_deref(), true, self.length)
    }

    /// Returns an iterator over entries in descending key order.
    #[must_use]
    pub fn iter_rev(&self) -> PersistentTreeMapIterator<'_, K, V> {
        PersistentTreeMapIterator::new(self.root.as_deref(), false, self.length)
    }

    /// Returns an iterator over keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

impl<K, V, C> PersistentTreeMap<K, V, C> {
    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentTreeMap;
    ///
    /// let map = PersistentTreeMap::new().insert("key".to_string(), 42);
    /// assert_eq!(map.get("key"), Some(&42));
    /// assert_eq!(map.get("other"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.entry_at(key).map(|(_, value)| value)
    }

    /// Returns the stored key and value for `key`.
    pub fn entry_at<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match self.comparator.compare(key, node.key.borrow()) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some((&node.key, &node.value)),
            };
        }
        None
    }

    /// Returns the value for `key`, or `default` when absent.
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.entry_at(key).is_some()
    }
}

impl<K: Clone, V: Clone, C: Clone> PersistentTreeMap<K, V, C> {
    /// Inserts a key-value pair, returning the updated map.
    ///
    /// When `key` is already bound to an equal value the result shares the
    /// original tree.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentTreeMap;
    ///
    /// let map1 = PersistentTreeMap::new().insert(1, "one");
    /// let map2 = map1.insert(1, "ONE");
    ///
    /// assert_eq!(map1.get(&1), Some(&"one"));
    /// assert_eq!(map2.get(&1), Some(&"ONE"));
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self
    where
        V: PartialEq,
        C: Comparator<K>,
    {
        match Node::insert(self.root.as_ref(), key, value, &self.comparator) {
            Insertion::Unchanged => self.clone(),
            Insertion::Replaced(root) => Self {
                root: Some(root),
                length: self.length,
                comparator: self.comparator.clone(),
            },
            Insertion::Added(root) => Self {
                root: Some(Node::blacken(&root)),
                length: self.length + 1,
                comparator: self.comparator.clone(),
            },
        }
    }

    /// Removes `key`, returning the updated map.
    ///
    /// Removing an absent key returns a map sharing the original tree.
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        match Node::remove(self.root.as_ref(), key, &self.comparator) {
            None => self.clone(),
            Some(root) => Self {
                root: root.as_ref().map(Node::blacken),
                length: self.length - 1,
                comparator: self.comparator.clone(),
            },
        }
    }

    /// Creates a map containing a single entry, ordered by `comparator`.
    #[must_use]
    pub fn singleton_with_comparator(key: K, value: V, comparator: C) -> Self {
        Self {
            root: Some(Node::black(key, value, None, None)),
            length: 1,
            comparator,
        }
    }
}

impl<K: Clone, V: Clone> PersistentTreeMap<K, V> {
    /// Creates a map containing a single entry.
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::singleton_with_comparator(key, value, NaturalOrder)
    }
}

impl<K, V, C: Comparator<K>> PersistentTreeMap<K, V, C> {
    /// Returns a lazy ascending iterator over the entries whose keys fall
    /// within `range`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentTreeMap;
    ///
    /// let map: PersistentTreeMap<i32, i32> = (0..100).map(|key| (key, key * 10)).collect();
    /// let slice: Vec<i32> = map.range(10..=12).map(|(key, _)| *key).collect();
    /// assert_eq!(slice, vec![10, 11, 12]);
    /// ```
    pub fn range<R>(&self, range: R) -> PersistentTreeMapRangeIterator<'_, K, V, C>
    where
        R: RangeBounds<K>,
        K: Clone,
    {
        let start = range.start_bound();
        let mut stack = SmallVec::new();
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            if satisfies_lower(&self.comparator, start, &node.key) {
                stack.push(node);
                current = node.left.as_deref();
            } else {
                current = node.right.as_deref();
            }
        }
        PersistentTreeMapRangeIterator {
            stack,
            limit: range.end_bound().cloned(),
            comparator: &self.comparator,
            ascending: true,
        }
    }

    /// Returns a lazy descending iterator over the entries whose keys fall
    /// within `range`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentTreeMap;
    ///
    /// let map: PersistentTreeMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    /// let slice: Vec<i32> = map.range_rev(..3).map(|(key, _)| *key).collect();
    /// assert_eq!(slice, vec![2, 1, 0]);
    /// ```
    pub fn range_rev<R>(&self, range: R) -> PersistentTreeMapRangeIterator<'_, K, V, C>
    where
        R: RangeBounds<K>,
        K: Clone,
    {
        let end = range.end_bound();
        let mut stack = SmallVec::new();
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            if satisfies_upper(&self.comparator, end, &node.key) {
                stack.push(node);
                current = node.right.as_deref();
            } else {
                current = node.left.as_deref();
            }
        }
        PersistentTreeMapRangeIterator {
            stack,
            limit: range.start_bound().cloned(),
            comparator: &self.comparator,
            ascending: false,
        }
    }
}

fn satisfies_lower<K, C: Comparator<K>>(comparator: &C, bound: Bound<&K>, key: &K) -> bool {
    match bound {
        Bound::Included(start) => comparator.compare(key, start) != Ordering::Less,
        Bound::Excluded(start) => comparator.compare(key, start) == Ordering::Greater,
        Bound::Unbounded => true,
    }
}

fn satisfies_upper<K, C: Comparator<K>>(comparator: &C, bound: Bound<&K>, key: &K) -> bool {
    match bound {
        Bound::Included(end) => comparator.compare(key, end) != Ordering::Greater,
        Bound::Excluded(end) => comparator.compare(key, end) == Ordering::Less,
        Bound::Unbounded => true,
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

type Stack<'a, K, V> = SmallVec<[&'a Node<K, V>; 32]>;

/// Pushes `node` and its spine of left (ascending) or right (descending)
/// descendants.
fn push_spine<'a, K, V>(stack: &mut Stack<'a, K, V>, mut node: Option<&'a Node<K, V>>, ascending: bool) {
    while let Some(current) = node {
        stack.push(current);
        node = if ascending {
            current.left.as_deref()
        } else {
            current.right.as_deref()
        };
    }
}

fn advance<'a, K, V>(stack: &mut Stack<'a, K, V>, ascending: bool) -> Option<&'a Node<K, V>> {
    let node = stack.pop()?;
    let next = if ascending {
        node.right.as_deref()
    } else {
        node.left.as_deref()
    };
    push_spine(stack, next, ascending);
    Some(node)
}

/// An iterator over key-value pairs of a [`PersistentTreeMap`].
pub struct PersistentTreeMapIterator<'a, K, V> {
    stack: Stack<'a, K, V>,
    ascending: bool,
    remaining: usize,
}

impl<'a, K, V> PersistentTreeMapIterator<'a, K, V> {
    fn new(root: Option<&'a Node<K, V>>, ascending: bool, length: usize) -> Self {
        let mut stack = SmallVec::new();
        push_spine(&mut stack, root, ascending);
        Self {
            stack,
            ascending,
            remaining: length,
        }
    }
}

impl<'a, K, V> Iterator for PersistentTreeMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = advance(&mut self.stack, self.ascending)?;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for PersistentTreeMapIterator<'_, K, V> {}

/// A lazy bounded iterator over key-value pairs of a [`PersistentTreeMap`].
pub struct PersistentTreeMapRangeIterator<'a, K, V, C = NaturalOrder> {
    stack: Stack<'a, K, V>,
    limit: Bound<K>,
    comparator: &'a C,
    ascending: bool,
}

impl<'a, K, V, C: Comparator<K>> Iterator for PersistentTreeMapRangeIterator<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = advance(&mut self.stack, self.ascending)?;
        let within = if self.ascending {
            satisfies_upper(self.comparator, self.limit.as_ref(), &node.key)
        } else {
            satisfies_lower(self.comparator, self.limit.as_ref(), &node.key)
        };
        if within {
            Some((&node.key, &node.value))
        } else {
            self.stack.clear();
            None
        }
    }
}

/// An owning iterator over key-value pairs of a [`PersistentTreeMap`].
///
/// Shares the tree with the map it came from and clones entries as it goes.
pub struct PersistentTreeMapIntoIterator<K, V> {
    stack: Vec<Link<K, V>>,
    remaining: usize,
}

impl<K, V> PersistentTreeMapIntoIterator<K, V> {
    fn push_left_spine(&mut self, mut node: Option<Link<K, V>>) {
        while let Some(current) = node {
            node = current.left.clone();
            self.stack.push(current);
        }
    }
}

impl<K: Clone, V: Clone> Iterator for PersistentTreeMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.clone());
        self.remaining -= 1;
        Some((node.key.clone(), node.value.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for PersistentTreeMapIntoIterator<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, C: Clone> Clone for PersistentTreeMap<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
            comparator: self.comparator.clone(),
        }
    }
}

impl<K, V, C: Default> Default for PersistentTreeMap<K, V, C> {
    #[inline]
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K: Clone + Ord, V: Clone + PartialEq> FromIterator<(K, V)> for PersistentTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |map, (key, value)| map.insert(key, value))
    }
}

impl<K: Clone, V: Clone, C> IntoIterator for PersistentTreeMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = PersistentTreeMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let mut iterator = PersistentTreeMapIntoIterator {
            stack: Vec::new(),
            remaining: self.length,
        };
        iterator.push_left_spine(self.root);
        iterator
    }
}

impl<'a, K, V, C> IntoIterator for &'a PersistentTreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentTreeMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V: PartialEq, C: Comparator<K>> PartialEq for PersistentTreeMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        if let (Some(left), Some(right)) = (&self.root, &other.root)
            && ReferenceCounter::ptr_eq(left, right)
        {
            return true;
        }
        self.iter()
            .zip(other.iter())
            .all(|((left_key, left_value), (right_key, right_value))| {
                self.comparator.compare(left_key, right_key) == Ordering::Equal
                    && left_value == right_value
            })
    }
}

impl<K, V: Eq, C: Comparator<K>> Eq for PersistentTreeMap<K, V, C> {}

impl<K: Hash, V: Hash, C> Hash for PersistentTreeMap<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for (key, value) in self {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for PersistentTreeMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn is_red<K, V>(node: Option<&Link<K, V>>) -> bool {
        node.is_some_and(|node| node.is_red())
    }

    /// Checks the red-black invariants and returns the black height.
    fn black_height<K, V>(node: Option<&Link<K, V>>) -> usize {
        let Some(node) = node else {
            return 1;
        };
        if node.is_red() {
            assert!(
                !is_red(node.left.as_ref()) && !is_red(node.right.as_ref()),
                "red node with a red child"
            );
        }
        let left = black_height(node.left.as_ref());
        let right = black_height(node.right.as_ref());
        assert_eq!(left, right, "unequal black height");
        left + usize::from(node.is_black())
    }

    fn assert_balanced<K: Ord, V>(map: &PersistentTreeMap<K, V>) {
        assert!(!is_red(map.root.as_ref()), "red root");
        black_height(map.root.as_ref());
        let keys: Vec<&K> = map.keys().collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(keys.len(), map.len());
    }

    /// A fixed permutation of `0..count`.
    fn scrambled(count: u64) -> Vec<u64> {
        (0..count).map(|index| (index * 7919) % count).collect()
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(10)]
    #[case(257)]
    #[case(1000)]
    fn test_insert_keeps_invariants(#[case] count: u64) {
        let map = scrambled(count)
            .into_iter()
            .fold(PersistentTreeMap::new(), |map, key| {
                let map = map.insert(key, key * 2);
                assert_balanced(&map);
                map
            });
        assert_eq!(map.len(), count as usize);
        assert_eq!(map.get(&(count - 1)), Some(&((count - 1) * 2)));
    }

    #[rstest]
    #[case(1)]
    #[case(10)]
    #[case(257)]
    #[case(1000)]
    fn test_remove_keeps_invariants(#[case] count: u64) {
        let mut map: PersistentTreeMap<u64, u64> = (0..count).map(|key| (key, key)).collect();
        for (removed, key) in scrambled(count).into_iter().rev().enumerate() {
            map = map.remove(&key);
            assert_balanced(&map);
            assert_eq!(map.len(), count as usize - removed - 1);
            assert!(!map.contains_key(&key));
        }
        assert!(map.root.is_none());
    }

    #[rstest]
    fn test_equal_insert_shares_tree() {
        let map: PersistentTreeMap<i32, &str> = [(1, "a"), (2, "b")].into_iter().collect();
        let same = map.insert(2, "b");
        let (Some(before), Some(after)) = (&map.root, &same.root) else {
            panic!("both maps have roots");
        };
        assert!(ReferenceCounter::ptr_eq(before, after));
    }

    #[rstest]
    fn test_absent_remove_shares_tree() {
        let map: PersistentTreeMap<i32, i32> = (0..20).map(|key| (key, key)).collect();
        let same = map.remove(&100);
        let (Some(before), Some(after)) = (&map.root, &same.root) else {
            panic!("both maps have roots");
        };
        assert!(ReferenceCounter::ptr_eq(before, after));
        assert_eq!(same.len(), 20);
    }

    #[rstest]
    fn test_replace_keeps_length_and_source() {
        let map: PersistentTreeMap<i32, i32> = (0..50).map(|key| (key, key)).collect();
        let updated = map.insert(25, -25);
        assert_eq!(updated.len(), 50);
        assert_eq!(updated.get(&25), Some(&-25));
        assert_eq!(map.get(&25), Some(&25));
        assert_balanced(&updated);
    }

    #[rstest]
    fn test_iteration_both_directions() {
        let map: PersistentTreeMap<i32, ()> = scrambled(64)
            .into_iter()
            .map(|key| (key as i32, ()))
            .collect();
        let ascending: Vec<i32> = map.keys().copied().collect();
        let descending: Vec<i32> = map.iter_rev().map(|(key, _)| *key).collect();
        assert_eq!(ascending, (0..64).collect::<Vec<_>>());
        assert_eq!(descending, (0..64).rev().collect::<Vec<_>>());
        assert_eq!(map.iter().len(), 64);
    }

    #[rstest]
    #[case(10..20, (10..20).collect())]
    #[case(10..=20, (10..=20).collect())]
    #[case(95.., (95..100).collect())]
    #[case(..3, vec![0, 1, 2])]
    #[case(50..50, vec![])]
    fn test_range<R: RangeBounds<i32> + Clone>(#[case] range: R, #[case] expected: Vec<i32>) {
        let map: PersistentTreeMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
        let keys: Vec<i32> = map.range(range.clone()).map(|(key, _)| *key).collect();
        assert_eq!(keys, expected);

        let reversed: Vec<i32> = map.range_rev(range).map(|(key, _)| *key).collect();
        assert_eq!(reversed, expected.into_iter().rev().collect::<Vec<_>>());
    }

    #[rstest]
    fn test_range_with_excluded_start() {
        let map: PersistentTreeMap<i32, i32> = (0..10).map(|key| (key * 2, key)).collect();
        let keys: Vec<i32> = map
            .range((Bound::Excluded(4), Bound::Included(10)))
            .map(|(key, _)| *key)
            .collect();
        assert_eq!(keys, vec![6, 8, 10]);
    }

    #[rstest]
    fn test_custom_comparator_orders_and_finds() {
        let by_length = FnComparator::new(|left: &String, right: &String| {
            left.len().cmp(&right.len()).then_with(|| left.cmp(right))
        });
        let map = PersistentTreeMap::with_comparator(by_length)
            .insert("ccc".to_string(), 3)
            .insert("a".to_string(), 1)
            .insert("bb".to_string(), 2);

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "bb", "ccc"]);
        assert_eq!(map.get(&"bb".to_string()), Some(&2));
        assert_eq!(map.remove(&"a".to_string()).len(), 2);
    }

    #[rstest]
    fn test_min_max_and_entry_at() {
        let map: PersistentTreeMap<i32, char> = [(5, 'e'), (1, 'a'), (9, 'i')].into_iter().collect();
        assert_eq!(map.min(), Some((&1, &'a')));
        assert_eq!(map.max(), Some((&9, &'i')));
        assert_eq!(map.entry_at(&5), Some((&5, &'e')));
        assert_eq!(map.get_or(&7, &'?'), &'?');

        let empty: PersistentTreeMap<i32, char> = PersistentTreeMap::new();
        assert_eq!(empty.min(), None);
        assert_eq!(empty.max(), None);
    }

    #[rstest]
    fn test_owned_iteration() {
        let map: PersistentTreeMap<i32, String> = (0..40).map(|key| (key, key.to_string())).collect();
        let entries: Vec<(i32, String)> = map.clone().into_iter().collect();
        assert_eq!(entries.len(), 40);
        assert_eq!(entries[39], (39, "39".to_string()));
        assert_eq!(map.len(), 40);
    }

    #[rstest]
    fn test_debug_lists_entries_in_order() {
        let map: PersistentTreeMap<i32, &str> = [(2, "b"), (1, "a")].into_iter().collect();
        assert_eq!(format!("{map:?}"), r#"{1: "a", 2: "b"}"#);
    }
}
