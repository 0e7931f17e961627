//! Persistent (immutable) hash map based on HAMT.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map
//! that uses structural sharing for efficient operations, and
//! [`TransientHashMap`], its mutable builder.
//!
//! # Overview
//!
//! The map is a hash array mapped trie (see the `hamt` module) keyed by the
//! 32-bit hash of each key, consumed 5 bits per level.
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! # Nil Entry
//!
//! Besides its ordinary keys, a map can hold one *nil entry*: a value bound to
//! "no key at all". It lives beside the trie, is counted by [`len`], and is
//! visited first by [`entries`]. [`iter`] only walks the keyed entries.
//!
//! [`len`]: PersistentHashMap::len
//! [`entries`]: PersistentHashMap::entries
//! [`iter`]: PersistentHashMap::iter
//!
//! # Examples
//!
//! ```rust
//! use trieste::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2)
//!     .insert("three".to_string(), 3);
//!
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(map.get("two"), Some(&2));
//! assert_eq!(map.get("three"), Some(&3));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::rc::Rc;

use super::ReferenceCounter;
use super::edit::Owner;
use super::hamt::{self, Node, NodeRef};
use super::hash::hash_key;

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on HAMT.
///
/// Updates return a new map and leave the original untouched; unchanged
/// subtrees are shared between the two.
///
/// # Time Complexity
///
/// | Operation      | Complexity           |
/// |----------------|----------------------|
/// | `new`          | O(1)                 |
/// | `get`          | O(log32 N)           |
/// | `insert`       | O(log32 N)           |
/// | `remove`       | O(log32 N)           |
/// | `contains_key` | O(log32 N)           |
/// | `len`          | O(1)                 |
/// | `iter`         | O(1) to create       |
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::PersistentHashMap;
///
/// let map = PersistentHashMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
#[derive(Clone)]
pub struct PersistentHashMap<K, V> {
    /// Root node of the trie, `None` when no keyed entry exists
    root: Option<NodeRef<K, V>>,
    /// Value bound to the nil key
    nil_value: Option<V>,
    /// Number of entries, the nil entry included
    length: usize,
}

impl<K, V> PersistentHashMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            nil_value: None,
            length: 0,
        }
    }

    /// Returns the number of entries in the map, the nil entry included.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2)
    ///     .insert_nil(0);
    /// assert_eq!(map.len(), 3);
    /// ```
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

    /// Returns the value bound to the nil key, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new().insert_nil(7);
    /// assert_eq!(map.get_nil(), Some(&7));
    /// assert_eq!(map.get("anything"), None);
    /// ```
    #[inline]
    #[must_use]
    pub const fn get_nil(&self) -> Option<&V> {
        self.nil_value.as_ref()
    }

    /// Returns `true` if the nil key is bound.
    #[inline]
    #[must_use]
    pub const fn contains_nil(&self) -> bool {
        self.nil_value.is_some()
    }

    /// Returns an iterator over the keyed entries.
    ///
    /// The nil entry is not visited; use [`entries`](Self::entries) for that.
    /// Each call starts a fresh traversal from the root.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let sum: i32 = map.iter().map(|(_, value)| value).sum();
    /// assert_eq!(sum, 3);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator {
            inner: hamt::Iter::new(self.root.as_deref()),
            remaining: self.length - usize::from(self.nil_value.is_some()),
        }
    }

    /// Returns an iterator over every entry: the nil entry first (as
    /// `(None, value)`), then the keyed entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert_nil(0);
    ///
    /// let entries: Vec<_> = map.entries().collect();
    /// assert_eq!(entries[0], (None, &0));
    /// assert_eq!(entries[1], (Some(&"a".to_string()), &1));
    /// ```
    pub fn entries(&self) -> impl Iterator<Item = (Option<&K>, &V)> {
        self.nil_value
            .iter()
            .map(|value| (None, value))
            .chain(self.iter().map(|(key, value)| (Some(key), value)))
    }

    /// Returns an iterator over the keys of the keyed entries.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values of the keyed entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let sum: i32 = map.values().sum();
    /// assert_eq!(sum, 3);
    /// ```
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Folds every entry, the nil entry first, stopping as soon as `function`
    /// returns [`ControlFlow::Break`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::ControlFlow;
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    ///
    /// // Stop once three entries have been seen.
    /// let seen = map.kv_reduce(0, |count, _, _| {
    ///     if count == 3 {
    ///         ControlFlow::Break(count)
    ///     } else {
    ///         ControlFlow::Continue(count + 1)
    ///     }
    /// });
    /// assert_eq!(seen, 3);
    /// ```
    pub fn kv_reduce<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(B, Option<&K>, &V) -> ControlFlow<B, B>,
    {
        let accumulator = match &self.nil_value {
            Some(value) => match function(init, None, value) {
                ControlFlow::Continue(accumulator) => accumulator,
                ControlFlow::Break(result) => return result,
            },
            None => init,
        };

        let Some(root) = &self.root else {
            return accumulator;
        };
        match root.fold(accumulator, &mut |accumulator: B, key: &K, value: &V| {
            function(accumulator, Some(key), value)
        }) {
            ControlFlow::Continue(result) | ControlFlow::Break(result) => result,
        }
    }
}

impl<K: Hash + Eq, V> PersistentHashMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and
    /// `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and its value.
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root.as_ref()?.get(0, hash_key(key), key)
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::singleton("a".to_string(), 1);
    /// assert_eq!(map.get_or("a", &0), &1);
    /// assert_eq!(map.get_or("z", &0), &0);
    /// ```
    #[must_use]
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if the map contains the key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).is_some()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> PersistentHashMap<K, V> {
    /// Creates a map containing a single key-value pair.
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Builds a map from key-value pairs through a transient.
    ///
    /// Later pairs win over earlier ones with the same key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::from_entries([("a", 1), ("b", 2), ("a", 3)]);
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.get("a"), Some(&3));
    /// ```
    #[must_use]
    pub fn from_entries<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        let mut transient = TransientHashMap::new();
        transient.extend(entries);
        transient.persistent()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key already maps to an equal value, the returned map shares
    /// its root with `self`.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = hash_key(&key);
        let root = match &self.root {
            Some(root) => root.clone(),
            None => ReferenceCounter::new(Node::empty(None)),
        };
        let (new_root, added) = Node::insert(&root, 0, hash, key, value);

        if self
            .root
            .as_ref()
            .is_some_and(|old_root| ReferenceCounter::ptr_eq(old_root, &new_root))
        {
            return self.clone();
        }

        Self {
            root: Some(new_root),
            nil_value: self.nil_value.clone(),
            length: self.length + usize::from(added),
        }
    }

    /// Binds the nil key to `value`.
    ///
    /// No trie node is touched.
    #[must_use]
    pub fn insert_nil(&self, value: V) -> Self {
        if self.nil_value.as_ref() == Some(&value) {
            return self.clone();
        }
        Self {
            root: self.root.clone(),
            length: self.length + usize::from(self.nil_value.is_none()),
            nil_value: Some(value),
        }
    }

    /// Removes a key from the map.
    ///
    /// Returns a map sharing `self`'s root when the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(removed.len(), 1);
    /// assert_eq!(removed.get("a"), None);
    /// assert_eq!(map.len(), 2); // Original unchanged
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(root) = &self.root else {
            return self.clone();
        };
        match Node::remove(root, 0, hash_key(key), key) {
            Some(new_root) if ReferenceCounter::ptr_eq(&new_root, root) => self.clone(),
            new_root => Self {
                root: new_root,
                nil_value: self.nil_value.clone(),
                length: self.length - 1,
            },
        }
    }

    /// Unbinds the nil key.
    #[must_use]
    pub fn remove_nil(&self) -> Self {
        if self.nil_value.is_none() {
            return self.clone();
        }
        Self {
            root: self.root.clone(),
            nil_value: None,
            length: self.length - 1,
        }
    }

    /// Updates or removes a value for a key using an updater function.
    ///
    /// The updater receives `Some(&V)` if the key exists, or `None` if it
    /// doesn't. Returning `Some(V)` inserts or updates; returning `None`
    /// removes the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("count".to_string(), 10);
    ///
    /// let updated = map.update_with("count", |value| value.map(|value| value + 1));
    /// assert_eq!(updated.get("count"), Some(&11));
    ///
    /// let inserted = map.update_with("new", |value| Some(value.copied().unwrap_or(100)));
    /// assert_eq!(inserted.get("new"), Some(&100));
    ///
    /// let removed = map.update_with("count", |_| None);
    /// assert_eq!(removed.get("count"), None);
    /// ```
    #[must_use]
    pub fn update_with<Q, F>(&self, key: &Q, updater: F) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let current = self.get_key_value(key);
        match (current, updater(current.map(|(_, value)| value))) {
            (Some((existing_key, _)), Some(value)) => self.insert(existing_key.clone(), value),
            (Some(_), None) => self.remove(key),
            (None, Some(value)) => self.insert(key.to_owned(), value),
            (None, None) => self.clone(),
        }
    }

    /// Merges two maps, with entries from `other` taking precedence.
    ///
    /// The nil entry of `other`, if any, also wins.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let map2 = PersistentHashMap::new()
    ///     .insert("b".to_string(), 20)
    ///     .insert("c".to_string(), 3);
    ///
    /// let merged = map1.merge(&map2);
    ///
    /// assert_eq!(merged.get("a"), Some(&1));
    /// assert_eq!(merged.get("b"), Some(&20)); // From map2
    /// assert_eq!(merged.get("c"), Some(&3));
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut transient = self.transient();
        for (key, value) in other.entries() {
            match key {
                Some(key) => transient.insert(key.clone(), value.clone()),
                None => transient.insert_nil(value.clone()),
            };
        }
        transient.persistent()
    }

    /// Opens a transient session over this map.
    ///
    /// The transient starts out sharing every node with `self`; nodes are
    /// copied on first modification, so `self` is never affected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert(1, "one");
    /// let mut transient = map.transient();
    /// transient.insert(2, "two");
    /// transient.remove(&1);
    /// let updated = transient.persistent();
    ///
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// assert_eq!(updated.get(&1), None);
    /// assert_eq!(updated.get(&2), Some(&"two"));
    /// ```
    #[must_use]
    pub fn transient(&self) -> TransientHashMap<K, V> {
        TransientHashMap::from_parts(self.root.clone(), self.nil_value.clone(), self.length)
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the keyed entries of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    inner: hamt::Iter<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {}

/// An owning iterator over the keyed entries of a [`PersistentHashMap`].
pub struct PersistentHashMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for PersistentHashMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIntoIterator<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentHashMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        PersistentHashMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length || self.nil_value != other.nil_value {
            return false;
        }
        if let (Some(left), Some(right)) = (&self.root, &other.root)
            && ReferenceCounter::ptr_eq(left, right)
        {
            return true;
        }
        self.iter()
            .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Hash + Eq, V: Eq> Eq for PersistentHashMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.entries()).finish()
    }
}

// =============================================================================
// TransientHashMap Definition
// =============================================================================

/// A transient (temporarily mutable) hash map for efficient batch updates.
///
/// A transient owns an edit token. Trie nodes stamped with that token are
/// mutated in place; any other node is copied and stamped on first touch, so
/// the persistent map the transient was opened from never changes.
///
/// Calling [`persistent`](Self::persistent) (or [`seal`](Self::seal)) retires
/// the token and hands the node graph over to an immutable map without
/// copying. Every later call through a sealed handle panics.
///
/// `PhantomData<Rc<()>>` keeps the type `!Send` and `!Sync`, even with the
/// `arc` feature.
///
/// # Examples
///
/// ```rust
/// use trieste::persistent::TransientHashMap;
///
/// let mut transient = TransientHashMap::new();
/// for index in 0..1000 {
///     transient.insert(index, index * 2);
/// }
/// let map = transient.persistent();
///
/// assert_eq!(map.len(), 1000);
/// assert_eq!(map.get(&500), Some(&1000));
/// ```
pub struct TransientHashMap<K, V> {
    owner: Owner,
    root: Option<NodeRef<K, V>>,
    nil_value: Option<V>,
    length: usize,
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientHashMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientHashMap<String, String>: Send, Sync);

#[cfg(feature = "arc")]
mod arc_send_sync_verification_hashmap {
    use super::TransientHashMap;
    use std::sync::Arc;

    static_assertions::assert_not_impl_any!(TransientHashMap<Arc<i32>, Arc<i32>>: Send, Sync);
}

impl<K, V> TransientHashMap<K, V> {
    fn from_parts(root: Option<NodeRef<K, V>>, nil_value: Option<V>, length: usize) -> Self {
        let owner = Owner::new();
        tracing::trace!(edit = owner.token().id(), length, "opened transient hash map");
        Self {
            owner,
            root,
            nil_value,
            length,
            _marker: PhantomData,
        }
    }

    /// Creates a new empty transient map.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(None, None, 0)
    }

    /// Returns the number of entries, the nil entry included.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owner.token();
        self.length
    }

    /// Returns `true` if the transient holds no entries.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`seal`](Self::seal) has been called.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.owner.is_sealed()
    }

    /// Returns the value bound to the nil key, if any.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn get_nil(&self) -> Option<&V> {
        self.owner.token();
        self.nil_value.as_ref()
    }

    /// Binds the nil key, returning the previous nil value.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn insert_nil(&mut self, value: V) -> Option<V> {
        self.owner.token();
        let previous = self.nil_value.replace(value);
        if previous.is_none() {
            self.length += 1;
        }
        previous
    }

    /// Unbinds the nil key, returning its value.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn remove_nil(&mut self) -> Option<V> {
        self.owner.token();
        let previous = self.nil_value.take();
        if previous.is_some() {
            self.length -= 1;
        }
        previous
    }

    /// Retires the edit token and returns the finished persistent map.
    ///
    /// The handle is left empty and sealed; any further use panics.
    ///
    /// # Panics
    ///
    /// Panics if the transient has already been sealed.
    pub fn seal(&mut self) -> PersistentHashMap<K, V> {
        let token = self.owner.seal();
        tracing::trace!(edit = token.id(), length = self.length, "sealed transient hash map");
        PersistentHashMap {
            root: self.root.take(),
            nil_value: self.nil_value.take(),
            length: std::mem::take(&mut self.length),
        }
    }

    /// Converts the transient into a persistent map.
    ///
    /// No node is copied.
    ///
    /// # Panics
    ///
    /// Panics if the transient has already been sealed.
    #[must_use]
    pub fn persistent(mut self) -> PersistentHashMap<K, V> {
        self.seal()
    }
}

impl<K: Hash + Eq, V> TransientHashMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.owner.token();
        let (_, value) = self.root.as_ref()?.get(0, hash_key(key), key)?;
        Some(value)
    }

    /// Returns `true` if the transient contains the key.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> TransientHashMap<K, V> {
    /// Inserts a key-value pair, returning the previous value for the key.
    ///
    /// Binding a key to a value equal to its current one touches no node.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trieste::persistent::TransientHashMap;
    ///
    /// let mut transient = TransientHashMap::new();
    /// assert_eq!(transient.insert("a", 1), None);
    /// assert_eq!(transient.insert("a", 2), Some(1));
    /// assert_eq!(transient.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let token = self.owner.token();
        let hash = hash_key(&key);

        if let Some(root) = &self.root
            && let Some((_, existing)) = root.get(0, hash, &key)
            && *existing == value
        {
            return Some(value);
        }

        let root = self
            .root
            .get_or_insert_with(|| ReferenceCounter::new(Node::empty(Some(token))));
        let previous = Node::insert_mut(root, token, 0, hash, key, value);
        if previous.is_none() {
            self.length += 1;
        }
        previous
    }

    /// Removes a key, returning its value.
    ///
    /// Removing an absent key touches no node.
    ///
    /// # Panics
    ///
    /// Panics if the transient has been sealed.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let token = self.owner.token();
        let hash = hash_key(key);
        let root = self.root.as_mut()?;
        root.get(0, hash, key)?;

        let (_, value) = Node::remove_mut(root, token, 0, hash, key)?;
        if root.is_empty() {
            self.root = None;
        }
        self.length -= 1;
        Some(value)
    }
}

impl<K, V> Default for TransientHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> Extend<(K, V)> for TransientHashMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V> fmt::Debug for TransientHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientHashMap")
            .field("length", &self.length)
            .field("sealed", &self.owner.is_sealed())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// A key whose hash ignores its identity.
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct CollidingKey {
        id: u32,
        forced_hash: u32,
    }

    impl Hash for CollidingKey {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.forced_hash.hash(state);
        }
    }

    #[rstest]
    fn test_new_creates_empty() {
        let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.iter().count(), 0);
    }

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
    fn test_insert_equal_value_shares_root() {
        let map = PersistentHashMap::new().insert("key".to_string(), 1);
        let same = map.insert("key".to_string(), 1);

        let (Some(left), Some(right)) = (&map.root, &same.root) else {
            panic!("roots must exist");
        };
        assert!(ReferenceCounter::ptr_eq(left, right));
    }

    #[rstest]
    fn test_remove_absent_key_shares_root() {
        let map = PersistentHashMap::new().insert(1, 1).insert(2, 2);
        let same = map.remove(&3);

        let (Some(left), Some(right)) = (&map.root, &same.root) else {
            panic!("roots must exist");
        };
        assert!(ReferenceCounter::ptr_eq(left, right));
        assert_eq!(same.len(), 2);
    }

    #[rstest]
    fn test_removing_everything_clears_root() {
        let map = PersistentHashMap::new().insert(1, "one").remove(&1);
        assert!(map.root.is_none());
        assert!(map.is_empty());
    }

    #[rstest]
    fn test_colliding_keys_coexist() {
        let first = CollidingKey { id: 1, forced_hash: 7 };
        let second = CollidingKey { id: 2, forced_hash: 7 };
        let map = PersistentHashMap::new()
            .insert(first.clone(), "first")
            .insert(second.clone(), "second");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&first), Some(&"first"));
        assert_eq!(map.get(&second), Some(&"second"));

        let removed = map.remove(&first);
        assert_eq!(removed.get(&first), None);
        assert_eq!(removed.get(&second), Some(&"second"));
    }

    #[rstest]
    fn test_nil_entry_is_counted_and_visited_first() {
        let map = PersistentHashMap::new()
            .insert(1, "one")
            .insert_nil("nil")
            .insert(2, "two");

        assert_eq!(map.len(), 3);
        assert!(map.contains_nil());
        assert_eq!(map.iter().len(), 2);
        assert_eq!(map.entries().next(), Some((None, &"nil")));

        let without = map.remove_nil();
        assert_eq!(without.len(), 2);
        assert_eq!(without.get_nil(), None);
        assert_eq!(map.get_nil(), Some(&"nil"));
    }

    #[rstest]
    fn test_kv_reduce_visits_nil_entry() {
        let map = PersistentHashMap::new().insert(1, 10).insert(2, 20).insert_nil(5);
        let total = map.kv_reduce(0, |sum, _, value| ControlFlow::Continue(sum + value));
        assert_eq!(total, 35);
    }

    #[rstest]
    fn test_update_with_keeps_stored_key() {
        let map = PersistentHashMap::new().insert("count".to_string(), 1);
        let updated = map.update_with("count", |value| value.map(|value| value + 1));
        assert_eq!(updated.get("count"), Some(&2));
        assert_eq!(updated.len(), 1);
    }

    #[rstest]
    fn test_transient_does_not_disturb_source() {
        let map: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
        let mut transient = map.transient();
        transient.insert(0, -1);
        transient.remove(&1);
        transient.insert(500, 500);
        let updated = transient.persistent();

        assert_eq!(map.get(&0), Some(&0));
        assert_eq!(map.get(&1), Some(&1));
        assert_eq!(map.len(), 100);
        assert_eq!(updated.get(&0), Some(&-1));
        assert_eq!(updated.get(&1), None);
        assert_eq!(updated.len(), 100);
    }

    #[rstest]
    fn test_transient_remove_last_entry_clears_root() {
        let mut transient = TransientHashMap::new();
        transient.insert("a", 1);
        assert_eq!(transient.remove("a"), Some(1));
        assert_eq!(transient.remove("a"), None);
        let map = transient.persistent();
        assert!(map.root.is_none());
        assert!(map.is_empty());
    }

    #[rstest]
    fn test_transient_nil_entry() {
        let mut transient: TransientHashMap<i32, i32> = TransientHashMap::new();
        assert_eq!(transient.insert_nil(1), None);
        assert_eq!(transient.insert_nil(2), Some(1));
        assert_eq!(transient.len(), 1);
        assert_eq!(transient.remove_nil(), Some(2));
        assert!(transient.is_empty());
    }

    #[rstest]
    #[should_panic(expected = "transient used after it was sealed")]
    fn test_sealed_transient_rejects_insert() {
        let mut transient = TransientHashMap::new();
        transient.insert(1, 1);
        let _map = transient.seal();
        transient.insert(2, 2);
    }

    #[rstest]
    fn test_seal_leaves_handle_sealed() {
        let mut transient: TransientHashMap<i32, i32> = TransientHashMap::new();
        assert!(!transient.is_sealed());
        let _ = transient.seal();
        assert!(transient.is_sealed());
    }
}
