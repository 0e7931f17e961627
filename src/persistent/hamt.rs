//! Hash array mapped trie nodes.
//!
//! The trie is keyed by 32-bit hashes consumed 5 bits per level. Three node
//! kinds exist:
//!
//! - [`BitmapNode`]: a population bitmap plus a compacted slot array, one slot
//!   per set bit. A slot is either a literal entry or a child node.
//! - [`ArrayNode`]: a dense 32-way child array, used once a bitmap node would
//!   hold [`ARRAY_NODE_PROMOTE_AT`] or more slots.
//! - [`CollisionNode`]: a flat list of entries whose keys share a full hash.
//!
//! Every operation exists in a persistent form, which path-copies and reports
//! "no change" by returning the very same node reference, and in an in-place
//! form used by transients, which mutates nodes owned by the caller's
//! [`OwnerToken`] and copies everything else on first touch.

use std::borrow::Borrow;
use std::hash::Hash;
use std::ops::ControlFlow;
use std::slice;

use super::ReferenceCounter;
use super::edit::{OwnerToken, Stamped, editable};
use super::hash::hash_key;

// =============================================================================
// Constants
// =============================================================================

/// Bits of the hash consumed per trie level.
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Branching factor (2^5 = 32).
pub(crate) const BRANCHING_FACTOR: usize = 32;

/// Mask selecting one level's worth of hash bits.
const MASK: u32 = (1 << BITS_PER_LEVEL) - 1;

/// A bitmap node holding this many slots becomes an array node on the next
/// insertion into an empty position.
pub(crate) const ARRAY_NODE_PROMOTE_AT: usize = 16;

/// An array node whose population is at most this many when a child is
/// emptied is packed back into a bitmap node.
pub(crate) const ARRAY_NODE_PACK_AT: usize = 8;

#[inline]
const fn fragment(hash: u32, shift: u32) -> usize {
    (hash.wrapping_shr(shift) & MASK) as usize
}

#[inline]
const fn bitpos(hash: u32, shift: u32) -> u32 {
    1 << fragment(hash, shift)
}

#[inline]
const fn slot_index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// =============================================================================
// Node Definition
// =============================================================================

pub(crate) type NodeRef<K, V> = ReferenceCounter<Node<K, V>>;

/// A trie node.
#[derive(Clone)]
pub(crate) enum Node<K, V> {
    Bitmap(BitmapNode<K, V>),
    Array(ArrayNode<K, V>),
    Collision(CollisionNode<K, V>),
}

/// One populated position of a bitmap node.
#[derive(Clone)]
pub(crate) enum Slot<K, V> {
    Entry(K, V),
    Child(NodeRef<K, V>),
}

impl<K, V> Slot<K, V> {
    fn into_entry(self) -> Option<(K, V)> {
        match self {
            Self::Entry(key, value) => Some((key, value)),
            Self::Child(_) => None,
        }
    }
}

#[derive(Clone)]
pub(crate) struct BitmapNode<K, V> {
    owner: Option<OwnerToken>,
    bitmap: u32,
    slots: Vec<Slot<K, V>>,
}

#[derive(Clone)]
pub(crate) struct ArrayNode<K, V> {
    owner: Option<OwnerToken>,
    /// Number of non-empty children.
    count: usize,
    children: [Option<NodeRef<K, V>>; BRANCHING_FACTOR],
}

#[derive(Clone)]
pub(crate) struct CollisionNode<K, V> {
    owner: Option<OwnerToken>,
    hash: u32,
    entries: Vec<(K, V)>,
}

impl<K: Clone, V: Clone> Stamped for Node<K, V> {
    fn owner(&self) -> Option<OwnerToken> {
        match self {
            Self::Bitmap(node) => node.owner,
            Self::Array(node) => node.owner,
            Self::Collision(node) => node.owner,
        }
    }

    fn set_owner(&mut self, token: OwnerToken) {
        match self {
            Self::Bitmap(node) => node.owner = Some(token),
            Self::Array(node) => node.owner = Some(token),
            Self::Collision(node) => node.owner = Some(token),
        }
    }
}

impl<K, V> Node<K, V> {
    /// An empty bitmap node.
    pub(crate) const fn empty(owner: Option<OwnerToken>) -> Self {
        Self::Bitmap(BitmapNode {
            owner,
            bitmap: 0,
            slots: Vec::new(),
        })
    }

    /// A bitmap node holding exactly one entry.
    fn single(owner: Option<OwnerToken>, shift: u32, hash: u32, key: K, value: V) -> NodeRef<K, V> {
        ReferenceCounter::new(Self::Bitmap(BitmapNode {
            owner,
            bitmap: bitpos(hash, shift),
            slots: vec![Slot::Entry(key, value)],
        }))
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Bitmap(node) => node.bitmap == 0,
            Self::Array(node) => node.count == 0,
            Self::Collision(node) => node.entries.is_empty(),
        }
    }

    /// Looks up `key`, returning the stored key and value.
    pub(crate) fn get<Q>(&self, shift: u32, hash: u32, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut node = self;
        let mut shift = shift;

        loop {
            match node {
                Self::Bitmap(bitmap_node) => {
                    let bit = bitpos(hash, shift);
                    if bitmap_node.bitmap & bit == 0 {
                        return None;
                    }
                    match &bitmap_node.slots[slot_index(bitmap_node.bitmap, bit)] {
                        Slot::Entry(entry_key, value) => {
                            return (entry_key.borrow() == key).then_some((entry_key, value));
                        }
                        Slot::Child(child) => {
                            node = child;
                            shift += BITS_PER_LEVEL;
                        }
                    }
                }
                Self::Array(array_node) => match &array_node.children[fragment(hash, shift)] {
                    Some(child) => {
                        node = child;
                        shift += BITS_PER_LEVEL;
                    }
                    None => return None,
                },
                Self::Collision(collision_node) => {
                    if collision_node.hash != hash {
                        return None;
                    }
                    return collision_node
                        .position(key)
                        .map(|position| {
                            let (entry_key, value) = &collision_node.entries[position];
                            (entry_key, value)
                        });
                }
            }
        }
    }

    /// Depth-first fold over every entry, stopping early on `Break`.
    pub(crate) fn fold<B, F>(&self, init: B, function: &mut F) -> ControlFlow<B, B>
    where
        F: FnMut(B, &K, &V) -> ControlFlow<B, B>,
    {
        let mut accumulator = init;
        match self {
            Self::Bitmap(node) => {
                for slot in &node.slots {
                    accumulator = match slot {
                        Slot::Entry(key, value) => function(accumulator, key, value)?,
                        Slot::Child(child) => child.fold(accumulator, function)?,
                    };
                }
            }
            Self::Array(node) => {
                for child in node.children.iter().flatten() {
                    accumulator = child.fold(accumulator, function)?;
                }
            }
            Self::Collision(node) => {
                for (key, value) in &node.entries {
                    accumulator = function(accumulator, key, value)?;
                }
            }
        }
        ControlFlow::Continue(accumulator)
    }
}

impl<K, V> CollisionNode<K, V> {
    fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries
            .iter()
            .position(|(entry_key, _)| entry_key.borrow() == key)
    }
}

/// Builds the smallest subtree holding two entries with different keys.
///
/// Equal full hashes give a collision node; otherwise a bitmap node, nested as
/// deep as the two hashes share 5-bit fragments.
#[allow(clippy::too_many_arguments)]
fn create_node<K, V>(
    owner: Option<OwnerToken>,
    shift: u32,
    first_hash: u32,
    first_key: K,
    first_value: V,
    second_hash: u32,
    second_key: K,
    second_value: V,
) -> NodeRef<K, V> {
    if first_hash == second_hash {
        return ReferenceCounter::new(Node::Collision(CollisionNode {
            owner,
            hash: first_hash,
            entries: vec![(first_key, first_value), (second_key, second_value)],
        }));
    }

    let first_fragment = fragment(first_hash, shift);
    let second_fragment = fragment(second_hash, shift);

    let slots = if first_fragment == second_fragment {
        vec![Slot::Child(create_node(
            owner,
            shift + BITS_PER_LEVEL,
            first_hash,
            first_key,
            first_value,
            second_hash,
            second_key,
            second_value,
        ))]
    } else if first_fragment < second_fragment {
        vec![
            Slot::Entry(first_key, first_value),
            Slot::Entry(second_key, second_value),
        ]
    } else {
        vec![
            Slot::Entry(second_key, second_value),
            Slot::Entry(first_key, first_value),
        ]
    };

    ReferenceCounter::new(Node::Bitmap(BitmapNode {
        owner,
        bitmap: bitpos(first_hash, shift) | bitpos(second_hash, shift),
        slots,
    }))
}

/// Turns a full bitmap node into an array node that also holds a new entry.
fn promote<K: Hash, V>(
    owner: Option<OwnerToken>,
    bitmap: u32,
    slots: impl IntoIterator<Item = Slot<K, V>>,
    shift: u32,
    hash: u32,
    key: K,
    value: V,
) -> ArrayNode<K, V> {
    let child_shift = shift + BITS_PER_LEVEL;
    let mut children: [Option<NodeRef<K, V>>; BRANCHING_FACTOR] = std::array::from_fn(|_| None);
    let mut slots = slots.into_iter();

    for (position, child) in children.iter_mut().enumerate() {
        if bitmap & (1 << position) != 0 {
            *child = slots.next().map(|slot| match slot {
                Slot::Child(node) => node,
                Slot::Entry(entry_key, entry_value) => {
                    let entry_hash = hash_key(&entry_key);
                    Node::single(owner, child_shift, entry_hash, entry_key, entry_value)
                }
            });
        }
    }
    children[fragment(hash, shift)] = Some(Node::single(owner, child_shift, hash, key, value));

    let count = bitmap.count_ones() as usize + 1;
    tracing::trace!(shift, count, "promoted bitmap node to array node");

    ArrayNode {
        owner,
        count,
        children,
    }
}

impl<K: Clone, V: Clone> BitmapNode<K, V> {
    fn with_slot(&self, index: usize, slot: Slot<K, V>) -> NodeRef<K, V> {
        let mut slots = self.slots.clone();
        slots[index] = slot;
        ReferenceCounter::new(Node::Bitmap(Self {
            owner: None,
            bitmap: self.bitmap,
            slots,
        }))
    }

    fn without_slot(&self, index: usize, bit: u32) -> Option<NodeRef<K, V>> {
        if self.bitmap == bit {
            return None;
        }
        let mut slots = Vec::with_capacity(self.slots.len() - 1);
        slots.extend_from_slice(&self.slots[..index]);
        slots.extend_from_slice(&self.slots[index + 1..]);
        Some(ReferenceCounter::new(Node::Bitmap(Self {
            owner: None,
            bitmap: self.bitmap ^ bit,
            slots,
        })))
    }
}

impl<K: Clone, V: Clone> ArrayNode<K, V> {
    fn with_child(&self, index: usize, child: Option<NodeRef<K, V>>, count: usize) -> NodeRef<K, V> {
        let mut children = self.children.clone();
        children[index] = child;
        ReferenceCounter::new(Node::Array(Self {
            owner: None,
            count,
            children,
        }))
    }

    /// Compacts the remaining children into a bitmap node, leaving out `without`.
    fn pack(&self, owner: Option<OwnerToken>, without: Option<usize>) -> BitmapNode<K, V> {
        let mut bitmap = 0;
        let mut slots = Vec::with_capacity(self.count);
        for (position, child) in self.children.iter().enumerate() {
            if Some(position) == without {
                continue;
            }
            if let Some(child) = child {
                bitmap |= 1 << position;
                slots.push(Slot::Child(child.clone()));
            }
        }
        tracing::trace!(count = slots.len(), "packed array node into bitmap node");
        BitmapNode {
            owner,
            bitmap,
            slots,
        }
    }
}

// =============================================================================
// Persistent Operations
// =============================================================================

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> Node<K, V> {
    /// Returns a node that maps `key` to `value`, and whether a new entry was
    /// added.
    ///
    /// When the key is already bound to an equal value the very same node
    /// reference is returned.
    pub(crate) fn insert(
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        match this.as_ref() {
            Self::Bitmap(node) => node.insert(this, shift, hash, key, value),
            Self::Array(node) => node.insert(this, shift, hash, key, value),
            Self::Collision(node) => node.insert(this, shift, hash, key, value),
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> BitmapNode<K, V> {
    fn insert(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        let bit = bitpos(hash, shift);
        let index = slot_index(self.bitmap, bit);

        if self.bitmap & bit != 0 {
            return match &self.slots[index] {
                Slot::Child(child) => {
                    let (new_child, added) =
                        Node::insert(child, shift + BITS_PER_LEVEL, hash, key, value);
                    if ReferenceCounter::ptr_eq(&new_child, child) {
                        (this.clone(), false)
                    } else {
                        (self.with_slot(index, Slot::Child(new_child)), added)
                    }
                }
                Slot::Entry(existing_key, existing_value) if *existing_key == key => {
                    if *existing_value == value {
                        (this.clone(), false)
                    } else {
                        (
                            self.with_slot(index, Slot::Entry(existing_key.clone(), value)),
                            false,
                        )
                    }
                }
                Slot::Entry(existing_key, existing_value) => {
                    let child = create_node(
                        None,
                        shift + BITS_PER_LEVEL,
                        hash_key(existing_key),
                        existing_key.clone(),
                        existing_value.clone(),
                        hash,
                        key,
                        value,
                    );
                    (self.with_slot(index, Slot::Child(child)), true)
                }
            };
        }

        if self.slots.len() >= ARRAY_NODE_PROMOTE_AT {
            let array = promote(
                None,
                self.bitmap,
                self.slots.iter().cloned(),
                shift,
                hash,
                key,
                value,
            );
            return (ReferenceCounter::new(Node::Array(array)), true);
        }

        let mut slots = Vec::with_capacity(self.slots.len() + 1);
        slots.extend_from_slice(&self.slots[..index]);
        slots.push(Slot::Entry(key, value));
        slots.extend_from_slice(&self.slots[index..]);
        let node = Node::Bitmap(Self {
            owner: None,
            bitmap: self.bitmap | bit,
            slots,
        });
        (ReferenceCounter::new(node), true)
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> ArrayNode<K, V> {
    fn insert(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        let index = fragment(hash, shift);
        match &self.children[index] {
            None => {
                let child = Node::single(None, shift + BITS_PER_LEVEL, hash, key, value);
                (self.with_child(index, Some(child), self.count + 1), true)
            }
            Some(child) => {
                let (new_child, added) = Node::insert(child, shift + BITS_PER_LEVEL, hash, key, value);
                if ReferenceCounter::ptr_eq(&new_child, child) {
                    (this.clone(), false)
                } else {
                    (self.with_child(index, Some(new_child), self.count), added)
                }
            }
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> CollisionNode<K, V> {
    fn insert(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        if hash != self.hash {
            let nested = ReferenceCounter::new(Node::Bitmap(BitmapNode {
                owner: None,
                bitmap: bitpos(self.hash, shift),
                slots: vec![Slot::Child(this.clone())],
            }));
            return Node::insert(&nested, shift, hash, key, value);
        }

        let mut entries = self.entries.clone();
        let added = match self.position(&key) {
            Some(position) if entries[position].1 == value => return (this.clone(), false),
            Some(position) => {
                entries[position].1 = value;
                false
            }
            None => {
                entries.push((key, value));
                true
            }
        };
        let node = Node::Collision(Self {
            owner: None,
            hash: self.hash,
            entries,
        });
        (ReferenceCounter::new(node), added)
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    /// Returns a node without `key`.
    ///
    /// `None` means the node became empty and should be pruned by the caller.
    /// If the key is absent the very same node reference is returned.
    pub(crate) fn remove<Q>(this: &NodeRef<K, V>, shift: u32, hash: u32, key: &Q) -> Option<NodeRef<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match this.as_ref() {
            Self::Bitmap(node) => {
                let bit = bitpos(hash, shift);
                if node.bitmap & bit == 0 {
                    return Some(this.clone());
                }
                let index = slot_index(node.bitmap, bit);
                match &node.slots[index] {
                    Slot::Child(child) => match Self::remove(child, shift + BITS_PER_LEVEL, hash, key) {
                        Some(new_child) if ReferenceCounter::ptr_eq(&new_child, child) => Some(this.clone()),
                        Some(new_child) => Some(node.with_slot(index, Slot::Child(new_child))),
                        None => node.without_slot(index, bit),
                    },
                    Slot::Entry(entry_key, _) if entry_key.borrow() == key => node.without_slot(index, bit),
                    Slot::Entry(..) => Some(this.clone()),
                }
            }
            Self::Array(node) => {
                let index = fragment(hash, shift);
                let Some(child) = &node.children[index] else {
                    return Some(this.clone());
                };
                match Self::remove(child, shift + BITS_PER_LEVEL, hash, key) {
                    Some(new_child) if ReferenceCounter::ptr_eq(&new_child, child) => Some(this.clone()),
                    Some(new_child) => Some(node.with_child(index, Some(new_child), node.count)),
                    None if node.count == 1 => None,
                    None if node.count <= ARRAY_NODE_PACK_AT => {
                        Some(ReferenceCounter::new(Self::Bitmap(node.pack(None, Some(index)))))
                    }
                    None => Some(node.with_child(index, None, node.count - 1)),
                }
            }
            Self::Collision(node) => {
                if hash != node.hash {
                    return Some(this.clone());
                }
                match node.position(key) {
                    None => Some(this.clone()),
                    Some(_) if node.entries.len() == 1 => None,
                    Some(position) => {
                        let mut entries = node.entries.clone();
                        entries.remove(position);
                        Some(ReferenceCounter::new(Self::Collision(CollisionNode {
                            owner: None,
                            hash: node.hash,
                            entries,
                        })))
                    }
                }
            }
        }
    }
}

// =============================================================================
// In-place Operations
// =============================================================================

impl<K: Clone + Hash + Eq, V: Clone> Node<K, V> {
    /// Binds `key` to `value` in place, returning the previous value.
    ///
    /// Nodes not owned by `token` are copied and stamped before mutation.
    pub(crate) fn insert_mut(
        slot: &mut NodeRef<K, V>,
        token: OwnerToken,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> Option<V> {
        if let Self::Collision(collision) = slot.as_ref()
            && collision.hash != hash
        {
            let nested = Self::Bitmap(BitmapNode {
                owner: Some(token),
                bitmap: bitpos(collision.hash, shift),
                slots: vec![Slot::Child(slot.clone())],
            });
            *slot = ReferenceCounter::new(nested);
        }

        if let Self::Bitmap(bitmap_node) = slot.as_ref()
            && bitmap_node.bitmap & bitpos(hash, shift) == 0
            && bitmap_node.slots.len() >= ARRAY_NODE_PROMOTE_AT
        {
            let array = promote(
                Some(token),
                bitmap_node.bitmap,
                bitmap_node.slots.iter().cloned(),
                shift,
                hash,
                key,
                value,
            );
            *slot = ReferenceCounter::new(Self::Array(array));
            return None;
        }

        match editable(slot, token) {
            Self::Bitmap(node) => {
                let bit = bitpos(hash, shift);
                let index = slot_index(node.bitmap, bit);

                if node.bitmap & bit == 0 {
                    node.slots.insert(index, Slot::Entry(key, value));
                    node.bitmap |= bit;
                    return None;
                }

                if let Slot::Child(child) = &mut node.slots[index] {
                    return Self::insert_mut(child, token, shift + BITS_PER_LEVEL, hash, key, value);
                }

                if let Slot::Entry(existing_key, existing_value) = &mut node.slots[index]
                    && *existing_key == key
                {
                    return Some(std::mem::replace(existing_value, value));
                }

                if let Some((existing_key, existing_value)) = node.slots.remove(index).into_entry() {
                    let child = create_node(
                        Some(token),
                        shift + BITS_PER_LEVEL,
                        hash_key(&existing_key),
                        existing_key,
                        existing_value,
                        hash,
                        key,
                        value,
                    );
                    node.slots.insert(index, Slot::Child(child));
                }
                None
            }
            Self::Array(node) => {
                let index = fragment(hash, shift);
                if let Some(child) = &mut node.children[index] {
                    return Self::insert_mut(child, token, shift + BITS_PER_LEVEL, hash, key, value);
                }
                node.children[index] = Some(Self::single(
                    Some(token),
                    shift + BITS_PER_LEVEL,
                    hash,
                    key,
                    value,
                ));
                node.count += 1;
                None
            }
            Self::Collision(node) => match node.position(&key) {
                Some(position) => Some(std::mem::replace(&mut node.entries[position].1, value)),
                None => {
                    node.entries.push((key, value));
                    None
                }
            },
        }
    }

    /// Removes `key` in place, returning the removed entry.
    ///
    /// The caller must have checked that the key is present. A node left
    /// empty is reported through [`is_empty`](Self::is_empty) so that its
    /// parent can prune it.
    pub(crate) fn remove_mut<Q>(
        slot: &mut NodeRef<K, V>,
        token: OwnerToken,
        shift: u32,
        hash: u32,
        key: &Q,
    ) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let removed = match editable(slot, token) {
            Self::Bitmap(node) => {
                let bit = bitpos(hash, shift);
                if node.bitmap & bit == 0 {
                    return None;
                }
                let index = slot_index(node.bitmap, bit);

                if let Slot::Entry(entry_key, _) = &node.slots[index] {
                    if entry_key.borrow() != key {
                        return None;
                    }
                    node.bitmap ^= bit;
                    return node.slots.remove(index).into_entry();
                }

                let Slot::Child(child) = &mut node.slots[index] else {
                    return None;
                };
                let removed = Self::remove_mut(child, token, shift + BITS_PER_LEVEL, hash, key)?;
                if child.is_empty() {
                    node.slots.remove(index);
                    node.bitmap ^= bit;
                }
                removed
            }
            Self::Array(node) => {
                let index = fragment(hash, shift);
                let child = node.children[index].as_mut()?;
                let removed = Self::remove_mut(child, token, shift + BITS_PER_LEVEL, hash, key)?;
                if child.is_empty() {
                    node.children[index] = None;
                    node.count -= 1;
                }
                removed
            }
            Self::Collision(node) => {
                let position = node.position(key)?;
                node.entries.remove(position)
            }
        };

        if let Self::Array(node) = slot.as_ref()
            && node.count < ARRAY_NODE_PACK_AT
        {
            let packed = node.pack(Some(token), None);
            *slot = ReferenceCounter::new(Self::Bitmap(packed));
        }

        Some(removed)
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

enum Frame<'a, K, V> {
    Slots(slice::Iter<'a, Slot<K, V>>),
    Children(slice::Iter<'a, Option<NodeRef<K, V>>>),
    Entries(slice::Iter<'a, (K, V)>),
}

impl<'a, K, V> Frame<'a, K, V> {
    fn of(node: &'a Node<K, V>) -> Self {
        match node {
            Node::Bitmap(node) => Self::Slots(node.slots.iter()),
            Node::Array(node) => Self::Children(node.children.iter()),
            Node::Collision(node) => Self::Entries(node.entries.iter()),
        }
    }
}

enum Step<'a, K, V> {
    Yield(&'a K, &'a V),
    Descend(&'a Node<K, V>),
    Skip,
    Pop,
}

/// Lazy depth-first traversal over the entries of a trie.
///
/// Holds one frame per level currently being walked, so it resumes in the
/// middle of a node once a child subtree is exhausted.
pub(crate) struct Iter<'a, K, V> {
    stack: Vec<Frame<'a, K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(root: Option<&'a Node<K, V>>) -> Self {
        Self {
            stack: root.map(Frame::of).into_iter().collect(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match self.stack.last_mut()? {
                Frame::Slots(slots) => match slots.next() {
                    Some(Slot::Entry(key, value)) => Step::Yield(key, value),
                    Some(Slot::Child(child)) => Step::Descend(child),
                    None => Step::Pop,
                },
                Frame::Children(children) => match children.next() {
                    Some(Some(child)) => Step::Descend(child),
                    Some(None) => Step::Skip,
                    None => Step::Pop,
                },
                Frame::Entries(entries) => match entries.next() {
                    Some((key, value)) => Step::Yield(key, value),
                    None => Step::Pop,
                },
            };

            match step {
                Step::Yield(key, value) => return Some((key, value)),
                Step::Descend(child) => self.stack.push(Frame::of(child)),
                Step::Skip => {}
                Step::Pop => {
                    self.stack.pop();
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
