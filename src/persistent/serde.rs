//! `Serialize` / `Deserialize` for the persistent collections.
//!
//! Vectors, subvectors and sets serialize as sequences; maps serialize as
//! maps. Hash collections and vectors are rebuilt through a transient.
//!
//! The nil entry of a [`PersistentHashMap`] has no map-key representation, so
//! serializing a map that holds one fails.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use ::serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use ::serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{
    Comparator, PersistentHashMap, PersistentHashSet, PersistentTreeMap, PersistentTreeSet,
    PersistentVector, Subvector, TransientHashMap, TransientHashSet, TransientVector,
};

// =============================================================================
// PersistentVector / Subvector
// =============================================================================

impl<T: Serialize> Serialize for PersistentVector<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self)
    }
}

impl<T: Serialize> Serialize for Subvector<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

struct PersistentVectorVisitor<T> {
    marker: PhantomData<T>,
}

impl<'de, T> Visitor<'de> for PersistentVectorVisitor<T>
where
    T: Deserialize<'de> + Clone,
{
    type Value = PersistentVector<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut transient = TransientVector::new();
        while let Some(element) = seq.next_element()? {
            transient.push_back(element);
        }
        Ok(transient.persistent())
    }
}

impl<'de, T> Deserialize<'de> for PersistentVector<T>
where
    T: Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentVectorVisitor {
            marker: PhantomData,
        })
    }
}

// =============================================================================
// PersistentHashMap / PersistentHashSet
// =============================================================================

impl<K: Serialize, V: Serialize> Serialize for PersistentHashMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.contains_nil() {
            return Err(S::Error::custom(
                "a hash map holding a nil entry cannot be serialized as a map",
            ));
        }
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct PersistentHashMapVisitor<K, V> {
    marker: PhantomData<(K, V)>,
}

impl<'de, K, V> Visitor<'de> for PersistentHashMapVisitor<K, V>
where
    K: Deserialize<'de> + Clone + Hash + Eq,
    V: Deserialize<'de> + Clone + PartialEq,
{
    type Value = PersistentHashMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut transient = TransientHashMap::new();
        while let Some((key, value)) = access.next_entry()? {
            transient.insert(key, value);
        }
        Ok(transient.persistent())
    }
}

impl<'de, K, V> Deserialize<'de> for PersistentHashMap<K, V>
where
    K: Deserialize<'de> + Clone + Hash + Eq,
    V: Deserialize<'de> + Clone + PartialEq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor {
            marker: PhantomData,
        })
    }
}

impl<T: Serialize> Serialize for PersistentHashSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self)
    }
}

struct PersistentHashSetVisitor<T> {
    marker: PhantomData<T>,
}

impl<'de, T> Visitor<'de> for PersistentHashSetVisitor<T>
where
    T: Deserialize<'de> + Clone + Hash + Eq,
{
    type Value = PersistentHashSet<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut transient = TransientHashSet::new();
        while let Some(element) = seq.next_element()? {
            transient.insert(element);
        }
        Ok(transient.persistent())
    }
}

impl<'de, T> Deserialize<'de> for PersistentHashSet<T>
where
    T: Deserialize<'de> + Clone + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentHashSetVisitor {
            marker: PhantomData,
        })
    }
}

// =============================================================================
// PersistentTreeMap / PersistentTreeSet
// =============================================================================

impl<K: Serialize, V: Serialize, C> Serialize for PersistentTreeMap<K, V, C> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self)
    }
}

struct PersistentTreeMapVisitor<K, V, C> {
    marker: PhantomData<(K, V, C)>,
}

impl<'de, K, V, C> Visitor<'de> for PersistentTreeMapVisitor<K, V, C>
where
    K: Deserialize<'de> + Clone,
    V: Deserialize<'de> + Clone + PartialEq,
    C: Comparator<K> + Clone + Default,
{
    type Value = PersistentTreeMap<K, V, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = PersistentTreeMap::with_comparator(C::default());
        while let Some((key, value)) = access.next_entry()? {
            map = map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, K, V, C> Deserialize<'de> for PersistentTreeMap<K, V, C>
where
    K: Deserialize<'de> + Clone,
    V: Deserialize<'de> + Clone + PartialEq,
    C: Comparator<K> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentTreeMapVisitor {
            marker: PhantomData,
        })
    }
}

impl<T: Serialize, C> Serialize for PersistentTreeSet<T, C> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self)
    }
}

struct PersistentTreeSetVisitor<T, C> {
    marker: PhantomData<(T, C)>,
}

impl<'de, T, C> Visitor<'de> for PersistentTreeSetVisitor<T, C>
where
    T: Deserialize<'de> + Clone,
    C: Comparator<T> + Clone + Default,
{
    type Value = PersistentTreeSet<T, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut set = PersistentTreeSet::with_comparator(C::default());
        while let Some(element) = seq.next_element()? {
            set = set.insert(element);
        }
        Ok(set)
    }
}

impl<'de, T, C> Deserialize<'de> for PersistentTreeSet<T, C>
where
    T: Deserialize<'de> + Clone,
    C: Comparator<T> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentTreeSetVisitor {
            marker: PhantomData,
        })
    }
}
