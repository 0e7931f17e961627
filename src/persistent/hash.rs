//! Key hashing for the hash array mapped trie.
//!
//! Keys are hashed with a deterministic hasher selected by feature flag and
//! folded to 32 bits; the trie consumes the result 5 bits per level.

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

#[cfg(feature = "fxhash")]
type KeyHasher = rustc_hash::FxHasher;

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
type KeyHasher = ahash::AHasher;

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
type KeyHasher = std::collections::hash_map::DefaultHasher;

/// Computes the 32-bit trie hash of a key.
///
/// Equal keys always produce equal hashes within one build of the crate.
#[inline]
pub(crate) fn hash_key<K: Hash + ?Sized>(key: &K) -> u32 {
    let wide = BuildHasherDefault::<KeyHasher>::default().hash_one(key);
    #[allow(clippy::cast_possible_truncation)]
    let folded = (wide ^ (wide >> 32)) as u32;
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_key("alpha"), hash_key("alpha"));
        assert_eq!(hash_key(&42_u64), hash_key(&42_u64));
    }

    #[rstest]
    fn test_borrowed_and_owned_forms_agree() {
        let owned = "key".to_string();
        assert_eq!(hash_key(&owned), hash_key("key"));
    }
}
