//! # trieste
//!
//! Persistent (immutable, structurally shared) collections with transient
//! builders for efficient bulk construction.
//!
//! ## Overview
//!
//! - **Hash maps and sets**: a hash array mapped trie (HAMT) keyed by 32-bit
//!   hashes, 5 bits per level, with bitmap-indexed, array and collision nodes
//! - **Vectors**: a 32-way bit-partitioned trie with an uncommitted tail buffer,
//!   plus windowed [`Subvector`](persistent::Subvector) views
//! - **Sorted maps and sets**: a persistent red-black tree ordered by a
//!   comparator supplied at construction time
//! - **Transients**: bounded-lifetime mutable builders that edit nodes in place
//!   under an ownership token and are sealed back into persistent values
//!
//! ## Feature Flags
//!
//! - `arc`: share nodes with `Arc` instead of `Rc`
//! - `serde`: `Serialize`/`Deserialize` for every persistent collection
//! - `fxhash` / `ahash`: faster key hashing
//! - `full`: enable all optional integrations
//!
//! ## Example
//!
//! ```rust
//! use trieste::prelude::*;
//!
//! let map = PersistentHashMap::new()
//!     .insert("a".to_string(), 1)
//!     .insert("b".to_string(), 2)
//!     .remove("a");
//!
//! assert_eq!(map.len(), 1);
//! assert_eq!(map.get("a"), None);
//! assert_eq!(map.get("b"), Some(&2));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports every collection, the comparator types and the error type.
///
/// # Usage
///
/// ```rust
/// use trieste::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CollectionError, Result};
    pub use crate::persistent::*;
}

pub mod error;
pub mod persistent;

pub use error::{CollectionError, Result};
