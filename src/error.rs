//! Error types for collection operations.
//!
//! Lookup-with-default operations never fail. Index-taking operations and
//! pops on empty collections report a [`CollectionError`] value. Touching a
//! transient after it has been sealed is a programming error and panics with
//! the [`CollectionError::TransientSealed`] message instead of returning it.

use thiserror::Error;

/// Result type alias using [`CollectionError`].
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Errors reported by persistent and transient collections.
///
/// # Examples
///
/// ```rust
/// use trieste::CollectionError;
/// use trieste::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..3).collect();
/// assert_eq!(
///     vector.nth(5),
///     Err(CollectionError::IndexOutOfBounds { index: 5, length: 3 })
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// An index fell outside `[0, length)` (or `[0, length]` for appending forms).
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The length of the collection at the time of the call.
        length: usize,
    },

    /// A pop was attempted on an empty collection.
    #[error("cannot pop from an empty {collection}")]
    EmptyCollection {
        /// The kind of collection, e.g. `"vector"`.
        collection: &'static str,
    },

    /// A transient was used after `seal` / `persistent` invalidated its token.
    #[error("transient used after it was sealed into a persistent value")]
    TransientSealed,
}

impl CollectionError {
    /// Creates an [`IndexOutOfBounds`](Self::IndexOutOfBounds) error.
    #[must_use]
    pub const fn index_out_of_bounds(index: usize, length: usize) -> Self {
        Self::IndexOutOfBounds { index, length }
    }

    /// Creates an [`EmptyCollection`](Self::EmptyCollection) error.
    #[must_use]
    pub const fn empty(collection: &'static str) -> Self {
        Self::EmptyCollection { collection }
    }
}
