//! Ownership tokens for transient editing.
//!
//! Every transient session draws a fresh [`OwnerToken`]. Nodes created or
//! copied by that session are stamped with it and may be mutated in place by
//! the session afterwards; every other node is copied (and stamped) on first
//! touch. Tokens are compared by identity: ids come from a process-wide
//! counter and are never reused, so a token retired by sealing can never match
//! a later session.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ReferenceCounter;
use crate::error::CollectionError;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity stamp of one transient session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct OwnerToken(NonZeroU64);

impl OwnerToken {
    fn fresh() -> Self {
        let id = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    /// Numeric id, for diagnostics only.
    pub(crate) const fn id(self) -> u64 {
        self.0.get()
    }
}

/// The token slot held by a transient handle.
///
/// Live until [`seal`](Self::seal) is called; afterwards every access panics.
#[derive(Debug)]
pub(crate) struct Owner {
    token: Option<OwnerToken>,
}

impl Owner {
    /// Opens a new session with a fresh token.
    pub(crate) fn new() -> Self {
        Self {
            token: Some(OwnerToken::fresh()),
        }
    }

    /// Returns the live token.
    ///
    /// # Panics
    ///
    /// Panics if the session has been sealed.
    #[track_caller]
    pub(crate) fn token(&self) -> OwnerToken {
        match self.token {
            Some(token) => token,
            None => sealed_transient(),
        }
    }

    /// Retires the token. Returns it so the caller can log the session id.
    ///
    /// # Panics
    ///
    /// Panics if the session was already sealed.
    #[track_caller]
    pub(crate) fn seal(&mut self) -> OwnerToken {
        match self.token.take() {
            Some(token) => token,
            None => sealed_transient(),
        }
    }

    pub(crate) const fn is_sealed(&self) -> bool {
        self.token.is_none()
    }
}

#[cold]
#[track_caller]
fn sealed_transient() -> ! {
    panic!("{}", CollectionError::TransientSealed)
}

/// A node that carries an optional owner stamp.
pub(crate) trait Stamped: Clone {
    fn owner(&self) -> Option<OwnerToken>;

    fn set_owner(&mut self, token: OwnerToken);
}

/// Returns a mutable reference to `node`, copying it first unless it is
/// already owned by `token`.
///
/// A node owned by the token is only ever referenced from inside the
/// session's own tree, so `make_mut` does not copy it again.
pub(crate) fn editable<N: Stamped>(node: &mut ReferenceCounter<N>, token: OwnerToken) -> &mut N {
    if node.owner() != Some(token) {
        let mut copy = N::clone(node);
        copy.set_owner(token);
        *node = ReferenceCounter::new(copy);
    }
    ReferenceCounter::make_mut(node)
}
