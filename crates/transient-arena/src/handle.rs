//! Arena identities and allocation handles.
//!
//! An [`Allocation`] names a byte range of one arena in one epoch. It is
//! epoch-scoped: the `epoch` field gives O(1) staleness checks after a
//! reset without any lookup table.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`ArenaId`] allocation.
static ARENA_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for an arena.
///
/// Two arenas never share an id within a process, even if one is dropped
/// and the next maps its region at the same address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(u64);

impl ArenaId {
    /// Allocate a fresh, unique id. Thread-safe.
    pub(crate) fn next() -> Self {
        Self(ARENA_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A granted byte range `[offset, offset + len)` within an arena.
///
/// Handles are move-only: owning one is owning its bytes, which is what
/// lets [`TransientArena::bytes_mut`](crate::TransientArena::bytes_mut)
/// hand out a mutable slice without `unsafe` at the call site. Tail-growth
/// operations consume the handle and return the grown one.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Allocation {
    /// Arena that granted this range.
    pub(crate) arena: ArenaId,
    /// Arena epoch when the range was granted.
    pub(crate) epoch: u64,
    /// Byte offset from the region base.
    pub(crate) offset: usize,
    /// Length in bytes.
    pub(crate) len: usize,
}

impl Allocation {
    /// Create a new handle.
    pub(crate) fn new(arena: ArenaId, epoch: u64, offset: usize, len: usize) -> Self {
        Self {
            arena,
            epoch,
            offset,
            len,
        }
    }

    /// Byte offset from the region base.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte; equals the cursor while this is the tail.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The epoch this handle belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The arena that granted this handle.
    pub fn arena_id(&self) -> ArenaId {
        self.arena
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocation(arena={}, epoch={}, off={}, len={})",
            self.arena, self.epoch, self.offset, self.len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_accessors() {
        let id = ArenaId::next();
        let h = Allocation::new(id, 3, 100, 50);
        assert_eq!(h.arena_id(), id);
        assert_eq!(h.epoch(), 3);
        assert_eq!(h.offset(), 100);
        assert_eq!(h.len(), 50);
        assert_eq!(h.end(), 150);
        assert!(!h.is_empty());
    }

    #[test]
    fn empty_handle() {
        let h = Allocation::new(ArenaId::next(), 0, 64, 0);
        assert!(h.is_empty());
        assert_eq!(h.end(), 64);
    }

    #[test]
    fn arena_ids_are_unique() {
        let a = ArenaId::next();
        let b = ArenaId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn display_names_all_fields() {
        let id = ArenaId::next();
        let h = Allocation::new(id, 1, 8, 16);
        assert_eq!(
            h.to_string(),
            format!("Allocation(arena={id}, epoch=1, off=8, len=16)")
        );
    }
}
