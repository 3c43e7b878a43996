//! Epoch boundaries.
//!
//! Scratch data lives for one epoch: one processed event, one frame, one
//! batch. [`TransientArena::begin_epoch`] needs `&mut` access, so it can
//! only run once every producer of the previous epoch has let go of the
//! arena. The returned [`EpochGuard`] then hands out shared access for the
//! new epoch.

use std::ops::Deref;

use crate::arena::TransientArena;

/// Shared access to a freshly reset arena for the duration of one epoch.
///
/// Created by [`TransientArena::begin_epoch`]. Derefs to the arena, so
/// producers allocate through it directly and it can be shared by
/// reference across scoped threads.
#[must_use]
pub struct EpochGuard<'a> {
    arena: &'a TransientArena,
}

impl<'a> EpochGuard<'a> {
    pub(crate) fn new(arena: &'a TransientArena) -> Self {
        tracing::trace!(arena = %arena.id(), epoch = arena.epoch(), "epoch opened");
        Self { arena }
    }

    /// The epoch this guard covers.
    pub fn epoch(&self) -> u64 {
        self.arena.epoch()
    }

    /// The underlying arena.
    pub fn arena(&self) -> &'a TransientArena {
        self.arena
    }
}

impl Deref for EpochGuard<'_> {
    type Target = TransientArena;

    fn deref(&self) -> &TransientArena {
        self.arena
    }
}

impl Drop for EpochGuard<'_> {
    fn drop(&mut self) {
        tracing::trace!(
            arena = %self.arena.id(),
            epoch = self.arena.epoch(),
            used = self.arena.used(),
            "epoch closed"
        );
    }
}
