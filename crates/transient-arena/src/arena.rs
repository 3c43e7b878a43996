//! The transient arena.
//!
//! [`TransientArena`] is a bump allocator over one fixed mapped region. Any
//! number of threads may allocate through `&self`; the tail-growth
//! operations ([`expand`](TransientArena::expand),
//! [`resize`](TransientArena::resize)) are valid only for the current tail
//! allocation and reject anything else; [`reset`](TransientArena::reset)
//! takes `&mut self`, so it can never race an allocation.
//!
//! There is no per-allocation free. Memory is reclaimed wholesale by
//! `reset`, which rewinds the cursor without unmapping or zeroing.

use std::fmt;
use std::mem;
use std::ops::Range;
use std::ptr::NonNull;

use crate::config::{ArenaConfig, OverflowPolicy};
use crate::cursor::Cursor;
use crate::epoch::EpochGuard;
use crate::error::ArenaError;
use crate::handle::{Allocation, ArenaId};
use crate::raw::Region;
use crate::usage::ArenaUsage;

/// Fixed-capacity, lock-free bump arena for short-lived scratch data.
///
/// Owned by the composition root and passed by reference to every
/// consumer. Allocation through `&self` is lock-free: the aligned path
/// retries a compare-and-swap, the unaligned path is a single `fetch_add`.
///
/// # Example
///
/// ```
/// use transient_arena::{ArenaConfig, OverflowPolicy, TransientArena};
///
/// let config = ArenaConfig::new(10_000).with_overflow_policy(OverflowPolicy::Propagate);
/// let arena = TransientArena::new(config).unwrap();
/// let a = arena.allocate_unaligned(100).unwrap();
/// let b = arena.allocate_unaligned(50).unwrap();
/// assert_eq!(b.offset(), a.end());
/// let b = arena.resize(b, 200).unwrap();
/// assert_eq!(arena.used(), 300);
/// ```
pub struct TransientArena {
    id: ArenaId,
    region: Region,
    cursor: Cursor,
    /// Incremented by every reset. Handles from older epochs are stale.
    epoch: u64,
    /// Highest cursor value seen at a reset.
    high_water: usize,
    policy: OverflowPolicy,
    label: &'static str,
}

// Compile-time assertion: the arena is shared across allocating threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TransientArena>();
};

impl TransientArena {
    /// Reserve the region and create an empty arena.
    ///
    /// The requested size is rounded up to a whole number of pages and one
    /// inaccessible guard page is mapped after it. Fails with
    /// [`ArenaError::ReservationFailed`] if the OS refuses the mapping;
    /// this is never subject to the overflow policy.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let region = Region::reserve(config.requested_size)?;
        let arena = Self {
            id: ArenaId::next(),
            cursor: Cursor::new(region.capacity()),
            region,
            epoch: 0,
            high_water: 0,
            policy: config.overflow_policy,
            label: config.label,
        };
        tracing::debug!(
            arena = %arena.id,
            label = arena.label,
            requested = config.requested_size,
            capacity = arena.capacity(),
            page_size = arena.page_size(),
            policy = ?arena.policy,
            "arena region reserved"
        );
        Ok(arena)
    }

    /// Shorthand for [`new`](Self::new) with a default config of the given size.
    pub fn with_capacity(requested_size: usize) -> Result<Self, ArenaError> {
        Self::new(ArenaConfig::new(requested_size))
    }

    /// Allocate `size` bytes at an address that is a multiple of `align`.
    ///
    /// `align` must be a power of two; this is checked in debug builds only.
    pub fn allocate(&self, align: usize, size: usize) -> Result<Allocation, ArenaError> {
        debug_assert!(
            align.is_power_of_two(),
            "alignment {align} is not a power of two"
        );
        match self.cursor.bump_aligned(self.base_addr(), align, size) {
            Ok(offset) => Ok(self.grant(offset, size)),
            Err(err) => Err(self.violation(err)),
        }
    }

    /// Allocate `size` bytes directly at the cursor, with no alignment.
    pub fn allocate_unaligned(&self, size: usize) -> Result<Allocation, ArenaError> {
        match self.cursor.bump(size) {
            Ok(offset) => Ok(self.grant(offset, size)),
            Err(err) => Err(self.violation(err)),
        }
    }

    /// Allocate room for `count` values of `T`, aligned for `T`.
    pub fn allocate_list<T>(&self, count: usize) -> Result<Allocation, ArenaError> {
        let elem_size = mem::size_of::<T>();
        let size = elem_size.checked_mul(count).ok_or_else(|| {
            self.violation(ArenaError::LayoutOverflow { count, elem_size })
        })?;
        self.allocate(mem::align_of::<T>(), size)
    }

    /// Grow the tail allocation by `increment` bytes in place.
    ///
    /// With `None`, behaves exactly like
    /// [`allocate_unaligned(increment)`](Self::allocate_unaligned) and the
    /// result becomes the new tail. With `Some(tail)`, `tail` must still be
    /// the most recent allocation; otherwise the call fails with
    /// [`ArenaError::NotTail`] and the handle is consumed.
    ///
    /// An unaligned allocation rejected for overflow on another thread
    /// briefly moves the cursor past the tail before rolling it back; a
    /// tail-growth call landing in that window also fails with `NotTail`.
    pub fn expand(
        &self,
        tail: Option<Allocation>,
        increment: usize,
    ) -> Result<Allocation, ArenaError> {
        let Some(mut tail) = tail else {
            return self.allocate_unaligned(increment);
        };
        self.validate(&tail)?;
        let new_len = match tail.len.checked_add(increment) {
            Some(len) => len,
            None => {
                return Err(self.violation(ArenaError::CapacityExceeded {
                    requested: increment,
                    used: self.used(),
                    capacity: self.capacity(),
                }))
            }
        };
        self.resize_in_place(&mut tail, new_len)?;
        Ok(tail)
    }

    /// Grow or shrink the tail allocation to `new_size` bytes in place.
    ///
    /// The start offset never moves, so shrinking can never release bytes
    /// that belong to an earlier allocation. `new_size == 0` is valid.
    /// Like [`expand`](Self::expand), it can fail spuriously with `NotTail`
    /// while a concurrent rejected unaligned allocation is rolled back.
    pub fn resize(&self, tail: Allocation, new_size: usize) -> Result<Allocation, ArenaError> {
        let mut tail = tail;
        self.resize_in_place(&mut tail, new_size)?;
        Ok(tail)
    }

    /// Resize `tail` without consuming it; on error the handle is untouched.
    pub(crate) fn resize_in_place(
        &self,
        tail: &mut Allocation,
        new_size: usize,
    ) -> Result<(), ArenaError> {
        self.validate(tail)?;
        self.cursor
            .resize_tail(tail.offset, tail.len, new_size)
            .map_err(|err| self.violation(err))?;
        tail.len = new_size;
        Ok(())
    }

    /// Whether `alloc` is this arena's current tail in the current epoch.
    pub fn is_tail(&self, alloc: &Allocation) -> bool {
        alloc.arena == self.id && alloc.epoch == self.epoch && alloc.end() == self.used()
    }

    /// Rewind the cursor to zero and start a new epoch.
    ///
    /// Memory is neither unmapped nor zeroed: the next allocations see
    /// whatever the previous epoch left behind. All handles issued before
    /// the reset are stale from now on.
    pub fn reset(&mut self) {
        let used = self.cursor.load();
        self.high_water = self.high_water.max(used);
        self.cursor.rewind();
        self.epoch += 1;
        tracing::trace!(
            arena = %self.id,
            label = self.label,
            released = used,
            epoch = self.epoch,
            "arena reset"
        );
    }

    /// Reset the arena and open an epoch shared by this event's producers.
    pub fn begin_epoch(&mut self) -> EpochGuard<'_> {
        self.reset();
        EpochGuard::new(self)
    }

    /// Raw address of `alloc`'s first byte.
    pub fn as_ptr(&self, alloc: &Allocation) -> Result<NonNull<u8>, ArenaError> {
        self.validate(alloc)?;
        Ok(self.region.at(alloc.offset))
    }

    /// Mutable view of the bytes owned by `alloc`.
    ///
    /// Contents are unspecified: zero on first use of the region, stale
    /// data from earlier epochs after a reset.
    pub fn bytes_mut<'a>(&'a self, alloc: &'a mut Allocation) -> Result<&'a mut [u8], ArenaError> {
        self.validate(alloc)?;
        Ok(self.region.bytes_mut(alloc))
    }

    /// Identity of this arena.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// The configured log label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The configured violation policy.
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Usable capacity in bytes (a page multiple).
    pub fn capacity(&self) -> usize {
        self.cursor.capacity()
    }

    /// Bytes currently handed out, including alignment padding.
    pub fn used(&self) -> usize {
        self.cursor.load()
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.capacity().saturating_sub(self.used())
    }

    /// Current epoch: the number of resets so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Page size the capacity was rounded to.
    pub fn page_size(&self) -> usize {
        self.region.page_size()
    }

    /// Address of the region's first byte.
    pub fn base_addr(&self) -> usize {
        self.region.base().as_ptr() as usize
    }

    /// Address range of the inaccessible guard page.
    pub fn guard_range(&self) -> Range<usize> {
        self.region.guard_range()
    }

    /// Point-in-time usage figures.
    pub fn usage(&self) -> ArenaUsage {
        let used = self.used();
        ArenaUsage {
            capacity: self.capacity(),
            used,
            remaining: self.capacity().saturating_sub(used),
            high_water: self.high_water.max(used),
            epoch: self.epoch,
        }
    }

    /// Pointer `offset` bytes past the base. `offset` must come from a
    /// handle validated against this arena.
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        self.region.at(offset)
    }

    fn grant(&self, offset: usize, len: usize) -> Allocation {
        Allocation::new(self.id, self.epoch, offset, len)
    }

    /// Check that `alloc` was issued by this arena in the current epoch.
    fn validate(&self, alloc: &Allocation) -> Result<(), ArenaError> {
        if alloc.arena != self.id {
            return Err(self.violation(ArenaError::ForeignHandle {
                handle_arena: alloc.arena,
                arena: self.id,
            }));
        }
        if alloc.epoch != self.epoch {
            return Err(self.violation(ArenaError::StaleHandle {
                handle_epoch: alloc.epoch,
                current_epoch: self.epoch,
            }));
        }
        Ok(())
    }

    /// Apply the overflow policy to a caller defect.
    pub(crate) fn violation(&self, err: ArenaError) -> ArenaError {
        match self.policy {
            OverflowPolicy::Abort => {
                tracing::error!(
                    arena = %self.id,
                    label = self.label,
                    error = %err,
                    "fatal arena violation"
                );
                eprintln!("{}: fatal error: {err}", self.label);
                std::process::abort()
            }
            OverflowPolicy::Propagate => {
                tracing::warn!(
                    arena = %self.id,
                    label = self.label,
                    error = %err,
                    "arena violation"
                );
                err
            }
        }
    }
}

impl fmt::Debug for TransientArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransientArena")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("epoch", &self.epoch)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::page_size;

    fn arena(size: usize) -> TransientArena {
        TransientArena::new(ArenaConfig::new(size).with_overflow_policy(OverflowPolicy::Propagate))
            .unwrap()
    }

    #[test]
    fn capacity_rounds_up_to_pages() {
        let page = page_size();
        let a = arena(10_000);
        assert_eq!(a.capacity(), 10_000usize.div_ceil(page) * page);
        assert_eq!(a.used(), 0);
        assert_eq!(a.epoch(), 0);
    }

    #[test]
    fn aligned_allocation_is_aligned() {
        let a = arena(4096);
        let _pad = a.allocate_unaligned(3).unwrap();
        for align in [1, 2, 8, 64, 256] {
            let alloc = a.allocate(align, 10).unwrap();
            let addr = a.as_ptr(&alloc).unwrap().as_ptr() as usize;
            assert_eq!(addr % align, 0, "align {align}");
        }
    }

    #[test]
    fn list_allocation_matches_element_layout() {
        let a = arena(4096);
        let _pad = a.allocate_unaligned(1).unwrap();
        let list = a.allocate_list::<u64>(10).unwrap();
        assert_eq!(list.len(), 80);
        assert_eq!(list.offset() % mem::align_of::<u64>(), 0);
    }

    #[test]
    fn list_allocation_overflow_is_layout_error() {
        let a = arena(4096);
        let err = a.allocate_list::<u64>(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            ArenaError::LayoutOverflow {
                count: usize::MAX,
                elem_size: 8
            }
        );
        assert_eq!(a.used(), 0);
    }

    #[test]
    fn expand_without_prior_allocates() {
        let a = arena(4096);
        let _first = a.allocate_unaligned(10).unwrap();
        let tail = a.expand(None, 20).unwrap();
        assert_eq!(tail.offset(), 10);
        assert_eq!(tail.len(), 20);
        assert!(a.is_tail(&tail));
    }

    #[test]
    fn expand_grows_tail_in_place() {
        let a = arena(4096);
        let tail = a.expand(None, 8).unwrap();
        let tail = a.expand(Some(tail), 8).unwrap();
        let tail = a.expand(Some(tail), 16).unwrap();
        assert_eq!(tail.offset(), 0);
        assert_eq!(tail.len(), 32);
        assert_eq!(a.used(), 32);
    }

    #[test]
    fn expand_of_non_tail_rejected() {
        let a = arena(4096);
        let first = a.allocate_unaligned(10).unwrap();
        let _second = a.allocate_unaligned(10).unwrap();
        let err = a.expand(Some(first), 5).unwrap_err();
        assert_eq!(
            err,
            ArenaError::NotTail {
                expected_end: 10,
                used: 20
            }
        );
        assert_eq!(a.used(), 20);
    }

    #[test]
    fn expand_past_capacity_reports_figures() {
        let a = arena(4096);
        let _head = a.allocate_unaligned(1000).unwrap();
        let tail = a.allocate_unaligned(3000).unwrap();
        let err = a.expand(Some(tail), 200).unwrap_err();
        assert_eq!(
            err,
            ArenaError::CapacityExceeded {
                requested: 200,
                used: 4000,
                capacity: 4096
            }
        );
        assert_eq!(err.available(), Some(96));
        assert_eq!(a.used(), 4000);
    }

    #[test]
    fn expand_with_overflowing_increment_is_rejected() {
        let a = arena(4096);
        let tail = a.allocate_unaligned(16).unwrap();
        let err = a.expand(Some(tail), usize::MAX).unwrap_err();
        assert_eq!(
            err,
            ArenaError::CapacityExceeded {
                requested: usize::MAX,
                used: 16,
                capacity: 4096
            }
        );
        assert_eq!(a.used(), 16);
    }

    #[test]
    fn expand_checks_handle_before_increment() {
        let a = arena(4096);
        let b = arena(4096);
        let foreign = b.allocate_unaligned(16).unwrap();
        assert!(matches!(
            a.expand(Some(foreign), usize::MAX),
            Err(ArenaError::ForeignHandle { .. })
        ));

        let mut c = arena(4096);
        let stale = c.allocate_unaligned(16).unwrap();
        c.reset();
        assert!(matches!(
            c.expand(Some(stale), usize::MAX),
            Err(ArenaError::StaleHandle { .. })
        ));
    }

    #[test]
    fn resize_to_zero_leaves_empty_tail() {
        let a = arena(4096);
        let _head = a.allocate_unaligned(40).unwrap();
        let tail = a.allocate_unaligned(60).unwrap();
        let tail = a.resize(tail, 0).unwrap();
        assert!(tail.is_empty());
        assert_eq!(tail.offset(), 40);
        assert_eq!(a.used(), 40);
        assert!(a.is_tail(&tail));
        let next = a.allocate_unaligned(4).unwrap();
        assert_eq!(next.offset(), 40);
    }

    #[test]
    fn reset_starts_new_epoch_and_reuses_base() {
        let mut a = arena(4096);
        let first = a.allocate_unaligned(16).unwrap();
        let first_ptr = a.as_ptr(&first).unwrap();
        let _ = a.allocate_unaligned(100).unwrap();
        a.reset();
        assert_eq!(a.used(), 0);
        assert_eq!(a.epoch(), 1);

        let again = a.allocate_unaligned(16).unwrap();
        assert_eq!(a.as_ptr(&again).unwrap(), first_ptr);

        let err = a.as_ptr(&first).unwrap_err();
        assert_eq!(
            err,
            ArenaError::StaleHandle {
                handle_epoch: 0,
                current_epoch: 1
            }
        );
    }

    #[test]
    fn foreign_handle_rejected() {
        let a = arena(4096);
        let b = arena(4096);
        let alloc = a.allocate_unaligned(8).unwrap();
        let err = b.resize(alloc, 16).unwrap_err();
        assert!(matches!(err, ArenaError::ForeignHandle { .. }));
        assert_eq!(b.used(), 0);
    }

    #[test]
    fn bytes_mut_reads_back_writes() {
        let a = arena(4096);
        let mut one = a.allocate_unaligned(4).unwrap();
        let mut two = a.allocate_unaligned(4).unwrap();
        a.bytes_mut(&mut one).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        a.bytes_mut(&mut two).unwrap().copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(a.bytes_mut(&mut one).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(a.bytes_mut(&mut two).unwrap(), &[5, 6, 7, 8]);
    }

    #[test]
    fn reset_does_not_zero_memory() {
        let mut a = arena(4096);
        let mut first = a.allocate_unaligned(4).unwrap();
        a.bytes_mut(&mut first).unwrap().fill(0xEE);
        a.reset();
        let mut again = a.allocate_unaligned(4).unwrap();
        assert_eq!(a.bytes_mut(&mut again).unwrap(), &[0xEE; 4]);
    }

    #[test]
    fn usage_tracks_high_water_across_resets() {
        let mut a = arena(4096);
        let _ = a.allocate_unaligned(1000).unwrap();
        a.reset();
        let _ = a.allocate_unaligned(10).unwrap();
        let usage = a.usage();
        assert_eq!(usage.used, 10);
        assert_eq!(usage.high_water, 1000);
        assert_eq!(usage.epoch, 1);
        assert_eq!(usage.remaining, a.capacity() - 10);
    }

    #[test]
    fn guard_range_follows_capacity() {
        let a = arena(1);
        let guard = a.guard_range();
        assert_eq!(guard.start, a.base_addr() + a.capacity());
        assert_eq!(guard.len(), a.page_size());
    }

    #[test]
    fn zero_capacity_arena_rejects_nonzero_allocations() {
        let a = arena(0);
        assert_eq!(a.capacity(), 0);
        let empty = a.allocate_unaligned(0).unwrap();
        assert!(empty.is_empty());
        assert!(matches!(
            a.allocate_unaligned(1),
            Err(ArenaError::CapacityExceeded { capacity: 0, .. })
        ));
    }

    #[test]
    fn debug_output_names_arena() {
        let a = arena(4096);
        let text = format!("{a:?}");
        assert!(text.starts_with("TransientArena"));
        assert!(text.contains("capacity"));
    }
}
