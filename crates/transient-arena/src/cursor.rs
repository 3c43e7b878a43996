//! The shared "bytes used" cursor.
//!
//! [`Cursor`] is pure offset arithmetic over an atomic counter: it never
//! touches the region's memory. Aligned bumps use a compare-and-swap retry
//! loop, unaligned bumps a single `fetch_add`, and tail resizes a single
//! strong compare-and-swap against the expected tail end.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ArenaError;

/// The cursor word, padded to its own cache line.
///
/// Every allocating thread hammers this counter; without padding, writes
/// to neighbouring fields of the arena would bounce the same line.
#[repr(align(128))]
struct PaddedCounter(AtomicUsize);

/// Atomically advanced bump cursor over `[0, capacity)`.
pub(crate) struct Cursor {
    used: PaddedCounter,
    capacity: usize,
}

// Compile-time assertion: Cursor must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Cursor>();
};

impl Cursor {
    /// Create an empty cursor over `capacity` bytes.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            used: PaddedCounter(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Current cursor position.
    pub(crate) fn load(&self) -> usize {
        self.used.0.load(Ordering::Acquire)
    }

    /// Usable capacity in bytes.
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserve `size` bytes whose absolute address `base_addr + offset` is a
    /// multiple of `align`. Returns the offset of the reservation.
    ///
    /// The capacity check runs before the compare-and-swap, so a rejected
    /// call never moves the cursor.
    pub(crate) fn bump_aligned(
        &self,
        base_addr: usize,
        align: usize,
        size: usize,
    ) -> Result<usize, ArenaError> {
        debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
        let mut current = self.used.0.load(Ordering::Acquire);
        loop {
            let start = aligned_offset(base_addr, current, align)
                .ok_or_else(|| self.exceeded(size, current))?;
            let end = match start.checked_add(size) {
                Some(end) if end <= self.capacity => end,
                _ => {
                    let padding = start.saturating_sub(current);
                    return Err(self.exceeded(padding.saturating_add(size), current));
                }
            };
            match self.used.0.compare_exchange_weak(
                current,
                end,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(start),
                Err(actual) => current = actual,
            }
        }
    }

    /// Reserve `size` bytes at the current position with one `fetch_add`.
    ///
    /// On overflow the same amount is subtracted back. Until then the
    /// cursor overshoots capacity and concurrent bumps are rejected too.
    pub(crate) fn bump(&self, size: usize) -> Result<usize, ArenaError> {
        if size > self.capacity {
            return Err(self.exceeded(size, self.load()));
        }
        let prev = self.used.0.fetch_add(size, Ordering::AcqRel);
        match prev.checked_add(size) {
            Some(end) if end <= self.capacity => Ok(prev),
            _ => {
                self.used.0.fetch_sub(size, Ordering::AcqRel);
                Err(self.exceeded(size, prev))
            }
        }
    }

    /// Move the end of the tail allocation `[start, start + old_len)` to
    /// `start + new_len`.
    ///
    /// Fails with [`ArenaError::NotTail`] unless the cursor sits exactly at
    /// `start + old_len`, both before and at the moment of the swap.
    pub(crate) fn resize_tail(
        &self,
        start: usize,
        old_len: usize,
        new_len: usize,
    ) -> Result<(), ArenaError> {
        let expected_end = start.saturating_add(old_len);
        let used = self.load();
        if used != expected_end {
            return Err(ArenaError::NotTail { expected_end, used });
        }
        let new_end = match start.checked_add(new_len) {
            Some(end) if end <= self.capacity => end,
            _ => return Err(self.exceeded(new_len.saturating_sub(old_len), used)),
        };
        self.used
            .0
            .compare_exchange(expected_end, new_end, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| ArenaError::NotTail {
                expected_end,
                used: actual,
            })
    }

    /// Rewind to zero. Exclusive access means no bump can be in flight.
    pub(crate) fn rewind(&mut self) {
        *self.used.0.get_mut() = 0;
    }

    fn exceeded(&self, requested: usize, used: usize) -> ArenaError {
        ArenaError::CapacityExceeded {
            requested,
            used,
            capacity: self.capacity,
        }
    }
}

/// Offset of the first address at or after `base_addr + used` that is a
/// multiple of `align`.
fn aligned_offset(base_addr: usize, used: usize, align: usize) -> Option<usize> {
    let addr = base_addr.checked_add(used)?;
    let aligned = addr.checked_add(align - 1)? & !(align - 1);
    Some(aligned - base_addr)
}
