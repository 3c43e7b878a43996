//! Low-level region mapping.
//!
//! The only place the arena talks to the OS. A [`Region`] is one anonymous
//! private mapping of `capacity + page_size` bytes: the first `capacity`
//! bytes are read/write, the final page is `PROT_NONE` so that any access
//! running past the end faults instead of touching neighbouring memory.
//!
//! Every `unsafe` block carries a `// SAFETY:` comment.

#![allow(unsafe_code)]

use std::io;
use std::ops::Range;
use std::ptr::{self, NonNull};

use crate::error::ArenaError;
use crate::handle::Allocation;

/// The platform page size in bytes.
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions and does not touch memory.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// Round `requested` up to a whole number of pages.
///
/// Returns `None` if the result does not fit in `usize`.
pub(crate) fn round_to_pages(requested: usize, page: usize) -> Option<usize> {
    requested.div_ceil(page).checked_mul(page)
}

/// A fixed-size read/write mapping followed by one inaccessible guard page.
pub(crate) struct Region {
    base: NonNull<u8>,
    capacity: usize,
    page_size: usize,
}

// SAFETY: Region owns its mapping exclusively and never hands out
// references; all access goes through raw pointers whose disjointness is
// enforced by the cursor.
unsafe impl Send for Region {}
// SAFETY: see above. `&Region` only exposes addresses and sizes.
unsafe impl Sync for Region {}

impl Region {
    /// Reserve a region of at least `requested` usable bytes.
    pub(crate) fn reserve(requested: usize) -> Result<Self, ArenaError> {
        let page_size = page_size();
        let capacity =
            round_to_pages(requested, page_size).ok_or_else(|| ArenaError::InvalidConfig {
                reason: format!("requested size {requested} overflows when rounded to pages"),
            })?;
        let mapped = capacity
            .checked_add(page_size)
            .ok_or_else(|| ArenaError::InvalidConfig {
                reason: format!("capacity {capacity} leaves no room for a guard page"),
            })?;

        // SAFETY: anonymous private mapping at a kernel-chosen address; no
        // existing memory is affected.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                mapped,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(ArenaError::ReservationFailed {
                requested: mapped,
                os_error: io::Error::last_os_error().raw_os_error(),
            });
        }
        let base = NonNull::new(addr.cast::<u8>()).ok_or(ArenaError::ReservationFailed {
            requested: mapped,
            os_error: None,
        })?;

        // SAFETY: `base + capacity .. base + mapped` is the last page of the
        // mapping we just created, and `capacity` is page aligned.
        let rc = unsafe {
            libc::mprotect(
                base.as_ptr().add(capacity).cast::<libc::c_void>(),
                page_size,
                libc::PROT_NONE,
            )
        };
        if rc != 0 {
            let os_error = io::Error::last_os_error().raw_os_error();
            // SAFETY: unmapping exactly the mapping created above.
            unsafe {
                libc::munmap(addr, mapped);
            }
            return Err(ArenaError::ReservationFailed {
                requested: mapped,
                os_error,
            });
        }

        Ok(Self {
            base,
            capacity,
            page_size,
        })
    }

    /// First byte of the usable region.
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Usable bytes (a multiple of the page size).
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Page size the region was rounded to.
    pub(crate) fn page_size(&self) -> usize {
        self.page_size
    }

    /// Address range of the no-access guard page.
    pub(crate) fn guard_range(&self) -> Range<usize> {
        let start = self.base.as_ptr() as usize + self.capacity;
        start..start + self.page_size
    }

    /// Pointer to `offset` bytes past the base.
    ///
    /// Callers must have checked `offset <= capacity`.
    pub(crate) fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.capacity);
        // SAFETY: offset is within the mapping (usable bytes plus the guard
        // page start), so the result is in bounds and non-null.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }

    /// Mutable byte view of the range owned by `alloc`.
    ///
    /// The caller must already have validated `alloc` against this
    /// region's arena and epoch. A validated handle is the unique owner of
    /// its range, and the `&mut` borrow keeps it that way while the slice
    /// lives.
    pub(crate) fn bytes_mut<'a>(&'a self, alloc: &'a mut Allocation) -> &'a mut [u8] {
        assert!(alloc.end() <= self.capacity, "{alloc} outside region");
        // SAFETY: in bounds (checked above). The cursor grants each range to
        // exactly one move-only handle per epoch, so no other reference
        // aliases it. Every byte of the mapping is initialised: zero-filled
        // by the kernel, then only ever written as `u8` here or as
        // `NoUninit` (padding-free) elements by `ArenaList`. Stale data
        // from a previous epoch is therefore initialised too, and any bit
        // pattern is a valid `u8`.
        unsafe { std::slice::from_raw_parts_mut(self.at(alloc.offset()).as_ptr(), alloc.len()) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: unmapping exactly the mapping created in `reserve`; no
        // borrows of it can outlive the owning arena.
        let rc = unsafe {
            libc::munmap(
                self.base.as_ptr().cast::<libc::c_void>(),
                self.capacity + self.page_size,
            )
        };
        if rc != 0 {
            tracing::warn!(
                error = %io::Error::last_os_error(),
                "failed to unmap arena region"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        assert!(page_size().is_power_of_two());
    }

    #[test]
    fn rounding_to_pages() {
        assert_eq!(round_to_pages(0, 4096), Some(0));
        assert_eq!(round_to_pages(1, 4096), Some(4096));
        assert_eq!(round_to_pages(4096, 4096), Some(4096));
        assert_eq!(round_to_pages(10_000, 4096), Some(12_288));
        assert_eq!(round_to_pages(usize::MAX, 4096), None);
    }

    #[test]
    fn reserved_region_is_page_aligned_and_writable() {
        let region = Region::reserve(10_000).unwrap();
        let page = region.page_size();
        assert_eq!(region.capacity() % page, 0);
        assert!(region.capacity() >= 10_000);
        assert_eq!(region.base().as_ptr() as usize % page, 0);

        // SAFETY: test writes stay inside the usable capacity.
        unsafe {
            region.base().as_ptr().write(0xAB);
            region.at(region.capacity() - 1).as_ptr().write(0xCD);
            assert_eq!(region.base().as_ptr().read(), 0xAB);
        }
    }

    #[test]
    fn guard_page_follows_capacity() {
        let region = Region::reserve(1).unwrap();
        let guard = region.guard_range();
        assert_eq!(guard.start, region.base().as_ptr() as usize + region.capacity());
        assert_eq!(guard.len(), region.page_size());
    }

    #[test]
    fn zero_capacity_region_maps_only_guard() {
        let region = Region::reserve(0).unwrap();
        assert_eq!(region.capacity(), 0);
        assert_eq!(region.guard_range().start, region.base().as_ptr() as usize);
    }
}
