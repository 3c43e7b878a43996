//! Arena-resident growable lists.
//!
//! [`ArenaList`] builds a `Vec`-like sequence on top of the tail-growth
//! operations: while the list's allocation is the arena's tail it grows
//! and shrinks in place, without copying. Once something else has been
//! allocated after it, growth fails with [`ArenaError::NotTail`] and the
//! list keeps its current contents.
//!
//! Elements must be [`NoUninit`]: every byte written into the region stays
//! initialised, so a later byte view of the same range (through
//! [`ArenaList::into_allocation`] or after a reset) never reads padding.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use bytemuck::NoUninit;

use crate::arena::TransientArena;
use crate::error::ArenaError;
use crate::handle::Allocation;

/// Minimum number of elements added when a full list grows.
const MIN_GROWTH: usize = 4;

/// A growable sequence of `T` stored in a [`TransientArena`].
///
/// Elements are never dropped (the arena has no per-object cleanup) and
/// must contain no padding, hence the [`NoUninit`] bound (which implies
/// `Copy`). The list borrows the arena, so it cannot outlive the current
/// epoch.
///
/// Types with padding bytes are rejected at compile time:
///
/// ```compile_fail
/// use transient_arena::{ArenaList, TransientArena};
///
/// let arena = TransientArena::with_capacity(4096).unwrap();
/// let mut list = ArenaList::<(u8, u32)>::new(&arena);
/// list.push((1, 2)).unwrap();
/// ```
pub struct ArenaList<'a, T: NoUninit> {
    arena: &'a TransientArena,
    alloc: Option<Allocation>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: NoUninit> ArenaList<'a, T> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// An empty list. Nothing is allocated until the first push.
    pub fn new(arena: &'a TransientArena) -> Self {
        Self {
            arena,
            alloc: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// An empty list with room for `capacity` elements, allocated now.
    pub fn with_capacity(arena: &'a TransientArena, capacity: usize) -> Result<Self, ArenaError> {
        let mut list = Self::new(arena);
        if !Self::IS_ZST {
            list.alloc = Some(arena.allocate_list::<T>(capacity)?);
        }
        Ok(list)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current allocation can hold.
    pub fn capacity(&self) -> usize {
        if Self::IS_ZST {
            return usize::MAX;
        }
        self.alloc
            .as_ref()
            .map_or(0, |alloc| alloc.len() / mem::size_of::<T>())
    }

    /// Make room for at least `additional` more elements.
    ///
    /// Grows the backing allocation in place; the list must be the arena's
    /// tail unless it has not allocated yet.
    pub fn reserve(&mut self, additional: usize) -> Result<(), ArenaError> {
        let needed = self.len.checked_add(additional).ok_or_else(|| {
            self.arena.violation(ArenaError::LayoutOverflow {
                count: additional,
                elem_size: mem::size_of::<T>(),
            })
        })?;
        if needed <= self.capacity() {
            return Ok(());
        }
        match self.alloc.as_mut() {
            None => {
                self.alloc = Some(self.arena.allocate_list::<T>(needed)?);
            }
            Some(alloc) => {
                let elem_size = mem::size_of::<T>();
                let bytes = elem_size.checked_mul(needed).ok_or_else(|| {
                    self.arena.violation(ArenaError::LayoutOverflow {
                        count: needed,
                        elem_size,
                    })
                })?;
                self.arena.resize_in_place(alloc, bytes)?;
            }
        }
        Ok(())
    }

    /// Append one element, doubling capacity when full.
    pub fn push(&mut self, value: T) -> Result<(), ArenaError> {
        if self.len == self.capacity() {
            self.reserve(self.capacity().max(MIN_GROWTH))?;
        }
        // SAFETY: len < capacity, so the slot lies inside the allocation,
        // which is aligned for T and owned by this list alone. Writing
        // through the raw pointer never reads the (possibly stale) slot,
        // and `T: NoUninit` leaves every written byte initialised.
        unsafe { self.data_ptr().as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Append every element of `items`.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), ArenaError> {
        self.reserve(items.len())?;
        // SAFETY: reserve guaranteed room for items.len() more elements;
        // the source is a live slice and cannot overlap arena memory owned
        // by this list.
        unsafe {
            ptr::copy_nonoverlapping(
                items.as_ptr(),
                self.data_ptr().as_ptr().add(self.len),
                items.len(),
            );
        }
        self.len += items.len();
        Ok(())
    }

    /// Keep the first `len` elements. No effect if the list is shorter.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Remove every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Return unused capacity to the arena by shrinking the tail in place.
    pub fn shrink_to_fit(&mut self) -> Result<(), ArenaError> {
        if Self::IS_ZST {
            return Ok(());
        }
        if let Some(alloc) = self.alloc.as_mut() {
            let bytes = self.len * mem::size_of::<T>();
            if bytes < alloc.len() {
                self.arena.resize_in_place(alloc, bytes)?;
            }
        }
        Ok(())
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first len slots were initialised by push/extend, the
        // pointer is aligned and non-null, and `&self` prevents mutation.
        unsafe { std::slice::from_raw_parts(self.data_ptr().as_ptr(), self.len) }
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as for as_slice; `&mut self` makes the borrow unique.
        unsafe { std::slice::from_raw_parts_mut(self.data_ptr().as_ptr(), self.len) }
    }

    /// Give up the list and keep its backing allocation (capacity bytes).
    pub fn into_allocation(self) -> Option<Allocation> {
        self.alloc
    }

    fn data_ptr(&self) -> NonNull<T> {
        match &self.alloc {
            Some(alloc) if !Self::IS_ZST => self.arena.ptr_at(alloc.offset()).cast::<T>(),
            _ => NonNull::dangling(),
        }
    }
}

impl<T: NoUninit> Deref for ArenaList<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: NoUninit> DerefMut for ArenaList<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: NoUninit + fmt::Debug> fmt::Debug for ArenaList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
