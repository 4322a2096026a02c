//! Slot storage shared by every ring variant.
//!
//! A single heap allocation holding `capacity + 1` slots:
//!
//! ```text
//! ┌────────┬────────┬────────┬─────┬──────────────┐
//! │ slot 0 │ slot 1 │ slot 2 │ ... │ slot capacity│
//! └────────┴────────┴────────┴─────┴──────────────┘
//!      ▲ tail (next read)       ▲ head (next write)
//! ```
//!
//! Live values occupy `[tail, head)` modulo the slot count. One slot is always
//! left unused so `head == tail` means empty and `next(head) == tail` means
//! full; with exactly `capacity` slots both states would look the same.
//!
//! The storage does not know which slots are live. Each ring variant owns the
//! indices and is responsible for dropping `[tail, head)` when it goes away.

use std::alloc::Layout;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;

use crate::error::CapacityError;

type Slot<T> = UnsafeCell<MaybeUninit<T>>;

pub(crate) struct Storage<T> {
    slots: Box<[Slot<T>]>,
    capacity: usize,
}

// Safety: slots are only touched through the unsafe accessors below, whose
// callers guarantee a slot is never written and read at the same time.
unsafe impl<T: Send> Send for Storage<T> {}
unsafe impl<T: Send> Sync for Storage<T> {}

impl<T> Storage<T> {
    /// Allocates `capacity + 1` uninitialized slots.
    pub(crate) fn allocate(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::Zero);
        }

        let slot_count = capacity
            .checked_add(1)
            .ok_or(CapacityError::Overflow { capacity })?;
        Layout::array::<Slot<T>>(slot_count).map_err(|_| CapacityError::Overflow { capacity })?;

        let mut slots = Vec::new();
        slots.try_reserve_exact(slot_count)?;
        slots.resize_with(slot_count, || UnsafeCell::new(MaybeUninit::uninit()));

        tracing::debug!(capacity, slot_count, "allocated ring storage");

        Ok(Self {
            slots: slots.into_boxed_slice(),
            capacity,
        })
    }

    /// Maximum number of live elements (`slot_count() - 1`).
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of physical slots (`capacity() + 1`).
    #[inline]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Index following `index`, wrapping at the slot count.
    #[inline(always)]
    pub(crate) fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    /// Number of live slots between `tail` (inclusive) and `head` (exclusive).
    #[inline]
    pub(crate) fn occupancy(&self, head: usize, tail: usize) -> usize {
        if head >= tail {
            head - tail
        } else {
            head + self.slots.len() - tail
        }
    }

    /// Moves `value` into slot `index`.
    ///
    /// The previous content of the slot is not dropped.
    ///
    /// # Safety
    ///
    /// - `index < slot_count()`
    /// - no other thread reads or writes slot `index` concurrently
    #[inline(always)]
    pub(crate) unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.slots.len());
        unsafe { (*self.slots.get_unchecked(index).get()).write(value) };
    }

    /// Moves the value out of slot `index`, leaving the slot logically empty.
    ///
    /// # Safety
    ///
    /// - `index < slot_count()`
    /// - slot `index` holds an initialized value that is not read again
    ///   before it is rewritten
    /// - no other thread writes slot `index` concurrently
    #[inline(always)]
    pub(crate) unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.slots.len());
        unsafe { (*self.slots.get_unchecked(index).get()).assume_init_read() }
    }

    /// Copies the raw bytes of slot `index` without asserting they are
    /// initialized or consistent.
    ///
    /// Used by the overwriting ring, which may race with the producer and only
    /// trusts the copy after validating it.
    ///
    /// # Safety
    ///
    /// `index < slot_count()`
    #[inline(always)]
    pub(crate) unsafe fn read_uninit(&self, index: usize) -> MaybeUninit<T>
    where
        T: Copy,
    {
        debug_assert!(index < self.slots.len());
        unsafe { self.slots.get_unchecked(index).get().read() }
    }

    /// Drops every value in `[tail, head)` and returns how many were dropped.
    ///
    /// # Safety
    ///
    /// Every slot in `[tail, head)` must hold an initialized value. The slots
    /// must not be read afterwards.
    pub(crate) unsafe fn drop_live(&mut self, tail: usize, head: usize) -> usize {
        let mut index = tail;
        let mut dropped = 0;
        while index != head {
            unsafe { self.slots[index].get_mut().assume_init_drop() };
            index = self.next(index);
            dropped += 1;
        }
        dropped
    }
}

impl<T> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("capacity", &self.capacity)
            .field("slot_count", &self.slots.len())
            .finish_non_exhaustive()
    }
}
