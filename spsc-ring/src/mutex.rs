//! Mutex-guarded ring buffer.
//!
//! Every operation, including the read-only queries, takes the same lock, so
//! `head` and `tail` are plain integers. This serialises the producer against
//! the consumer even though each only needs to see the other's index, which
//! makes it the correctness baseline for the lock-free variants.
//!
//! Because the lock makes each call exclusive, the inherent [`MutexRing::put`]
//! and [`MutexRing::get`] are safe to call from any number of threads.
//!
//! # Example
//!
//! ```
//! use spsc_ring::MutexRing;
//!
//! let ring = MutexRing::<u32>::new(2).unwrap();
//!
//! ring.put(1).unwrap();
//! ring.put(2).unwrap();
//! assert!(ring.put(3).is_err());
//!
//! assert_eq!(ring.get(), Ok(1));
//! assert_eq!(ring.len(), 1);
//! ```

use std::fmt;

use parking_lot::Mutex;

use crate::error::{CapacityError, Empty, Full};
use crate::handle::{Consumer, Producer, split};
use crate::storage::Storage;
use crate::RingBuffer;

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    /// Next slot to write.
    head: usize,
    /// Next slot to read.
    tail: usize,
}

/// Ring buffer with a single lock around both indices.
pub struct MutexRing<T> {
    cursor: Mutex<Cursor>,
    storage: Storage<T>,
}

impl<T> MutexRing<T> {
    /// Creates a ring that holds up to `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `capacity` is zero or the slots cannot be
    /// allocated.
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        Ok(Self {
            cursor: Mutex::new(Cursor::default()),
            storage: Storage::allocate(capacity)?,
        })
    }

    /// Inserts `value` at the head.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the ring is full; nothing is changed.
    pub fn put(&self, value: T) -> Result<(), Full<T>> {
        let mut cursor = self.cursor.lock();

        let next = self.storage.next(cursor.head);
        if next == cursor.tail {
            return Err(Full(value));
        }

        // Safety: the lock is held and `head` is outside `[tail, head)`.
        unsafe { self.storage.write(cursor.head, value) };
        cursor.head = next;

        Ok(())
    }

    /// Removes the oldest element.
    ///
    /// # Errors
    ///
    /// Returns `Err(Empty)` if the ring is empty; nothing is changed.
    pub fn get(&self) -> Result<T, Empty> {
        let mut cursor = self.cursor.lock();

        if cursor.head == cursor.tail {
            return Err(Empty);
        }

        // Safety: the lock is held and `tail` is live.
        let value = unsafe { self.storage.read(cursor.tail) };
        cursor.tail = self.storage.next(cursor.tail);

        Ok(value)
    }

    /// Returns `true` if the ring holds no elements.
    pub fn is_empty(&self) -> bool {
        let cursor = self.cursor.lock();
        cursor.head == cursor.tail
    }

    /// Returns `true` if the next [`put`](Self::put) would be rejected.
    pub fn is_full(&self) -> bool {
        let cursor = self.cursor.lock();
        self.storage.next(cursor.head) == cursor.tail
    }

    /// Returns the number of elements in the ring.
    pub fn len(&self) -> usize {
        let cursor = self.cursor.lock();
        self.storage.occupancy(cursor.head, cursor.tail)
    }

    /// Returns the maximum number of elements the ring can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Moves the ring into a producer/consumer pair.
    pub fn split(self) -> (Producer<T, Self>, Consumer<T, Self>)
    where
        T: Send,
    {
        split(self)
    }
}

impl<T: Send> RingBuffer<T> for MutexRing<T> {
    #[inline]
    unsafe fn put(&self, value: T) -> Result<(), Full<T>> {
        Self::put(self, value)
    }

    #[inline]
    unsafe fn get(&self) -> Result<T, Empty> {
        Self::get(self)
    }

    fn is_empty(&self) -> bool {
        Self::is_empty(self)
    }

    fn is_full(&self) -> bool {
        Self::is_full(self)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn capacity(&self) -> usize {
        Self::capacity(self)
    }
}

impl<T> Drop for MutexRing<T> {
    fn drop(&mut self) {
        let Cursor { head, tail } = *self.cursor.get_mut();
        if head != tail && std::mem::needs_drop::<T>() {
            // Safety: `[tail, head)` is exactly the set of live slots.
            let dropped = unsafe { self.storage.drop_live(tail, head) };
            tracing::debug!(dropped, "dropped live elements with mutex ring");
        }
    }
}

impl<T> fmt::Debug for MutexRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexRing")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
