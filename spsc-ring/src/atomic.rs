//! Lock-free single-producer single-consumer ring buffer.
//!
//! The producer is the only writer of `head` and the only reader of the
//! consumer's `tail`; the consumer is the only writer of `tail` and the only
//! reader of `head`. That split is what lets each side use:
//!
//! - a Relaxed load of the index it owns (nobody else writes it),
//! - an Acquire load of the other side's index before touching a slot,
//! - a Release store of its own index after touching a slot.
//!
//! The Release store of `head` in [`put`](RingBuffer::put) pairs with the
//! Acquire load of `head` in [`get`](RingBuffer::get), so a consumer that sees
//! the new `head` also sees the value written into the slot. The same edge in
//! the other direction hands an emptied slot back to the producer.
//!
//! # Memory Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │ head (cache-line padded) - producer write position    │
//! ├───────────────────────────────────────────────────────┤
//! │ tail (cache-line padded) - consumer read position     │
//! ├───────────────────────────────────────────────────────┤
//! │ Storage: [T; capacity + 1]                            │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use spsc_ring::AtomicRing;
//!
//! let (tx, rx) = AtomicRing::<u64>::new(1024).unwrap().split();
//!
//! tx.put(1).unwrap();
//! tx.put(2).unwrap();
//!
//! assert_eq!(rx.get(), Ok(1));
//! assert_eq!(rx.get(), Ok(2));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::error::{CapacityError, Empty, Full};
use crate::handle::{Consumer, Producer, split};
use crate::storage::Storage;
use crate::RingBuffer;

/// Lock-free SPSC ring buffer with atomic head and tail indices.
pub struct AtomicRing<T> {
    /// Producer's write position. Updated by the producer, read by the consumer.
    head: CachePadded<AtomicUsize>,
    /// Consumer's read position. Updated by the consumer, read by the producer.
    tail: CachePadded<AtomicUsize>,
    storage: Storage<T>,
}

impl<T> AtomicRing<T> {
    /// Creates a ring that holds up to `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `capacity` is zero or the slots cannot be
    /// allocated.
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        Ok(Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            storage: Storage::allocate(capacity)?,
        })
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

impl<T: Send> RingBuffer<T> for AtomicRing<T> {
    #[inline]
    unsafe fn put(&self, value: T) -> Result<(), Full<T>> {
        // Only the producer writes head
        let head = self.head.load(Ordering::Relaxed);
        let next = self.storage.next(head);

        if next == self.tail.load(Ordering::Acquire) {
            return Err(Full(value));
        }

        // Safety: `head` is outside `[tail, head)`, so the consumer never
        // reads it, and the caller guarantees we are the only producer.
        unsafe { self.storage.write(head, value) };
        self.head.store(next, Ordering::Release);

        Ok(())
    }

    #[inline]
    unsafe fn get(&self) -> Result<T, Empty> {
        // Only the consumer writes tail
        let tail = self.tail.load(Ordering::Relaxed);

        if tail == self.head.load(Ordering::Acquire) {
            return Err(Empty);
        }

        // Safety: the Acquire load of head made the write of slot `tail`
        // visible, and the producer will not rewrite it until tail moves.
        let value = unsafe { self.storage.read(tail) };
        self.tail.store(self.storage.next(tail), Ordering::Release);

        Ok(value)
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.head.load(Ordering::Relaxed) == self.tail.load(Ordering::Relaxed)
    }

    #[inline]
    fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        self.storage.next(head) == self.tail.load(Ordering::Relaxed)
    }

    #[inline]
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        self.storage.occupancy(head, tail)
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.storage.capacity()
    }
}

impl<T> Drop for AtomicRing<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        if head != tail && std::mem::needs_drop::<T>() {
            // Safety: we are the sole owner and `[tail, head)` is live.
            let dropped = unsafe { self.storage.drop_live(tail, head) };
            tracing::debug!(dropped, "dropped live elements with atomic ring");
        }
    }
}

impl<T> fmt::Debug for AtomicRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        f.debug_struct("AtomicRing")
            .field("capacity", &self.capacity())
            .field("len", &self.storage.occupancy(head, tail))
            .finish_non_exhaustive()
    }
}
