//! Producer and consumer endpoints.
//!
//! [`split`] moves a ring into an `Arc` shared by exactly one [`Producer`] and
//! one [`Consumer`]. Each endpoint can be sent to another thread but not shared
//! (`Send`, not `Sync`) and cannot be cloned, so the single-producer
//! single-consumer precondition of [`RingBuffer::put`] and
//! [`RingBuffer::get`] holds by construction.
//!
//! # Disconnection
//!
//! When either endpoint is dropped the other observes it through
//! `is_disconnected()`. Nothing else changes: the remaining consumer can still
//! drain what is left, and the ring is freed with the last endpoint.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};

use crate::RingBuffer;
use crate::error::{Empty, Full};

/// `Send` but not `Sync`; ties the endpoint to the element type.
type EndpointMarker<T> = PhantomData<(fn(T) -> T, Cell<()>)>;

/// Moves `ring` into a producer/consumer pair.
///
/// # Example
///
/// ```
/// use spsc_ring::{AtomicRing, split};
///
/// let (tx, rx) = split(AtomicRing::<u32>::new(4).unwrap());
///
/// tx.put(7).unwrap();
/// assert_eq!(rx.get(), Ok(7));
/// ```
pub fn split<T, R>(ring: R) -> (Producer<T, R>, Consumer<T, R>)
where
    R: RingBuffer<T>,
{
    from_shared(Arc::new(ring))
}

/// Moves `ring` into a producer/consumer pair that hides the variant behind
/// `dyn RingBuffer<T>`.
///
/// Unlike [`ring_buffer`](crate::ring_buffer) this places no bound on `T`
/// beyond what the ring itself needs, so the bounded variants can carry
/// non-`Copy` elements through type-erased endpoints.
///
/// # Example
///
/// ```
/// use spsc_ring::{AtomicRing, Consumer, MutexRing, Producer, split_dyn};
///
/// let pairs: Vec<(Producer<String>, Consumer<String>)> = vec![
///     split_dyn(MutexRing::new(2).unwrap()),
///     split_dyn(AtomicRing::new(2).unwrap()),
/// ];
///
/// for (tx, rx) in &pairs {
///     tx.put("owned".to_string()).unwrap();
///     assert_eq!(rx.get().unwrap(), "owned");
/// }
/// ```
pub fn split_dyn<T, R>(ring: R) -> (Producer<T>, Consumer<T>)
where
    R: RingBuffer<T> + 'static,
{
    let ring: Arc<dyn RingBuffer<T>> = Arc::new(ring);
    from_shared(ring)
}

/// Builds the endpoints around a freshly created, unshared `Arc`.
pub(crate) fn from_shared<T, R>(ring: Arc<R>) -> (Producer<T, R>, Consumer<T, R>)
where
    R: ?Sized + RingBuffer<T>,
{
    debug_assert_eq!(Arc::strong_count(&ring), 1);

    (
        Producer {
            ring: Arc::clone(&ring),
            _marker: PhantomData,
        },
        Consumer {
            ring,
            _marker: PhantomData,
        },
    )
}

/// Returns `true` once the other endpoint is gone.
///
/// The Acquire fence pairs with the Release decrement in `Arc::drop`, so
/// everything the dropped endpoint did is visible afterwards.
#[inline]
fn alone<R: ?Sized>(ring: &Arc<R>) -> bool {
    let alone = Arc::strong_count(ring) == 1;
    if alone {
        fence(Ordering::Acquire);
    }
    alone
}

/// The inserting half of a ring buffer.
///
/// This struct can only be owned by a single thread at a time (implements `Send` but not `Sync`).
pub struct Producer<T, R: ?Sized = dyn RingBuffer<T>> {
    ring: Arc<R>,
    _marker: EndpointMarker<T>,
}

impl<T, R: ?Sized + RingBuffer<T>> Producer<T, R> {
    /// Inserts `value`.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the ring is full. The overwriting ring
    /// never returns an error; it evicts the oldest element instead.
    #[inline]
    pub fn put(&self, value: T) -> Result<(), Full<T>> {
        // Safety: this is the only producer, and `&self` cannot cross threads
        unsafe { self.ring.put(value) }
    }

    /// Returns `true` if the ring holds no elements.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns `true` if the ring is at capacity.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Returns the number of elements in the ring.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns the capacity of the ring.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns `true` if the consumer has been dropped.
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        alone(&self.ring)
    }

    /// Returns the underlying ring, for variant specific queries.
    #[inline]
    pub fn ring(&self) -> &R {
        &self.ring
    }
}

impl<T, R: ?Sized + RingBuffer<T>> fmt::Debug for Producer<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("disconnected", &self.is_disconnected())
            .finish_non_exhaustive()
    }
}

/// The removing half of a ring buffer.
///
/// This struct can only be owned by a single thread at a time (implements `Send` but not `Sync`).
pub struct Consumer<T, R: ?Sized = dyn RingBuffer<T>> {
    ring: Arc<R>,
    _marker: EndpointMarker<T>,
}

impl<T, R: ?Sized + RingBuffer<T>> Consumer<T, R> {
    /// Removes the oldest element.
    ///
    /// # Errors
    ///
    /// Returns `Err(Empty)` if the ring is empty.
    #[inline]
    pub fn get(&self) -> Result<T, Empty> {
        // Safety: this is the only consumer, and `&self` cannot cross threads
        unsafe { self.ring.get() }
    }

    /// Returns an iterator that removes elements until the ring looks empty.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::MutexRing;
    ///
    /// let (tx, rx) = MutexRing::<u32>::new(4).unwrap().split();
    /// tx.put(1).unwrap();
    /// tx.put(2).unwrap();
    ///
    /// assert_eq!(rx.drain().collect::<Vec<_>>(), vec![1, 2]);
    /// assert!(rx.is_empty());
    /// ```
    #[inline]
    pub fn drain(&self) -> Drain<'_, T, R> {
        Drain { consumer: self }
    }

    /// Returns `true` if the ring holds no elements.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns `true` if the ring is at capacity.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Returns the number of elements in the ring.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns the capacity of the ring.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns `true` if the producer has been dropped.
    ///
    /// Once this returns `true`, every element the producer inserted is
    /// visible to [`get`](Self::get).
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        alone(&self.ring)
    }

    /// Returns the underlying ring, for variant specific queries.
    #[inline]
    pub fn ring(&self) -> &R {
        &self.ring
    }
}

impl<T, R: ?Sized + RingBuffer<T>> fmt::Debug for Consumer<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("disconnected", &self.is_disconnected())
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`Consumer::drain`].
pub struct Drain<'a, T, R: ?Sized = dyn RingBuffer<T>> {
    consumer: &'a Consumer<T, R>,
}

impl<T, R: ?Sized + RingBuffer<T>> Iterator for Drain<'_, T, R> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.consumer.get().ok()
    }
}

impl<T, R: ?Sized + RingBuffer<T>> fmt::Debug for Drain<'_, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drain").finish_non_exhaustive()
    }
}
