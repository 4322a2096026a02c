//! Overwriting lock-free SPSC ring buffer (experimental).
//!
//! [`put`](RingBuffer::put) never fails: when the ring is full the producer
//! evicts the oldest element by advancing `tail` itself, then writes as usual.
//! `tail` therefore has two writers, which gives up the single-writer property
//! the plain [`AtomicRing`](crate::AtomicRing) is built on.
//!
//! # Synchronization
//!
//! Both indices are *tagged*: the low bits hold the slot index and the high
//! bits a generation that increments every time the index wraps. Both sides
//! move `tail` only with a compare-and-exchange against the full tag, so a
//! stale tail that happens to point at the same slot again can never win.
//!
//! - The producer checks fullness against the tail it loaded. If the ring is
//!   full it CASes `tail` one step forward; a failed CAS means the consumer
//!   freed a slot and the ring is no longer full.
//! - The consumer copies its slot into a `MaybeUninit<T>` and then CASes
//!   `tail` forward. Success proves no eviction happened while it was copying;
//!   failure means the producer evicted that element (and may be rewriting the
//!   slot), so the copy is thrown away and it retries from the new tail.
//!
//! A discarded copy may be torn, which is why elements must be `Copy`: a torn
//! copy has no destructor to run and no resources to leak.
//!
//! # Example
//!
//! ```
//! use spsc_ring::OverwriteRing;
//!
//! let (tx, rx) = OverwriteRing::<char>::new(3).unwrap().split();
//!
//! tx.put('A').unwrap();
//! tx.put('B').unwrap();
//! tx.put('C').unwrap();
//! assert!(tx.is_full());
//!
//! // Evicts 'A'
//! tx.put('D').unwrap();
//!
//! assert_eq!(rx.get(), Ok('B'));
//! assert_eq!(tx.ring().evicted(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

use crate::error::{CapacityError, Empty, Full};
use crate::handle::{Consumer, Producer, split};
use crate::storage::Storage;
use crate::RingBuffer;

/// Bits reserved for the generation part of a tag.
const MIN_GENERATION_BITS: u32 = 16;

/// Packs a slot index (low bits) and a generation (high bits) into a `u64`.
#[derive(Debug, Clone, Copy)]
struct TagLayout {
    slot_count: u64,
    shift: u32,
    index_mask: u64,
}

impl TagLayout {
    /// Returns `None` if the index leaves fewer than
    /// [`MIN_GENERATION_BITS`] for the generation.
    fn new(slot_count: usize) -> Option<Self> {
        let slot_count = u64::try_from(slot_count).ok()?;
        let shift = u64::BITS - (slot_count - 1).leading_zeros();
        if shift > u64::BITS - MIN_GENERATION_BITS {
            return None;
        }

        Some(Self {
            slot_count,
            shift,
            index_mask: (1 << shift) - 1,
        })
    }

    #[inline(always)]
    fn index(&self, tag: u64) -> usize {
        (tag & self.index_mask) as usize
    }

    #[inline(always)]
    fn generation(&self, tag: u64) -> u64 {
        tag >> self.shift
    }

    /// Next position; bumps the generation when the index wraps.
    #[inline(always)]
    fn advance(&self, tag: u64) -> u64 {
        if (tag & self.index_mask) + 1 == self.slot_count {
            self.generation(tag).wrapping_add(1) << self.shift
        } else {
            tag + 1
        }
    }
}

/// Lock-free SPSC ring buffer that evicts the oldest element when full.
pub struct OverwriteRing<T> {
    /// Tagged write position. Written by the producer only.
    head: CachePadded<AtomicU64>,
    /// Tagged read position. Advanced by the consumer, and by the producer
    /// when it evicts.
    tail: CachePadded<AtomicU64>,
    /// Evictions so far. Written by the producer only.
    evicted: CachePadded<AtomicU64>,
    layout: TagLayout,
    storage: Storage<T>,
}

impl<T: Copy> OverwriteRing<T> {
    /// Creates a ring that holds up to `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `capacity` is zero, the slots cannot be
    /// allocated, or the slot index does not leave room for a 16-bit
    /// generation in a 64-bit tag.
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        let storage = Storage::allocate(capacity)?;
        let layout =
            TagLayout::new(storage.slot_count()).ok_or(CapacityError::Overflow { capacity })?;

        Ok(Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            evicted: CachePadded::new(AtomicU64::new(0)),
            layout,
            storage,
        })
    }

    /// Moves the ring into a producer/consumer pair.
    pub fn split(self) -> (Producer<T, Self>, Consumer<T, Self>)
    where
        T: Send,
    {
        split(self)
    }
}

impl<T> OverwriteRing<T> {
    /// Returns the maximum number of elements the ring can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Returns how many elements have been evicted to make room for new ones.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    #[cold]
    fn record_eviction(&self, tail: u64) {
        // Only the producer writes the counter
        let evicted = self.evicted.load(Ordering::Relaxed) + 1;
        self.evicted.store(evicted, Ordering::Relaxed);

        tracing::trace!(
            slot = self.layout.index(tail),
            generation = self.layout.generation(tail),
            evicted,
            "evicted oldest element"
        );
    }
}

impl<T: Copy + Send> RingBuffer<T> for OverwriteRing<T> {
    /// Always returns `Ok(())`.
    #[inline]
    unsafe fn put(&self, value: T) -> Result<(), Full<T>> {
        let layout = self.layout;

        // Only the producer writes head
        let head = self.head.load(Ordering::Relaxed);
        let next = layout.advance(head);

        let mut tail = self.tail.load(Ordering::Acquire);
        while layout.index(next) == layout.index(tail) {
            match self.tail.compare_exchange(
                tail,
                layout.advance(tail),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.record_eviction(tail);
                    break;
                }
                // The consumer moved tail, so there is room now
                Err(current) => tail = current,
            }
        }

        // Safety: the element that last lived in this slot was retired by the
        // consumer or evicted before tail reached its current value. A
        // consumer still copying an evicted element fails its CAS and drops
        // the copy.
        unsafe { self.storage.write(layout.index(head), value) };
        self.head.store(next, Ordering::Release);

        Ok(())
    }

    #[inline]
    unsafe fn get(&self) -> Result<T, Empty> {
        let layout = self.layout;

        let mut tail = self.tail.load(Ordering::Acquire);
        loop {
            let head = self.head.load(Ordering::Acquire);

            if layout.index(head) == layout.index(tail) {
                // An eviction between the two loads can make a full ring
                // look empty; only trust it if tail did not move.
                let current = self.tail.load(Ordering::Acquire);
                if current == tail {
                    return Err(Empty);
                }
                tail = current;
                continue;
            }

            // Safety: index is in bounds; the copy is not trusted until the CAS
            // below succeeds.
            let copy = unsafe { self.storage.read_uninit(layout.index(tail)) };

            match self.tail.compare_exchange(
                tail,
                layout.advance(tail),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                // Safety: tail never moved while we copied, so the slot held
                // the element published before the Acquire load of head.
                Ok(_) => return Ok(unsafe { copy.assume_init() }),
                // Evicted under us, retry from the new oldest element
                Err(current) => tail = current,
            }
        }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        self.layout.index(head) == self.layout.index(tail)
    }

    #[inline]
    fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        self.layout.index(self.layout.advance(head)) == self.layout.index(tail)
    }

    #[inline]
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        self.storage.occupancy(self.layout.index(head), self.layout.index(tail))
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.storage.capacity()
    }
}

impl<T> fmt::Debug for OverwriteRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        f.debug_struct("OverwriteRing")
            .field("capacity", &self.capacity())
            .field(
                "len",
                &self
                    .storage
                    .occupancy(self.layout.index(head), self.layout.index(tail)),
            )
            .field("evicted", &self.evicted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    use super::*;

    // ============================================================================
    // Tags
    // ============================================================================

    #[test]
    fn tag_advance_bumps_generation_on_wrap() {
        let layout = TagLayout::new(4).unwrap();
        assert_eq!(layout.shift, 2);

        let mut tag = 0;
        for expected in [1, 2, 3, 0, 1] {
            tag = layout.advance(tag);
            assert_eq!(layout.index(tag), expected);
        }
        assert_eq!(layout.generation(tag), 1);
    }

    #[test]
    fn tag_generation_wraps_to_zero() {
        let layout = TagLayout::new(4).unwrap();
        let last = ((u64::MAX >> layout.shift) << layout.shift) | 3;

        assert_eq!(layout.advance(last), 0);
    }

    #[test]
    fn tag_layout_rejects_indices_without_generation_room() {
        assert!(TagLayout::new(1 << 48).is_some());
        assert!(TagLayout::new((1 << 48) + 1).is_none());
    }

    #[test]
    fn non_power_of_two_slot_count() {
        let layout = TagLayout::new(11).unwrap();

        let mut tag = 0;
        for _ in 0..11 {
            tag = layout.advance(tag);
        }
        assert_eq!(layout.index(tag), 0);
        assert_eq!(layout.generation(tag), 1);
    }

    // ============================================================================
    // Basic Operations
    // ============================================================================

    #[test]
    fn behaves_like_bounded_until_full() {
        let (tx, rx) = OverwriteRing::<u64>::new(4).unwrap().split();

        assert!(rx.is_empty());
        for i in 0..4 {
            tx.put(i).unwrap();
            assert_eq!(tx.len(), i as usize + 1);
        }
        assert!(tx.is_full());
        assert_eq!(tx.ring().evicted(), 0);

        for i in 0..4 {
            assert_eq!(rx.get(), Ok(i));
        }
        assert_eq!(rx.get(), Err(Empty));
    }

    #[test]
    fn put_when_full_evicts_oldest() {
        let (tx, rx) = OverwriteRing::<char>::new(3).unwrap().split();

        for c in ['A', 'B', 'C', 'D'] {
            assert!(tx.put(c).is_ok());
        }

        assert_eq!(tx.len(), 3);
        assert!(tx.is_full());
        assert_eq!(tx.ring().evicted(), 1);

        assert_eq!(rx.get(), Ok('B'));
        assert_eq!(rx.get(), Ok('C'));
        assert_eq!(rx.get(), Ok('D'));
        assert_eq!(rx.get(), Err(Empty));
    }

    #[test]
    fn keeps_last_capacity_values() {
        let (tx, rx) = OverwriteRing::<u64>::new(5).unwrap().split();

        for i in 0..23 {
            tx.put(i).unwrap();
        }
        assert_eq!(tx.ring().evicted(), 18);

        let drained: Vec<_> = rx.drain().collect();
        assert_eq!(drained, vec![18, 19, 20, 21, 22]);
    }

    #[test]
    fn single_capacity_keeps_latest() {
        let (tx, rx) = OverwriteRing::<u64>::new(1).unwrap().split();

        for i in 0..10 {
            tx.put(i).unwrap();
            assert!(tx.is_full());
        }

        assert_eq!(rx.get(), Ok(9));
        assert_eq!(rx.get(), Err(Empty));
    }

    #[test]
    fn interleaved_evictions_preserve_order() {
        let (tx, rx) = OverwriteRing::<u64>::new(3).unwrap().split();

        let mut next = 0;
        for _ in 0..50 {
            for _ in 0..5 {
                tx.put(next).unwrap();
                next += 1;
            }
            // Only the newest three of the five survive
            assert_eq!(rx.get(), Ok(next - 3));
            assert_eq!(rx.get(), Ok(next - 2));
            assert_eq!(rx.get(), Ok(next - 1));
            assert_eq!(rx.get(), Err(Empty));
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            OverwriteRing::<u64>::new(0),
            Err(CapacityError::Zero)
        ));
    }

    // ============================================================================
    // Cross-Thread
    // ============================================================================

    #[test]
    fn cross_thread_values_stay_ordered() {
        const COUNT: u64 = 200_000;

        let (tx, rx) = OverwriteRing::<u64>::new(10).unwrap().split();

        let producer = thread::spawn(move || {
            for i in 1..=COUNT {
                tx.put(i).unwrap();
            }
        });

        let consumer = thread::spawn(move || {
            let mut last = 0;
            let mut received = 0u64;
            loop {
                match rx.get() {
                    Ok(v) => {
                        assert!(v > last, "got {v} after {last}");
                        last = v;
                        received += 1;
                    }
                    Err(Empty) if rx.is_disconnected() && rx.is_empty() => break,
                    Err(Empty) => std::hint::spin_loop(),
                }
            }
            (last, received)
        });

        producer.join().unwrap();
        let (last, received) = consumer.join().unwrap();

        assert_eq!(last, COUNT);
        assert!(received > 0 && received <= COUNT);
    }

    #[test]
    fn cross_thread_wide_values_never_torn() {
        const COUNT: u64 = 50_000;

        // Every word equal; a copy raced by an eviction would mix two writes
        #[derive(Clone, Copy)]
        struct Wide([u64; 16]);

        for capacity in [1, 2, 3] {
            let (tx, rx) = OverwriteRing::<Wide>::new(capacity).unwrap().split();
            let ready = Arc::new(AtomicBool::new(false));

            let producer = {
                let ready = Arc::clone(&ready);
                thread::spawn(move || {
                    while !ready.load(Ordering::Acquire) {
                        thread::yield_now();
                    }
                    for i in 1..=COUNT {
                        tx.put(Wide([i; 16])).unwrap();
                        for _ in 0..16 {
                            std::hint::spin_loop();
                        }
                        if i % 8 == 0 {
                            thread::yield_now();
                        }
                    }
                })
            };

            ready.store(true, Ordering::Release);
            let mut last = 0;
            let mut received = 0u64;
            loop {
                match rx.get() {
                    Ok(Wide(words)) => {
                        let v = words[0];
                        assert!(words.iter().all(|&w| w == v), "torn value {words:?}");
                        assert!(v > last, "got {v} after {last}");
                        last = v;
                        received += 1;
                    }
                    Err(Empty) if rx.is_disconnected() && rx.is_empty() => break,
                    Err(Empty) => std::hint::spin_loop(),
                }
            }

            producer.join().unwrap();
            assert_eq!(last, COUNT, "capacity {capacity}");
            assert!(received > 1, "capacity {capacity}: received {received}");
        }
    }
}
