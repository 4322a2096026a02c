//! # spsc-ring
//!
//! Fixed-capacity ring buffers for handing values from exactly one producer
//! thread to exactly one consumer thread.
//!
//! ## Variants
//!
//! - [`MutexRing`]: one lock around both indices; the correctness baseline
//! - [`AtomicRing`]: lock-free, acquire/release on atomic head and tail
//! - [`OverwriteRing`]: lock-free, evicts the oldest element instead of
//!   rejecting an insert when full (experimental)
//!
//! All three implement [`RingBuffer`] and are interchangeable behind it.
//!
//! ## Design
//!
//! - One allocation of `capacity + 1` slots at construction, never resized
//! - The spare slot lets `head == tail` mean empty and `next(head) == tail`
//!   mean full
//! - Nothing blocks: `put` and `get` return immediately with a definite result
//! - Producer and consumer indices live on separate cache lines
//!
//! ## Example
//!
//! ```
//! use spsc_ring::{Variant, ring_buffer};
//!
//! // Capacity is exact, not rounded
//! let (tx, rx) = ring_buffer::<u64>(Variant::Atomic, 3).unwrap();
//!
//! tx.put(1).unwrap();
//! tx.put(2).unwrap();
//! tx.put(3).unwrap();
//! assert!(tx.put(4).is_err());
//!
//! assert_eq!(rx.get(), Ok(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod atomic;
mod error;
mod handle;
mod mutex;
mod overwrite;
mod storage;

use std::fmt;
use std::str::FromStr;

pub use atomic::AtomicRing;
pub use error::{CapacityError, Empty, Full, UnknownVariant};
pub use handle::{Consumer, Drain, Producer, split, split_dyn};
pub use mutex::MutexRing;
pub use overwrite::OverwriteRing;

/// Operations shared by every ring variant.
///
/// The queries are safe and advisory: under concurrency the answer may be
/// stale by the time it is returned. Inserting and removing are `unsafe`
/// because the lock-free variants rely on there being a single producer and a
/// single consumer. [`split`] turns a ring into a [`Producer`] and a
/// [`Consumer`] that uphold this by ownership.
pub trait RingBuffer<T>: Send + Sync {
    /// Inserts `value` at the head.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the ring is full; nothing is changed. The
    /// overwriting ring evicts its oldest element instead and never fails.
    ///
    /// # Safety
    ///
    /// At most one thread may be executing `put` on this ring at any time.
    unsafe fn put(&self, value: T) -> Result<(), Full<T>>;

    /// Removes the oldest element.
    ///
    /// # Errors
    ///
    /// Returns `Err(Empty)` if the ring is empty; nothing is changed.
    ///
    /// # Safety
    ///
    /// At most one thread may be executing `get` on this ring at any time.
    unsafe fn get(&self) -> Result<T, Empty>;

    /// Returns `true` if the ring holds no elements.
    fn is_empty(&self) -> bool;

    /// Returns `true` if the ring is at capacity.
    fn is_full(&self) -> bool;

    /// Returns the number of elements in the ring.
    fn len(&self) -> usize;

    /// Returns the maximum number of elements the ring can hold.
    fn capacity(&self) -> usize;
}

/// Which ring implementation [`ring_buffer`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// [`MutexRing`]
    Mutex,
    /// [`AtomicRing`]
    Atomic,
    /// [`OverwriteRing`]
    Overwrite,
}

impl Variant {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 3] = [Self::Mutex, Self::Atomic, Self::Overwrite];

    /// The lowercase name accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mutex => "mutex",
            Self::Atomic => "atomic",
            Self::Overwrite => "overwrite",
        }
    }

    /// Returns `true` if `put` evicts instead of failing when full.
    pub const fn overwrites(self) -> bool {
        matches!(self, Self::Overwrite)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Creates a ring of the chosen variant and splits it into endpoints.
///
/// The endpoints erase the variant behind `dyn RingBuffer<T>`, so callers
/// depend only on the shared contract.
///
/// `T: Copy` is required because [`OverwriteRing`] needs it, even when
/// `variant` names one of the bounded rings. For non-`Copy` elements construct
/// a [`MutexRing`] or [`AtomicRing`] directly and pass it to [`split_dyn`].
///
/// # Errors
///
/// Returns [`CapacityError`] if `capacity` is zero or the slots cannot be
/// allocated.
///
/// # Example
///
/// ```
/// use spsc_ring::{Variant, ring_buffer};
///
/// let (tx, rx) = ring_buffer::<u32>(Variant::Overwrite, 2).unwrap();
///
/// tx.put(1).unwrap();
/// tx.put(2).unwrap();
/// tx.put(3).unwrap(); // evicts 1
///
/// assert_eq!(rx.get(), Ok(2));
/// ```
pub fn ring_buffer<T>(
    variant: Variant,
    capacity: usize,
) -> Result<(Producer<T>, Consumer<T>), CapacityError>
where
    T: Copy + Send + 'static,
{
    let endpoints = match variant {
        Variant::Mutex => split_dyn(MutexRing::new(capacity)?),
        Variant::Atomic => split_dyn(AtomicRing::new(capacity)?),
        Variant::Overwrite => split_dyn(OverwriteRing::new(capacity)?),
    };

    tracing::debug!(%variant, capacity, "created ring buffer");

    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(variant.to_string().parse::<Variant>(), Ok(variant));
        }
        assert_eq!("ATOMIC".parse::<Variant>(), Ok(Variant::Atomic));
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let err = "lockless".parse::<Variant>().unwrap_err();
        assert_eq!(err, UnknownVariant("lockless".to_string()));
        assert!(err.to_string().contains("lockless"));
    }

    #[test]
    fn ring_buffer_builds_every_variant() {
        for variant in Variant::ALL {
            let (tx, rx) = ring_buffer::<u64>(variant, 3).unwrap();
            assert_eq!(tx.capacity(), 3);
            assert!(rx.is_empty());

            for i in 0..3 {
                tx.put(i).unwrap();
            }
            assert!(tx.is_full());
            assert_eq!(tx.put(3).is_ok(), variant.overwrites());
        }
    }

    #[test]
    fn split_dyn_erases_bounded_rings_with_owned_elements() {
        let pairs: Vec<(Producer<String>, Consumer<String>)> = vec![
            split_dyn(MutexRing::new(2).unwrap()),
            split_dyn(AtomicRing::new(2).unwrap()),
        ];

        for (tx, rx) in &pairs {
            tx.put("first".to_string()).unwrap();
            tx.put("second".to_string()).unwrap();
            assert_eq!(tx.put("third".to_string()), Err(Full("third".to_string())));

            assert_eq!(rx.get().as_deref(), Ok("first"));
            assert_eq!(rx.get().as_deref(), Ok("second"));
            assert_eq!(rx.get(), Err(Empty));
        }
    }

    #[test]
    fn ring_buffer_rejects_zero_capacity() {
        for variant in Variant::ALL {
            assert!(matches!(
                ring_buffer::<u64>(variant, 0),
                Err(CapacityError::Zero)
            ));
        }
    }
}
