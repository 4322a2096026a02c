//! Error types for ring buffer construction and operations.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// The ring buffer could not be constructed.
///
/// Returned by every constructor, so a bad capacity or a failed allocation is
/// reported before the buffer is ever used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// A capacity of zero was requested.
    ///
    /// With a single internal slot every insert would collide with the empty
    /// tail, so the buffer would be full and empty at once.
    #[error("ring buffer capacity must be non-zero")]
    Zero,
    /// `capacity + 1` slots cannot be addressed on this target.
    #[error("ring buffer capacity {capacity} is too large")]
    Overflow {
        /// The requested capacity.
        capacity: usize,
    },
    /// The allocator refused the slot array.
    #[error("failed to allocate ring buffer slots")]
    Alloc(#[from] TryReserveError),
}

/// Insert rejected because the buffer is full.
///
/// Carries the value that could not be inserted.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
#[error("ring buffer is full")]
pub struct Full<T>(
    /// The value that could not be inserted.
    pub T,
);

impl<T> Full<T> {
    /// Returns the value that could not be inserted.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

/// Remove rejected because the buffer is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ring buffer is empty")]
pub struct Empty;

/// A variant name that is not one of `mutex`, `atomic` or `overwrite`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ring buffer variant `{0}` (expected mutex, atomic or overwrite)")]
pub struct UnknownVariant(
    /// The name that was given.
    pub String,
);
