//! Single-threaded walk through the ring contract.

use anyhow::{Context, ensure};
use spsc_ring::{Empty, Full, Variant, ring_buffer};

/// Half fill, drain, fill to capacity, put into the full ring, drain, get
/// from the empty ring. Every query is checked along the way.
pub fn run(variant: Variant, capacity: usize) -> anyhow::Result<()> {
    let (tx, rx) = ring_buffer::<u64>(variant, capacity)
        .with_context(|| format!("creating {variant} ring of capacity {capacity}"))?;

    ensure!(tx.capacity() == capacity, "capacity is {}", tx.capacity());
    ensure!(tx.len() == 0, "fresh ring holds {} elements", tx.len());
    ensure!(!tx.is_full(), "fresh ring reports full");
    ensure!(rx.is_empty(), "fresh ring reports non-empty");

    let half = capacity / 2;
    for i in 0..half as u64 {
        ensure!(tx.put(i).is_ok(), "put {i} rejected in half-full ring");
    }
    ensure!(!tx.is_full(), "half-full ring reports full");
    ensure!(rx.is_empty() == (half == 0), "half-full ring misreports empty");

    for i in 0..half as u64 {
        ensure!(rx.get() == Ok(i), "get did not return {i}");
    }
    ensure!(rx.is_empty(), "drained ring reports non-empty");

    for i in 0..capacity as u64 {
        ensure!(tx.put(i).is_ok(), "put {i} rejected before reaching capacity");
    }
    ensure!(tx.len() == tx.capacity(), "full ring holds {} elements", tx.len());
    ensure!(tx.is_full(), "full ring does not report full");

    let extra = tx.put(0);
    if variant.overwrites() {
        ensure!(extra.is_ok(), "overwriting put rejected");
    } else {
        ensure!(extra == Err(Full(0)), "put into full ring was accepted");
    }
    ensure!(tx.len() == capacity, "length changed to {} at capacity", tx.len());

    // Overwriting evicted the 0 at the tail and appended another 0
    let expected: Vec<u64> = if variant.overwrites() {
        (1..capacity as u64).chain([0]).collect()
    } else {
        (0..capacity as u64).collect()
    };
    for want in expected {
        let got = rx.get();
        ensure!(got == Ok(want), "expected {want}, got {got:?}");
    }
    ensure!(rx.len() == 0, "drained ring holds {} elements", rx.len());

    ensure!(rx.is_empty(), "drained ring reports non-empty");
    ensure!(rx.get() == Err(Empty), "get from empty ring succeeded");

    tracing::debug!(%variant, capacity, "basic walk-through passed");
    Ok(())
}
