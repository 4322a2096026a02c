//! Data race check.
//!
//! Every value packs a sequence id into the high half and a random payload
//! into the low half. The producer starts once the consumer is polling, paces
//! its puts and never retries a rejected one. The consumer polls until told to
//! stop, then drains what is left. Afterwards the consumed values must be
//! in increasing sequence order (precedence) and each one must be exactly a
//! value that was produced (consistency). A torn or stale slot read fails the
//! consistency check.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, anyhow, bail, ensure};
use rand::Rng;
use spsc_ring::{Variant, ring_buffer};

/// Aggregate over all iterations.
#[derive(Debug, Default)]
pub struct Report {
    pub iterations: usize,
    pub produced: u64,
    pub consumed: u64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "race: {} iterations, {} produced, {} consumed, no violations",
            self.iterations, self.produced, self.consumed
        )
    }
}

/// Busy iterations between two inserts, so the consumer keeps up.
const PACING_SPINS: usize = 32;
/// Inserts between two yields, so a single core still runs the consumer.
const YIELD_EVERY: usize = 4;

#[inline]
fn pack(seq: u32, payload: u32) -> u64 {
    (u64::from(seq) << 32) | u64::from(payload)
}

#[inline]
fn sequence(value: u64) -> u32 {
    (value >> 32) as u32
}

/// Runs `iterations` independent rounds of `count` values each.
pub fn run(
    variant: Variant,
    capacity: usize,
    count: u32,
    iterations: usize,
) -> anyhow::Result<Report> {
    let mut report = Report::default();
    let mut rng = rand::rng();

    for iteration in 0..iterations {
        let produced: Vec<u64> = (0..count).map(|seq| pack(seq, rng.random())).collect();
        let consumed = round(variant, capacity, produced.clone())
            .with_context(|| format!("iteration {iteration}"))?;

        check_precedence(&consumed).with_context(|| format!("iteration {iteration}"))?;
        check_consistency(&produced, &consumed)
            .with_context(|| format!("iteration {iteration}"))?;

        tracing::debug!(
            %variant,
            iteration,
            consumed = consumed.len(),
            "race iteration passed"
        );
        report.iterations += 1;
        report.produced += u64::from(count);
        report.consumed += consumed.len() as u64;
    }

    tracing::info!(
        %variant,
        capacity,
        iterations = report.iterations,
        produced = report.produced,
        consumed = report.consumed,
        "race finished"
    );
    Ok(report)
}

fn round(variant: Variant, capacity: usize, values: Vec<u64>) -> anyhow::Result<Vec<u64>> {
    let (tx, rx) = ring_buffer::<u64>(variant, capacity)
        .with_context(|| format!("creating {variant} ring of capacity {capacity}"))?;
    let produced = values.len();
    let ready = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    let consumer = {
        let ready = Arc::clone(&ready);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut consumed = Vec::new();
            ready.store(true, Ordering::Release);
            while !stop.load(Ordering::Acquire) {
                if let Ok(value) = rx.get() {
                    consumed.push(value);
                }
            }
            consumed.extend(rx.drain());
            consumed
        })
    };

    let producer = {
        let ready = Arc::clone(&ready);
        thread::spawn(move || {
            while !ready.load(Ordering::Acquire) {
                thread::yield_now();
            }
            for (i, value) in values.into_iter().enumerate() {
                let _ = tx.put(value);

                for _ in 0..PACING_SPINS {
                    std::hint::spin_loop();
                }
                if i % YIELD_EVERY == 0 {
                    thread::yield_now();
                }
            }
        })
    };

    producer
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;
    stop.store(true, Ordering::Release);
    let consumed = consumer
        .join()
        .map_err(|_| anyhow!("consumer thread panicked"))?;

    ensure!(
        produced == 0 || !consumed.is_empty(),
        "consumer observed none of {produced} values"
    );
    Ok(consumed)
}

/// Sequence ids must strictly increase.
fn check_precedence(consumed: &[u64]) -> anyhow::Result<()> {
    for pair in consumed.windows(2) {
        let (prev, seq) = (sequence(pair[0]), sequence(pair[1]));
        if seq <= prev {
            bail!("precedence violated: sequence {seq} read after {prev}");
        }
    }
    Ok(())
}

/// Every consumed value must appear in `produced`, which is sorted because
/// the sequence id occupies the high bits.
fn check_consistency(produced: &[u64], consumed: &[u64]) -> anyhow::Result<()> {
    debug_assert!(produced.is_sorted());

    for &value in consumed {
        if produced.binary_search(&value).is_err() {
            bail!(
                "consistency violated: {value:#018x} (sequence {}) was never produced",
                sequence(value)
            );
        }
    }
    Ok(())
}
