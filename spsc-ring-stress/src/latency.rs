//! Ping-pong round trip latency.
//!
//! Two rings of the same variant: the main thread puts into the first and
//! waits on the second, an echo thread moves each value across. Half of each
//! round trip is recorded as the one-way latency.

use std::fmt;
use std::thread;
use std::time::Instant;

use anyhow::{Context, anyhow};
use hdrhistogram::Histogram;
use spsc_ring::{Variant, ring_buffer};

/// Samples above this are clamped (nanoseconds).
const MAX_RECORDED_NS: u64 = 10_000_000;

/// One-way latency quantiles in nanoseconds.
#[derive(Debug)]
pub struct Report {
    pub variant: Variant,
    pub histogram: Histogram<u64>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.histogram;
        writeln!(f, "=== {} one-way latency (ns) ===", self.variant)?;
        writeln!(f, "  samples: {:>9}", h.len())?;
        writeln!(f, "  min:     {:>9}", h.min())?;
        writeln!(f, "  mean:    {:>9.0}", h.mean())?;
        writeln!(f, "  p50:     {:>9}", h.value_at_quantile(0.50))?;
        writeln!(f, "  p90:     {:>9}", h.value_at_quantile(0.90))?;
        writeln!(f, "  p99:     {:>9}", h.value_at_quantile(0.99))?;
        writeln!(f, "  p999:    {:>9}", h.value_at_quantile(0.999))?;
        writeln!(f, "  p9999:   {:>9}", h.value_at_quantile(0.9999))?;
        write!(f, "  max:     {:>9}", h.max())
    }
}

pub fn run(
    variant: Variant,
    capacity: usize,
    warmup: usize,
    samples: usize,
) -> anyhow::Result<Report> {
    let (ping_tx, ping_rx) = ring_buffer::<u64>(variant, capacity)
        .with_context(|| format!("creating {variant} ring of capacity {capacity}"))?;
    let (pong_tx, pong_rx) = ring_buffer::<u64>(variant, capacity)
        .with_context(|| format!("creating {variant} ring of capacity {capacity}"))?;

    let total = warmup + samples;

    let echo = thread::spawn(move || {
        for _ in 0..total {
            let value = loop {
                match ping_rx.get() {
                    Ok(v) => break v,
                    Err(_) => std::hint::spin_loop(),
                }
            };
            while pong_tx.put(value).is_err() {
                std::hint::spin_loop();
            }
        }
    });

    let round_trip = |i: u64| {
        while ping_tx.put(i).is_err() {
            std::hint::spin_loop();
        }
        while pong_rx.get().is_err() {
            std::hint::spin_loop();
        }
    };

    for i in 0..warmup as u64 {
        round_trip(i);
    }

    let mut histogram =
        Histogram::<u64>::new_with_max(MAX_RECORDED_NS, 3).context("creating histogram")?;

    for i in 0..samples as u64 {
        let start = Instant::now();
        round_trip(i);
        let one_way = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX) / 2;
        histogram.saturating_record(one_way.min(MAX_RECORDED_NS));
    }

    echo.join().map_err(|_| anyhow!("echo thread panicked"))?;

    tracing::info!(
        %variant,
        capacity,
        samples,
        p50_ns = histogram.value_at_quantile(0.50),
        p99_ns = histogram.value_at_quantile(0.99),
        "latency finished"
    );

    Ok(Report { variant, histogram })
}
