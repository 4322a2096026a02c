//! One producer thread, one consumer thread, a counting sequence.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow, ensure};
use spsc_ring::{Variant, ring_buffer};

/// Outcome of a transfer run.
#[derive(Debug)]
pub struct Report {
    pub variant: Variant,
    pub sent: u32,
    pub received: u32,
    pub elapsed: Duration,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            f64::from(self.received) / secs / 1e6
        } else {
            0.0
        };
        write!(
            f,
            "transfer {}: sent {} received {} in {:.2?} ({rate:.2} M/s)",
            self.variant, self.sent, self.received, self.elapsed
        )
    }
}

/// Sends `0..count` through a ring of `capacity`.
///
/// Bounded variants retry rejected puts, so every value must arrive in order.
/// The overwriting ring never rejects; the consumer may miss values but must
/// still see them in increasing order and must see the last one.
pub fn run(variant: Variant, capacity: usize, count: u32) -> anyhow::Result<Report> {
    let (tx, rx) = ring_buffer::<u32>(variant, capacity)
        .with_context(|| format!("creating {variant} ring of capacity {capacity}"))?;

    let start = Instant::now();

    let producer = thread::spawn(move || {
        for i in 0..count {
            while tx.put(i).is_err() {
                // Consumer bailed out on a failed check
                if tx.is_disconnected() {
                    return;
                }
                std::hint::spin_loop();
            }
        }
    });

    let consumer = thread::spawn(move || -> anyhow::Result<Vec<u32>> {
        let mut received = Vec::with_capacity(count as usize);
        loop {
            match rx.get() {
                Ok(v) => {
                    if let Some(&prev) = received.last() {
                        ensure!(v > prev, "received {v} after {prev}");
                    }
                    received.push(v);
                }
                // The producer is gone and nothing is left
                Err(_) if rx.is_disconnected() && rx.is_empty() => break,
                Err(_) => std::hint::spin_loop(),
            }
        }
        Ok(received)
    });

    producer
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;
    let received = consumer
        .join()
        .map_err(|_| anyhow!("consumer thread panicked"))??;
    let elapsed = start.elapsed();

    if variant.overwrites() {
        ensure!(
            count == 0 || received.last() == Some(&(count - 1)),
            "last value {} never arrived",
            count.saturating_sub(1)
        );
    } else {
        ensure!(
            received.len() == count as usize,
            "received {} of {count} values",
            received.len()
        );
    }

    let report = Report {
        variant,
        sent: count,
        received: u32::try_from(received.len()).context("received count overflow")?,
        elapsed,
    };
    tracing::info!(
        %variant,
        capacity,
        sent = report.sent,
        received = report.received,
        elapsed_ms = elapsed.as_millis() as u64,
        "transfer finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_variants_deliver_everything() {
        for variant in [Variant::Mutex, Variant::Atomic] {
            let report = run(variant, 100, 10_000).unwrap();
            assert_eq!(report.received, 10_000);
        }
    }

    #[test]
    fn overwrite_delivers_the_last_value() {
        let report = run(Variant::Overwrite, 4, 10_000).unwrap();
        assert!(report.received >= 1);
        assert!(report.received <= 10_000);
    }

    #[test]
    fn empty_transfer() {
        let report = run(Variant::Atomic, 8, 0).unwrap();
        assert_eq!(report.received, 0);
        assert!(report.to_string().starts_with("transfer atomic: sent 0 received 0"));
    }
}
