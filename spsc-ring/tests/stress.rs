//! Concurrency regression: wide tagged messages through a small ring.
//!
//! Every word of a message carries the same sequence id, so a copy that mixes
//! two writes shows up as a message with differing words. The producer waits
//! for the consumer to start, paces itself, and never retries a rejected
//! insert. Everything the consumer sees must be a whole message and sequence
//! ids must only grow.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use spsc_ring::{Variant, ring_buffer};

const VALUES: u64 = 100_000;
const ROUNDS: usize = 10;
const WIDTH: usize = 16;

/// Busy iterations between two inserts.
const PACING_SPINS: usize = 32;
/// Inserts between two yields, so a single core still runs the consumer.
const YIELD_EVERY: u64 = 4;

/// 128 bytes; too wide to be copied in one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Message([u64; WIDTH]);

impl Message {
    fn new(seq: u64) -> Self {
        Self([seq; WIDTH])
    }

    /// The sequence id, or `None` if the words disagree.
    fn seq(&self) -> Option<u64> {
        let first = self.0[0];
        self.0.iter().all(|&w| w == first).then_some(first)
    }
}

fn run_round(variant: Variant, capacity: usize) -> Vec<Message> {
    let (tx, rx) = ring_buffer::<Message>(variant, capacity).unwrap();
    let ready = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    let consumer = {
        let ready = Arc::clone(&ready);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut consumed = Vec::new();
            ready.store(true, Ordering::Release);
            while !stop.load(Ordering::Acquire) {
                if let Ok(message) = rx.get() {
                    consumed.push(message);
                }
            }
            // Whatever the producer left behind
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
            for seq in 0..VALUES {
                // Rejections are expected for the non-overwriting variants
                let _ = tx.put(Message::new(seq));

                for _ in 0..PACING_SPINS {
                    std::hint::spin_loop();
                }
                if seq % YIELD_EVERY == 0 {
                    thread::yield_now();
                }
            }
        })
    };

    producer.join().unwrap();
    stop.store(true, Ordering::Release);
    consumer.join().unwrap()
}

fn check_round(variant: Variant, capacity: usize, consumed: &[Message]) {
    let mut previous: Option<u64> = None;

    for message in consumed {
        let seq = message
            .seq()
            .unwrap_or_else(|| panic!("{variant}/{capacity}: torn message {message:?}"));

        assert!(
            seq < VALUES,
            "{variant}/{capacity}: sequence {seq} was never produced"
        );
        if let Some(previous) = previous {
            assert!(
                seq > previous,
                "{variant}/{capacity}: sequence {seq} observed after {previous}"
            );
        }
        previous = Some(seq);
    }
}

fn stress(variant: Variant, capacity: usize, min_consumed: usize) {
    for _ in 0..ROUNDS {
        let consumed = run_round(variant, capacity);
        check_round(variant, capacity, &consumed);

        assert!(
            consumed.len() >= min_consumed,
            "{variant}/{capacity}: consumed only {} of {VALUES}",
            consumed.len()
        );
    }
}

#[test]
fn wide_messages_mutex() {
    stress(Variant::Mutex, 10, VALUES as usize / 100);
}

#[test]
fn wide_messages_atomic() {
    stress(Variant::Atomic, 10, VALUES as usize / 100);
}

#[test]
fn wide_messages_atomic_single_slot() {
    stress(Variant::Atomic, 1, VALUES as usize / 100);
}

#[test]
fn wide_messages_overwrite() {
    // Tiny rings keep the producer evicting the slot the consumer is copying
    for capacity in [1, 2, 3, 10] {
        stress(Variant::Overwrite, capacity, 1);
    }
}

#[test]
fn message_detects_mixed_words() {
    assert_eq!(Message::new(7).seq(), Some(7));

    let mut torn = Message::new(7);
    torn.0[WIDTH - 1] = 8;
    assert_eq!(torn.seq(), None);
}
