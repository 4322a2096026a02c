//! Operation sequences checked against a `VecDeque` model.

use std::collections::VecDeque;

use proptest::prelude::*;
use spsc_ring::{Empty, Full, Variant, ring_buffer};

#[derive(Debug, Clone, Copy)]
enum Op {
    Put(u32),
    Get,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u32>().prop_map(Op::Put), Just(Op::Get)]
}

/// Runs `ops` against `variant` and a model, comparing after every step.
fn check(variant: Variant, capacity: usize, ops: &[Op]) -> Result<(), TestCaseError> {
    let (tx, rx) = ring_buffer::<u32>(variant, capacity).unwrap();
    let mut model = VecDeque::with_capacity(capacity);

    for &op in ops {
        match op {
            Op::Put(value) => {
                let result = tx.put(value);
                if model.len() < capacity {
                    prop_assert_eq!(result, Ok(()));
                    model.push_back(value);
                } else if variant.overwrites() {
                    prop_assert_eq!(result, Ok(()));
                    model.pop_front();
                    model.push_back(value);
                } else {
                    prop_assert_eq!(result, Err(Full(value)));
                }
            }
            Op::Get => {
                let expected = model.pop_front().ok_or(Empty);
                prop_assert_eq!(rx.get(), expected);
            }
        }

        prop_assert_eq!(rx.len(), model.len());
        prop_assert_eq!(rx.is_empty(), model.is_empty());
        prop_assert_eq!(tx.is_full(), model.len() == capacity);
        prop_assert!(rx.len() <= rx.capacity());
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn mutex_matches_model(
        capacity in 1usize..16,
        ops in proptest::collection::vec(op_strategy(), 0..400),
    ) {
        check(Variant::Mutex, capacity, &ops)?;
    }

    #[test]
    fn atomic_matches_model(
        capacity in 1usize..16,
        ops in proptest::collection::vec(op_strategy(), 0..400),
    ) {
        check(Variant::Atomic, capacity, &ops)?;
    }

    #[test]
    fn overwrite_matches_model(
        capacity in 1usize..16,
        ops in proptest::collection::vec(op_strategy(), 0..400),
    ) {
        check(Variant::Overwrite, capacity, &ops)?;
    }

    #[test]
    fn fifo_for_any_batch(values in proptest::collection::vec(any::<u32>(), 1..64)) {
        for variant in Variant::ALL {
            let (tx, rx) = ring_buffer::<u32>(variant, values.len()).unwrap();
            for &v in &values {
                prop_assert!(tx.put(v).is_ok());
            }
            let drained: Vec<u32> = rx.drain().collect();
            prop_assert_eq!(&drained, &values);
        }
    }
}
