#![cfg(target_arch = "x86_64")]

use crate::{host_supported, init, oracle};
use lsejit::{compile, page_size, CompiledBatch, Range, MAX_WIDTH};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn armed_handles_are_send_and_sync() {
    assert_send_sync::<CompiledBatch>();
}

#[test]
fn regions_are_page_aligned() {
    init();
    if !host_supported() {
        return;
    }
    for ranges in [
        vec![],
        vec![Range::new(0, 1)],
        vec![Range::new(0, 10); 40],
    ] {
        let batch = compile(&ranges).unwrap();
        assert_eq!(batch.region_len() % page_size(), 0);
        assert!(batch.region_len() > 0);
        assert_eq!(batch.entry_addr() % page_size(), 0);
    }
}

#[test]
fn displacement_handles_any_signed_step() {
    init();
    if !host_supported() {
        return;
    }
    let data: Vec<f64> = (0..12).map(|i| f64::from(i) * 1.5 - 3.0).collect();
    for o1 in 0..12 {
        for o2 in 0..12 {
            let batch = compile(&[Range::new(o1, 1), Range::new(o2, 1)]).unwrap();
            let got = batch.invoke(&data);
            let expected = data[o1 as usize] + data[o2 as usize];
            // Width-1 ranges bypass the approximations, so the sum is exact
            // whichever direction the base pointer stepped.
            assert_eq!(got, expected, "offsets ({o1}, {o2})");
        }
    }
}

#[test]
fn parallel_invocations_agree_with_sequential() {
    init();
    if !host_supported() {
        return;
    }
    let ranges = [Range::new(0, 5), Range::new(3, 1), Range::new(1, 7)];
    let batch = compile(&ranges).unwrap();

    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let inputs: Vec<Vec<f64>> = (0..8)
        .map(|_| (0..16).map(|_| rng.gen_range(-9.0..0.0)).collect())
        .collect();
    let sequential: Vec<u64> = inputs.iter().map(|d| batch.invoke(d).to_bits()).collect();

    std::thread::scope(|scope| {
        for (data, &expected) in inputs.iter().zip(&sequential) {
            let batch = &batch;
            scope.spawn(move || {
                for _ in 0..1000 {
                    assert_eq!(batch.invoke(data).to_bits(), expected);
                }
            });
        }
    });
}

#[test]
fn random_batches_match_the_oracle() {
    init();
    if !host_supported() {
        return;
    }
    let mut rng = SmallRng::seed_from_u64(42);
    for _ in 0..50 {
        let data: Vec<f64> = (0..64).map(|_| rng.gen_range(-12.0..0.0)).collect();
        let n_ranges = rng.gen_range(0..10);
        let ranges: Vec<Range> = (0..n_ranges)
            .map(|_| {
                let width = rng.gen_range(1..=MAX_WIDTH as i32);
                let offset = rng.gen_range(0..=(64 - width));
                Range::new(offset, width)
            })
            .collect();
        let batch = compile(&ranges).unwrap();
        let got = batch.invoke(&data);
        let expected = oracle::batch(&data, &ranges);
        let rel = (got - expected).abs() / expected.abs().max(1.0);
        assert!(rel < 3e-2, "jit {got} vs oracle {expected} for {ranges:?}");
        assert!((got - expected).abs() <= 1e-9 * expected.abs().max(1.0));
    }
}

#[test]
fn overlapping_and_repeated_ranges_are_honored() {
    init();
    if !host_supported() {
        return;
    }
    let ranges = [
        Range::new(2, 4),
        Range::new(2, 4),
        Range::new(4, 2),
        Range::new(0, 8),
    ];
    let batch = compile(&ranges).unwrap();
    let data: Vec<f64> = (0..8).map(|i| -0.7 * f64::from(i) - 0.1).collect();
    let got = batch.invoke(&data);
    let expected = oracle::batch(&data, &ranges);
    assert!((got - expected).abs() < 1e-9, "jit {got} vs oracle {expected}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn jit_agrees_with_oracle_within_tolerance(
        ranges in prop::collection::vec(
            (0i32..48, 1i32..=MAX_WIDTH as i32).prop_map(|(offset, width)| Range::new(offset, width)),
            0..12,
        ),
        data in prop::collection::vec(-30.0f64..0.0, 64),
    ) {
        init();
        if !host_supported() {
            return Ok(());
        }
        let batch = compile(&ranges).unwrap();
        let got = batch.invoke(&data);
        let expected = oracle::batch(&data, &ranges);
        let rel = (got - expected).abs() / expected.abs().max(1.0);
        prop_assert!(rel < 3e-2, "jit {} vs oracle {}", got, expected);
    }
}
