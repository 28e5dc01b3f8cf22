#![cfg(target_arch = "x86_64")]

use crate::{host_supported, init, oracle};
use lsejit::{compile, compile_chained, Range};

#[test]
fn empty_batch_returns_zero() {
    init();
    if !host_supported() {
        return;
    }
    let batch = compile(&[]).unwrap();
    assert_eq!(batch.invoke(&[]), 0.0);
    assert_eq!(batch.invoke(&[1.0, 2.0, 3.0]), 0.0);
}

#[test]
fn single_width_one_range_is_exact() {
    init();
    if !host_supported() {
        return;
    }
    let batch = compile(&[Range::new(3, 1)]).unwrap();
    let mut data = [0.0; 8];
    data[3] = 7.5;
    // The width-1 bypass adds the element directly; no approximation is
    // involved, so the result is exact.
    assert_eq!(batch.invoke(&data), 7.5);
}

#[test]
fn width_two_probabilities_sum_to_one() {
    init();
    if !host_supported() {
        return;
    }
    let batch = compile(&[Range::new(0, 2)]).unwrap();
    let data = [0.25_f64.ln(), 0.75_f64.ln()];
    let got = batch.invoke(&data);
    // log(exp(log .25) + exp(log .75)) = 0; the approximations land within
    // a few percent of that.
    assert!(got.abs() < 5e-2, "got {got}");
    let expected = oracle::batch(&data, batch.ranges());
    assert!((got - expected).abs() < 1e-9, "jit {got} vs oracle {expected}");
}

#[test]
fn uniform_distribution_sums_to_one() {
    init();
    if !host_supported() {
        return;
    }
    let batch = compile(&[Range::new(0, 10)]).unwrap();
    let data: Vec<f64> = (0..10).map(|i| (f64::from(i + 1) / 55.0).ln()).collect();
    let got = batch.invoke(&data);
    assert!(got.abs() < 5e-2, "got {got}");
}

#[test]
fn multi_range_with_step_back_matches_oracle() {
    init();
    if !host_supported() {
        return;
    }
    let ranges = [Range::new(5, 3), Range::new(2, 4), Range::new(8, 2)];
    let batch = compile(&ranges).unwrap();
    // Log-probabilities of a fixed irregular distribution; the second range
    // steps the base pointer backwards.
    let data: Vec<f64> = (0..12)
        .map(|i| (f64::from(i) * 0.37 + 0.11).sin().abs().max(1e-3).ln())
        .collect();
    let got = batch.invoke(&data);
    let expected = oracle::batch(&data, &ranges);
    let rel = (got - expected).abs() / expected.abs().max(1.0);
    assert!(rel < 5e-2, "jit {got} vs oracle {expected}");
    // The oracle mirrors the emitted arithmetic operation for operation, so
    // the agreement is in fact much tighter than the law requires.
    assert!((got - expected).abs() < 1e-9, "jit {got} vs oracle {expected}");
}

#[test]
fn repeat_invocation_is_bit_stable() {
    init();
    if !host_supported() {
        return;
    }
    let batch = compile(&[Range::new(0, 4), Range::new(2, 1)]).unwrap();
    let data = [-0.5, -1.25, -2.0, -0.125, -3.0];
    let first = batch.invoke(&data).to_bits();
    for _ in 0..1_000_000 {
        assert_eq!(batch.invoke(&data).to_bits(), first);
    }
}

#[test]
fn chained_span_matches_oracle() {
    init();
    if !host_supported() {
        return;
    }
    let data: Vec<f64> = (0..10).map(|i| -0.3 * f64::from(i) - 0.2).collect();
    for width in 0..=lsejit::MAX_WIDTH {
        let span = compile_chained(width).unwrap();
        let got = span.invoke(&data);
        let expected = oracle::chained(&data, width);
        if width == 0 {
            assert_eq!(got, f64::NEG_INFINITY);
        } else {
            assert!(
                (got - expected).abs() < 1e-9,
                "width {width}: jit {got} vs oracle {expected}",
            );
        }
    }
}

#[test]
fn all_negative_infinity_span_collapses() {
    init();
    if !host_supported() {
        return;
    }
    let batch = compile(&[Range::new(0, 3)]).unwrap();
    let data = [f64::NEG_INFINITY; 3];
    assert_eq!(batch.invoke(&data), f64::NEG_INFINITY);
}

#[test]
fn released_handle_reports_cleanly() {
    init();
    if !host_supported() {
        return;
    }
    let batch = compile(&[Range::new(0, 2)]).unwrap();
    batch.release().unwrap();
}

#[test]
#[should_panic(expected = "shorter than the compiled extent")]
fn short_input_panics() {
    init();
    if !host_supported() {
        // The expected panic has to happen regardless.
        panic!("shorter than the compiled extent (host unsupported)");
    }
    let batch = compile(&[Range::new(4, 4)]).unwrap();
    let data = [0.0; 6];
    let _ = batch.invoke(&data);
}
