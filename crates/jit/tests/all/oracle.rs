//! Scalar interpreters with exactly the semantics of the emitted code,
//! used as oracles by the scenario and property tests.

use lsejit::approx::{fast_exp, fast_log};
use lsejit::Range;

/// One stabilized reduction over a span, the shape the non-bypass template
/// sequence computes: running max, `fast_exp` accumulation against it,
/// `fast_log` plus the max. No early returns; the emitted code has none.
pub fn log_sum_exp(span: &[f64]) -> f64 {
    let mut a_max = f64::NEG_INFINITY;
    for &x in span {
        a_max = a_max.max(x);
    }
    let mut acc = 0.0;
    for &x in span {
        acc += fast_exp(x - a_max);
    }
    fast_log(acc) + a_max
}

/// Interpret a batch the way the batch callable was compiled: ranges in
/// order, each either the width-1 bypass or the full reduction.
pub fn batch(data: &[f64], ranges: &[Range]) -> f64 {
    let mut total = 0.0;
    for r in ranges {
        let span = &data[r.offset as usize..][..r.width as usize];
        if let [x] = span {
            total += x;
        } else {
            total += log_sum_exp(span);
        }
    }
    total
}

/// Interpret the chained single-span form. Unlike the batch path there is
/// no width-1 bypass; a zero width evaluates to `-inf`.
pub fn chained(data: &[f64], width: usize) -> f64 {
    log_sum_exp(&data[..width])
}
