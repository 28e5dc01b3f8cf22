//! Bit-affine approximations of `exp` and `log`.
//!
//! Both approximations exploit the layout of IEEE-754 doubles: scaling an
//! argument by `S / ln 2` and adding a bias lands the integer part of the
//! result directly in the exponent field once the value is truncated to an
//! `i64` and reinterpreted as a double. `fast_log` is the affine inverse of
//! that map. See Schraudolph, "A Fast, Compact Approximation of the
//! Exponential Function", and Curioni, "Fast Exponential Computation on SIMD
//! Architectures".
//!
//! The same coefficients are baked into the instruction templates as `movabs`
//! immediates, so the emitted code performs no library call. The scalar
//! functions here are the executable definition of what the templates
//! compute; a unit test in the x64 catalog checks the immediate bytes against
//! these constants.

use core::f64::consts::LN_2;

/// Shift applied when the scaled exponent is accumulated into a 64-bit
/// integer rather than Schraudolph's original 32-bit one.
pub const S0: u32 = 32;

/// `S = 2^(20 + S0)`: one unit in the last place of the double exponent
/// field, viewed from the integer side.
pub const EXP_SCALE: f64 = (1u64 << (20 + S0)) as f64;

const SHIFT_SCALE: f64 = (1u64 << S0) as f64;

/// `A = S / ln 2`, the multiplicative coefficient of the forward map.
pub const EXP_COEFF: f64 = EXP_SCALE / LN_2;

/// `B - C`, where `B = 1023 * S` centers the exponent bias and
/// `C = 60801 * 2^S0` is Schraudolph's mean-error correction. Both products
/// and their difference are exactly representable.
pub const EXP_BIAS: f64 = 1023.0 * EXP_SCALE - 60801.0 * SHIFT_SCALE;

/// Arguments below this produce garbage from the affine map (the biased
/// exponent underflows), so `fast_exp` clamps them to zero.
pub const EXP_MIN_ARG: f64 = -706.0;

/// `A^-1`, the coefficient of the inverse map.
pub const LOG_COEFF: f64 = 1.0 / EXP_COEFF;

/// `-A^-1 * (B - C)`, the additive term of the inverse map, distributed so
/// the whole inverse is a single fused multiply-add.
pub const LOG_BIAS: f64 = LOG_COEFF * -EXP_BIAS;

/// Approximate `e^x` with one fused multiply-add, a truncating cast and a
/// bit reinterpret. Arguments below [`EXP_MIN_ARG`] (including `-inf` and
/// NaN) yield `0.0`.
pub fn fast_exp(x: f64) -> f64 {
    let z = f64::from_bits(EXP_COEFF.mul_add(x, EXP_BIAS) as i64 as u64);
    if x >= EXP_MIN_ARG { z } else { 0.0 }
}

/// Approximate `ln x` by inverting the bit-affine map. Non-positive
/// arguments (including NaN) yield `-inf`.
pub fn fast_log(x: f64) -> f64 {
    let z = LOG_COEFF.mul_add(x.to_bits() as i64 as f64, LOG_BIAS);
    if x > 0.0 { z } else { f64::NEG_INFINITY }
}
