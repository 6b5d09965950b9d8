//! Exact real-number helpers.
//!
//! Values entering quantization are held as arbitrary-precision rationals,
//! so scaling by powers of two, taking the integer log2, and rounding onto a
//! bit grid are all error-free operations. Nothing in this module
//! approximates.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};

use crate::{
    rounding::Rounding,
    value::{IntValue, RealValue},
};

/// `2^e` as an exact rational, for any sign of `e`
pub fn pow2(e: isize) -> BigRational {
    if e >= 0 {
        BigRational::from_integer(BigInt::one() << (e as usize))
    } else {
        BigRational::new(BigInt::one(), BigInt::one() << ((-e) as usize))
    }
}

/// Converts a finite float to the exact rational it denotes. Returns `None`
/// for NaN and infinities.
pub fn rational_from_f64(x: f64) -> Option<BigRational> {
    BigRational::from_float(x)
}

/// Nearest-float view of an exact rational, for diagnostics only
pub fn to_f64(x: &BigRational) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

/// `floor(log2(x))` for `x > 0`, exact
fn floor_log2(x: &BigRational) -> isize {
    debug_assert!(x.is_positive());
    // `2^(d-1) < x < 2^(d+1)` holds for the bit-length difference `d`
    let d = (x.numer().bits() as i64 - x.denom().bits() as i64) as isize;
    if *x >= pow2(d) {
        d
    } else {
        d - 1
    }
}

/// `ceil(log2(x))` for `x > 0`, exact
fn ceil_log2(x: &BigRational) -> isize {
    let c = floor_log2(x);
    if *x == pow2(c) {
        c
    } else {
        c + 1
    }
}

/// The most significant bit position needed to hold `x`: `floor(log2(x))`
/// plus a sign bit for positive values, `ceil(log2(-x))` for negative
/// values, and `None` at zero (no bits needed).
pub fn msb(x: &BigRational, signed: bool) -> Option<isize> {
    if x.is_positive() {
        Some(floor_log2(x) + signed as isize)
    } else if x.is_negative() {
        Some(ceil_log2(&-x))
    } else {
        None
    }
}

/// [`msb`] over every element of `x`, taking the largest. `None` if `x` is
/// zero everywhere.
pub fn msb_value(x: &RealValue, signed: bool) -> Option<isize> {
    x.parts().iter().filter_map(|b| msb(b, signed)).max()
}

/// Rounds `x * 2^nbits` to an integer under `rounding`
pub fn quantize(x: &BigRational, nbits: isize, rounding: Rounding) -> BigInt {
    rounding.apply(&(x * pow2(nbits)))
}

/// [`quantize`] over every element of `x`
pub fn quantize_value(x: &RealValue, nbits: isize, rounding: Rounding) -> IntValue {
    let scale = pow2(nbits);
    x.map(|b| rounding.apply(&(b * &scale)))
}
