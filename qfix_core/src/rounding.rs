use core::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::{
    interval::Interval,
    real::pow2,
    value::{IntValue, RealValue},
};

/// Quantization strategy applied whenever a value is forced onto a coarser
/// grid.
///
/// Each strategy supplies three things: the scalar rounding function itself
/// ([`apply`](Self::apply)), a bit-exact requantization of integer mantissas
/// under a change of scale ([`shift`](Self::shift)), and an analytic bound on
/// the error a quantization step can introduce
/// ([`error_bounds`](Self::error_bounds)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    /// Round to the nearest integer, ties to even
    Nearest,
    /// Round toward negative infinity
    Floor,
    /// Round toward positive infinity
    Ceil,
    /// Round toward zero
    Truncate,
}

impl Rounding {
    /// Rounds `x` to an integer
    pub fn apply(&self, x: &BigRational) -> BigInt {
        match self {
            Rounding::Floor => x.floor().to_integer(),
            Rounding::Ceil => x.ceil().to_integer(),
            Rounding::Truncate => x.trunc().to_integer(),
            Rounding::Nearest => {
                let floor = x.floor().to_integer();
                let frac = x - BigRational::from_integer(floor.clone());
                let twice = &frac + &frac;
                match twice.cmp(&BigRational::one()) {
                    Ordering::Less => floor,
                    Ordering::Greater => floor + 1,
                    Ordering::Equal => {
                        if floor.is_even() {
                            floor
                        } else {
                            floor + 1
                        }
                    }
                }
            }
        }
    }

    /// [`apply`](Self::apply) over every element of `x`
    pub fn apply_value(&self, x: &RealValue) -> IntValue {
        x.map(|b| self.apply(b))
    }

    /// Requantizes the integer mantissa `m` after its scale moved by `n`
    /// bits, without converting through a real value. Positive `n` is an
    /// exact left shift; negative `n` is a lossy right shift rounded per
    /// `self`: `Nearest` adds the first dropped bit, `Truncate` keeps
    /// whichever of the floor/ceil results has the smaller magnitude, and
    /// `Ceil` is `-floor(-m)`.
    pub fn shift(&self, m: &BigInt, n: isize) -> BigInt {
        match self {
            Rounding::Floor => floor_shift(m, n),
            Rounding::Ceil => -floor_shift(&-m, n),
            Rounding::Nearest => {
                let mut result = floor_shift(m, n);
                if n < 0 {
                    // the most significant dropped bit
                    if (m >> ((-n - 1) as usize)).is_odd() {
                        result += 1;
                    }
                }
                result
            }
            Rounding::Truncate => {
                let floored = floor_shift(m, n);
                let ceiled = -floor_shift(&-m, n);
                if floored.magnitude() <= ceiled.magnitude() {
                    floored
                } else {
                    ceiled
                }
            }
        }
    }

    /// [`shift`](Self::shift) over every element of `m`
    pub fn shift_value(&self, m: &IntValue, n: isize) -> IntValue {
        m.map(|b| self.shift(b, n))
    }

    /// Bounds the error introduced by quantizing to a step of
    /// `2^output_lsb`. When the input was itself already quantized to a
    /// finer step of `2^input_lsb`, the bound tightens: no error below that
    /// resolution existed to begin with.
    pub fn error_bounds(&self, output_lsb: isize, input_lsb: Option<isize>) -> Interval<BigRational> {
        let out = pow2(output_lsb);
        let half = pow2(output_lsb - 1);
        match (self, input_lsb) {
            (Rounding::Nearest, None) => Interval::new(-half.clone(), half),
            (Rounding::Nearest, Some(i)) => Interval::new(-half.clone() + pow2(i), half),
            (Rounding::Floor, None) => Interval::new(-out, BigRational::zero()),
            (Rounding::Floor, Some(i)) => Interval::new(-out + pow2(i), BigRational::zero()),
            (Rounding::Ceil, None) => Interval::new(BigRational::zero(), out),
            (Rounding::Ceil, Some(i)) => Interval::new(BigRational::zero(), out - pow2(i)),
            (Rounding::Truncate, None) => Interval::new(-out.clone(), out),
            (Rounding::Truncate, Some(i)) => {
                Interval::new(-out.clone() + pow2(i), out - pow2(i))
            }
        }
    }
}

fn floor_shift(m: &BigInt, n: isize) -> BigInt {
    match n {
        0 => m.clone(),
        n if n > 0 => m << (n as usize),
        n => m >> ((-n) as usize),
    }
}
