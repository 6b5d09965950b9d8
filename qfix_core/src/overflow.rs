use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::One;

use crate::{
    interval::Interval,
    value::{IntValue, Value},
};

/// Modular reduction of `value` into `range`. The overflow flag is `true`
/// iff the input was outside the range.
pub fn wraparound(value: &BigInt, range: &Interval<BigInt>) -> (BigInt, bool) {
    if range.contains_value(value) {
        (value.clone(), false)
    } else {
        let span = range.upper_bound() - range.lower_bound() + BigInt::one();
        let wrapped = (value - range.lower_bound()).mod_floor(&span) + range.lower_bound();
        (wrapped, true)
    }
}

/// Clamp of `value` to `range`. The overflow flag is `true` iff clamping
/// occurred.
pub fn saturate(value: &BigInt, range: &Interval<BigInt>) -> (BigInt, bool) {
    if value < range.lower_bound() {
        (range.lower_bound().clone(), true)
    } else if value > range.upper_bound() {
        (range.upper_bound().clone(), true)
    } else {
        (value.clone(), false)
    }
}

/// What to do with a mantissa that fell outside its legal range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum OverflowBehavior {
    /// Modular reduction into the legal range, as a dropped carry does
    Wraparound,
    /// Clamp to the nearest legal extreme
    Saturate,
}

impl OverflowBehavior {
    fn apply_scalar(&self, value: &BigInt, range: &Interval<BigInt>) -> (BigInt, bool) {
        match self {
            OverflowBehavior::Wraparound => wraparound(value, range),
            OverflowBehavior::Saturate => saturate(value, range),
        }
    }

    /// Maps `value` into `range`, returning the corrected value and whether
    /// any correction was needed.
    ///
    /// Saturation clamps range bounds independently. Wraparound of a range
    /// whose bounds straddle the legal limits collapses to the full legal
    /// range: once either bound wraps, the wrapped pair no longer brackets
    /// the intermediate values.
    pub fn apply(&self, value: &IntValue, range: &Interval<BigInt>) -> (IntValue, bool) {
        match value {
            Value::Scalar(x) => {
                let (corrected, overflow) = self.apply_scalar(x, range);
                (Value::Scalar(corrected), overflow)
            }
            Value::Range(iv) => {
                let (lower, lower_overflow) = self.apply_scalar(iv.lower_bound(), range);
                let (upper, upper_overflow) = self.apply_scalar(iv.upper_bound(), range);
                let overflow = lower_overflow || upper_overflow;
                if overflow && *self == OverflowBehavior::Wraparound {
                    (Value::Range(range.clone()), true)
                } else {
                    (Value::Range(Interval::new(lower, upper)), overflow)
                }
            }
            Value::Array(xs) => {
                let mut overflow = false;
                let corrected = xs
                    .iter()
                    .map(|x| {
                        let (c, o) = self.apply_scalar(x, range);
                        overflow |= o;
                        c
                    })
                    .collect();
                (Value::Array(corrected), overflow)
            }
        }
    }
}
