use num_rational::BigRational;
use num_traits::Signed;

use crate::{interval::Interval, real::to_f64, value::RealValue};

/// A result exceeded the representable range.
///
/// Overflow is an expected, frequent, and meaningful outcome for callers
/// searching a design space, not a failure of the arithmetic itself, so the
/// error carries enough structure to rank candidates: the offending value,
/// the range it had to fit, and a continuous [`margin`](Self::margin).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{value} overflows {limits}")]
pub struct OverflowError {
    /// The value that did not fit
    pub value: RealValue,
    /// The representable range it had to fit in
    pub limits: Interval<BigRational>,
}

/// A nonzero value quantized to zero.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{value} underflows a quantization step of {epsilon}")]
pub struct UnderflowError {
    /// The value that vanished
    pub value: RealValue,
    /// The quantization step it vanished below
    pub epsilon: BigRational,
}

/// Largest magnitude attained anywhere in `value`
fn magnitude_max(value: &RealValue) -> BigRational {
    value
        .parts()
        .iter()
        .map(|x| x.abs())
        .max()
        .expect("a value has at least one element")
}

/// Smallest of the per-element magnitude maxima, where a range element
/// contributes the larger magnitude of its two bounds
fn magnitude_min(value: &RealValue) -> BigRational {
    match value {
        RealValue::Range(iv) => iv.abs().upper_bound().clone(),
        _ => value
            .parts()
            .iter()
            .map(|x| x.abs())
            .min()
            .expect("a value has at least one element"),
    }
}

impl OverflowError {
    /// How infeasible this overflow was, in decibels: `10·log10` of the
    /// ratio between the largest representable magnitude and the largest
    /// magnitude of the offending value. Closer to zero means closer to
    /// feasible, so an external optimizer can rank near misses instead of
    /// treating every overflow alike.
    pub fn margin(&self) -> f64 {
        let limit = self.limits.abs().upper_bound().clone();
        10.0 * (to_f64(&limit) / to_f64(&magnitude_max(&self.value))).log10()
    }
}

impl UnderflowError {
    /// How infeasible this underflow was, in decibels: `10·log10` of the
    /// ratio between the vanished value's magnitude and the quantization
    /// step it fell below. Closer to zero means closer to feasible.
    pub fn margin(&self) -> f64 {
        10.0 * (to_f64(&magnitude_min(&self.value)) / to_f64(&self.epsilon)).log10()
    }
}
