use core::fmt;

use qfix_core::{real, IntValue, OverflowError, RealValue};

use crate::{error::Error, formats::Format};

/// A bit-exact fixed-point value: an integer mantissa paired with the
/// [`Format`] giving it scale and range.
///
/// Immutable: arithmetic never mutates a representation, it produces new
/// ones. Construction checks that the mantissa is legal for the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Representation {
    mantissa: IntValue,
    format: Format,
}

impl Representation {
    /// Pairs `mantissa` with `format`, failing with an overflow error if the
    /// mantissa does not fit the format
    pub fn new(mantissa: IntValue, format: Format) -> Result<Self, Error> {
        if format.overflows_with(&mantissa) {
            return Err(OverflowError {
                value: format.value_of(&mantissa),
                limits: format.value_interval(),
            }
            .into());
        }
        Ok(Self { mantissa, format })
    }

    /// For callers that already range-checked or range-corrected the mantissa
    pub(crate) fn new_unchecked(mantissa: IntValue, format: Format) -> Self {
        debug_assert!(
            !format.overflows_with(&mantissa),
            "{mantissa} cannot be represented in {format}"
        );
        Self { mantissa, format }
    }

    /// The raw integer storage of `self`
    #[inline]
    pub fn mantissa(&self) -> &IntValue {
        &self.mantissa
    }

    /// The bit layout of `self`
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Consumes `self`, returning the mantissa and format
    #[inline]
    pub fn into_parts(self) -> (IntValue, Format) {
        (self.mantissa, self.format)
    }

    /// Returns `true` if the layout makes every representable value an
    /// integer
    pub fn is_integer(&self) -> bool {
        self.format.lsb >= 0
    }

    /// Returns `true` if `self` is zero everywhere
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// The exact value `self` denotes
    pub fn to_real(&self) -> RealValue {
        self.format.value_of(&self.mantissa)
    }

    /// Nearest-float view of a scalar representation, for diagnostics.
    /// Returns `None` for range- or array-valued mantissas.
    pub fn to_f64(&self) -> Option<f64> {
        self.to_real().as_scalar().map(real::to_f64)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} in {}", self.mantissa, self.format)
    }
}
