use core::{
    cmp::Ordering,
    fmt,
    ops::{Add, Deref, Mul, Neg, Shl, Shr, Sub},
};

use num_traits::Signed;
use qfix_core::{IntValue, RealValue};

use crate::{error::Error, representation::Representation, unit::active};

/// A fixed-point number whose every operation goes through the thread's
/// active processing unit.
///
/// `Number` wraps (and derefs to) a [`Representation`]; it adds no state,
/// only dispatch. The same expression evaluated under different active units
/// produces different bit-exact results, which is what lets one computation
/// be replayed under many candidate hardware configurations.
///
/// The `try_*` methods surface overflow/underflow as values. The operator
/// impls are conveniences in the usual style of panicking on what the
/// `try_*` form would return as an error, including the absence of an
/// active unit.
#[derive(Debug, Clone)]
pub struct Number(Representation);

/// Quantizes `value` under the thread's active unit
pub fn fixed<V: Into<RealValue>>(value: V) -> Result<Number, Error> {
    Number::from_value(value)
}

impl Number {
    /// Wraps an existing representation
    pub fn new(representation: Representation) -> Self {
        Self(representation)
    }

    /// Quantizes `value` under the active unit
    pub fn from_value<V: Into<RealValue>>(value: V) -> Result<Self, Error> {
        Ok(Self(active()?.represent(&value.into())?))
    }

    /// Checked float conversion; NaN and infinities fail with
    /// [`Error::NonFinite`]
    pub fn from_f64(x: f64) -> Result<Self, Error> {
        let value = RealValue::from_f64(x).ok_or(Error::NonFinite(x))?;
        Self::from_value(value)
    }

    /// Consumes `self`, returning the underlying representation
    pub fn into_repr(self) -> Representation {
        self.0
    }

    /// The underlying representation
    pub fn as_repr(&self) -> &Representation {
        &self.0
    }

    pub fn try_add(&self, other: &Number) -> Result<Number, Error> {
        Ok(Self(active()?.add(&self.0, &other.0)?))
    }

    pub fn try_sub(&self, other: &Number) -> Result<Number, Error> {
        Ok(Self(active()?.sub(&self.0, &other.0)?))
    }

    pub fn try_mul(&self, other: &Number) -> Result<Number, Error> {
        Ok(Self(active()?.mul(&self.0, &other.0)?))
    }

    pub fn try_neg(&self) -> Result<Number, Error> {
        Ok(Self(active()?.neg(&self.0)?))
    }

    pub fn try_shl(&self, n: usize) -> Result<Number, Error> {
        Ok(Self(active()?.shl(&self.0, n)?))
    }

    pub fn try_shr(&self, n: usize) -> Result<Number, Error> {
        Ok(Self(active()?.shr(&self.0, n)?))
    }

    /// Rounds toward zero to an integer value
    pub fn try_trunc(&self) -> Result<Number, Error> {
        Ok(Self(active()?.trunc(&self.0)?))
    }

    /// Rounds toward negative infinity to an integer value
    pub fn try_floor(&self) -> Result<Number, Error> {
        Ok(Self(active()?.floor(&self.0)?))
    }

    /// Rounds toward positive infinity to an integer value
    pub fn try_ceil(&self) -> Result<Number, Error> {
        Ok(Self(active()?.ceil(&self.0)?))
    }

    /// Rounds to the nearest integer value
    pub fn try_round(&self) -> Result<Number, Error> {
        Ok(Self(active()?.round(&self.0)?))
    }

    /// Mantissa-exact comparison under the active unit; the sign of the
    /// result orders `self` against `other`
    pub fn compare(&self, other: &Number) -> Result<IntValue, Error> {
        active()?.compare(&self.0, &other.0)
    }
}

impl Deref for Number {
    type Target = Representation;

    #[inline]
    fn deref(&self) -> &Representation {
        &self.0
    }
}

impl From<Representation> for Number {
    fn from(representation: Representation) -> Self {
        Self(representation)
    }
}

impl PartialEq for Number {
    /// Compares under the active unit. Two zeros are equal without
    /// consulting a unit.
    ///
    /// # Panics
    ///
    /// If there is no active unit or the comparison itself fails.
    fn eq(&self, other: &Self) -> bool {
        if self.is_zero() || other.is_zero() {
            return self.is_zero() && other.is_zero();
        }
        self.compare(other).unwrap().is_zero()
    }
}

impl PartialOrd for Number {
    /// Orders under the active unit. Range-valued numbers order
    /// conservatively: `None` unless every value of one dominates every
    /// value of the other.
    ///
    /// # Panics
    ///
    /// If there is no active unit or the comparison itself fails.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let difference = self.compare(other).unwrap();
        if difference.is_zero() {
            Some(Ordering::Equal)
        } else if difference.all(|d| d.is_negative()) {
            Some(Ordering::Less)
        } else if difference.all(|d| d.is_positive()) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

macro_rules! impl_binop {
    ($($imp:ident, $method:ident, $try:ident);*;) => {
        $(
            impl $imp for Number {
                type Output = Number;

                fn $method(self, rhs: Number) -> Number {
                    self.$try(&rhs).unwrap()
                }
            }

            impl<'a, 'b> $imp<&'b Number> for &'a Number {
                type Output = Number;

                fn $method(self, rhs: &'b Number) -> Number {
                    self.$try(rhs).unwrap()
                }
            }

            /// Quantizes `rhs` under the active unit, then operates
            impl $imp<f64> for Number {
                type Output = Number;

                fn $method(self, rhs: f64) -> Number {
                    self.$try(&Number::from_f64(rhs).unwrap()).unwrap()
                }
            }
        )*
    };
}

impl_binop!(
    Add, add, try_add;
    Sub, sub, try_sub;
    Mul, mul, try_mul;
);

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        self.try_neg().unwrap()
    }
}

impl<'a> Neg for &'a Number {
    type Output = Number;

    fn neg(self) -> Number {
        self.try_neg().unwrap()
    }
}

impl Shl<usize> for Number {
    type Output = Number;

    fn shl(self, n: usize) -> Number {
        self.try_shl(n).unwrap()
    }
}

impl Shr<usize> for Number {
    type Output = Number;

    fn shr(self, n: usize) -> Number {
        self.try_shr(n).unwrap()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
