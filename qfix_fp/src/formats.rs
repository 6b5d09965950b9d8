use core::{fmt, num::NonZeroUsize, str::FromStr};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use qfix_core::{
    real::{self, pow2},
    Element, Interval, IntValue, RealValue, Rounding, Value,
};

use crate::{error::Error, representation::Representation};

/// Bit layout of a fixed-point value: the exponents of its most and least
/// significant bits and whether a sign bit is carried.
///
/// A mantissa `m` stored under a format denotes the value `m · 2^lsb`.
/// Formats are immutable value objects; everything else about them —
/// wordlength, legal mantissa range, representable value range, quantization
/// step — is derived.
///
/// Two textual notations round-trip through
/// [`from_notation`](Self::from_notation) and the `to_*notation` methods: Q
/// notation
/// (`"Q8.0"`, `"uQ0.8"`, where the first figure counts integer bits
/// including the sign) and parenthesis notation (`"(7,0)"`, `"u(0,-8)"`,
/// giving the MSB and LSB exponents directly). A leading `u` marks an
/// unsigned layout and a leading `s` is accepted for an explicitly signed
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct Format {
    pub msb: isize,
    pub lsb: isize,
    pub signed: bool,
}

impl Format {
    /// Creates a format from explicit bit positions.
    ///
    /// # Panics
    ///
    /// If `lsb > msb`.
    #[track_caller]
    pub fn new(msb: isize, lsb: isize, signed: bool) -> Self {
        match Self::checked_new(msb, lsb, signed) {
            Some(format) => format,
            None => panic!(
                "least significant bit {lsb} cannot be above most significant bit {msb}"
            ),
        }
    }

    /// Fallible version of [`Format::new`], returning `None` if `lsb > msb`
    pub fn checked_new(msb: isize, lsb: isize, signed: bool) -> Option<Self> {
        if lsb > msb {
            None
        } else {
            Some(Self { msb, lsb, signed })
        }
    }

    /// Signed Q format with `a` integer bits (sign included) and `b`
    /// fraction bits: `q(1, 7)` is the unit-range `Q1.7`
    #[track_caller]
    pub fn q(a: isize, b: isize) -> Self {
        Self::new(a - 1, -b, true)
    }

    /// Unsigned Q format with `a` integer bits and `b` fraction bits
    #[track_caller]
    pub fn uq(a: isize, b: isize) -> Self {
        Self::new(a, -b, false)
    }

    /// Signed format from explicit MSB and LSB exponents
    #[track_caller]
    pub fn p(msb: isize, lsb: isize) -> Self {
        Self::new(msb, lsb, true)
    }

    /// Unsigned format from explicit MSB and LSB exponents
    #[track_caller]
    pub fn up(msb: isize, lsb: isize) -> Self {
        Self::new(msb, lsb, false)
    }

    /// Total bits used: `msb - lsb`, plus one for the sign
    pub fn wordlength(&self) -> usize {
        (self.msb - self.lsb + self.signed as isize) as usize
    }

    /// The legal integer mantissas of this layout
    pub fn mantissa_interval(&self) -> Interval<BigInt> {
        let wordlength = self.wordlength();
        if self.signed {
            let limit = BigInt::one() << (wordlength - 1);
            Interval::new(-limit.clone(), limit - 1)
        } else {
            Interval::new(BigInt::zero(), (BigInt::one() << wordlength) - 1)
        }
    }

    /// The representable values: the mantissa range scaled by `2^lsb`
    pub fn value_interval(&self) -> Interval<BigRational> {
        let top = pow2(self.msb) - pow2(self.lsb);
        if self.signed {
            Interval::new(-pow2(self.msb), top)
        } else {
            Interval::new(BigRational::zero(), top)
        }
    }

    /// The quantization step `2^lsb`
    pub fn value_epsilon(&self) -> BigRational {
        pow2(self.lsb)
    }

    /// Returns `true` if `mantissa` does not fit this layout
    pub fn overflows_with(&self, mantissa: &IntValue) -> bool {
        !mantissa.in_interval(&self.mantissa_interval())
    }

    /// Returns `true` if `value` lies within the representable range
    pub fn can_represent(&self, value: &RealValue) -> bool {
        value.in_interval(&self.value_interval())
    }

    /// The value a mantissa denotes under this layout
    pub fn value_of(&self, mantissa: &IntValue) -> RealValue {
        let epsilon = self.value_epsilon();
        mantissa.map(|m| BigRational::from_integer(m.clone()) * &epsilon)
    }

    /// Quantizes `value` onto this layout's LSB grid with `rounding`,
    /// bound/element-wise for ranges and arrays.
    ///
    /// Returns the mantissa and an `(underflow, overflow)` flag pair:
    /// underflow means a nonzero value quantized to zero, overflow means the
    /// mantissa fell outside [`mantissa_interval`](Self::mantissa_interval).
    /// Neither flag is acted upon here; policy lives with the processing
    /// units. Negative values under an unsigned layout are an error.
    pub fn represent(
        &self,
        value: &RealValue,
        rounding: Rounding,
    ) -> Result<(IntValue, (bool, bool)), Error> {
        if !self.signed && value.any(|v| v.is_negative()) {
            return Err(Error::UnsignedValue {
                value: value.clone(),
            });
        }
        let mantissa = real::quantize_value(value, -self.lsb, rounding);
        let underflow = vanished(&mantissa, value);
        let overflow = self.overflows_with(&mantissa);
        Ok((mantissa, (underflow, overflow)))
    }

    /// Requantizes an existing representation onto this layout by shifting
    /// its mantissa, never converting through a real value. Flags as in
    /// [`represent`](Self::represent).
    pub fn represent_fixed(
        &self,
        value: &Representation,
        rounding: Rounding,
    ) -> Result<(IntValue, (bool, bool)), Error> {
        if !self.signed && value.mantissa().any(|m| m.is_negative()) {
            return Err(Error::UnsignedValue {
                value: value.to_real(),
            });
        }
        let mantissa = rounding.shift_value(value.mantissa(), value.format().lsb - self.lsb);
        let underflow = vanished(&mantissa, value.mantissa());
        let overflow = self.overflows_with(&mantissa);
        Ok((mantissa, (underflow, overflow)))
    }

    /// Finds the format of the given `wordlength` that best holds `value`,
    /// and the quantized mantissa under it.
    ///
    /// The MSB is taken from the exact integer log2 of the value's
    /// magnitude, the LSB follows from the wordlength, and the value is
    /// quantized. Quantization itself can push the mantissa past the
    /// assumed bit budget (a magnitude just under a power of two rounds up
    /// to it), and a negative value can turn out to need one bit less, so
    /// the MSB is corrected by ±1 and the value requantized once when the
    /// first mantissa does not fit.
    pub fn best(
        value: &RealValue,
        wordlength: NonZeroUsize,
        rounding: Rounding,
        signed: bool,
    ) -> Result<(IntValue, Format), Error> {
        if !signed && value.any(|v| v.is_negative()) {
            return Err(Error::UnsignedValue {
                value: value.clone(),
            });
        }
        let wordlength = wordlength.get() as isize;
        let mut msb = real::msb_value(value, signed).unwrap_or(0);
        let mut lsb = msb - wordlength + signed as isize;
        let mut mantissa = real::quantize_value(value, -lsb, rounding);

        let mut adjusted_msb = msb;
        let upper_limit = BigInt::one() << (wordlength - signed as isize) as usize;
        if !mantissa.all(|m| *m < upper_limit) {
            adjusted_msb = msb + 1;
        }
        if wordlength >= 2 && mantissa.all(|m| m.is_negative()) {
            let lower_limit = -(BigInt::one() << (wordlength - 2) as usize);
            if mantissa.all(|m| *m > lower_limit) {
                adjusted_msb = msb - 1;
            }
        }
        if adjusted_msb != msb {
            msb = adjusted_msb;
            lsb = msb - wordlength + signed as isize;
            mantissa = real::quantize_value(value, -lsb, rounding);
        }
        Ok((mantissa, Format::new(msb, lsb, signed)))
    }

    /// Parses Q notation, e.g. `"Q4.4"` or `"uQ0.8"`
    pub fn from_qnotation(notation: &str) -> Result<Self, Error> {
        let err = || Error::UnknownNotation(notation.to_owned());
        let (signed, rest) = strip_signedness(notation);
        let rest = rest.strip_prefix('Q').ok_or_else(|| err())?;
        let (integer, fraction) = rest.split_once('.').ok_or_else(|| err())?;
        let integer: isize = integer.parse().map_err(|_| err())?;
        let fraction: isize = fraction.parse().map_err(|_| err())?;
        let msb = integer - signed as isize;
        let lsb = -fraction;
        Format::checked_new(msb, lsb, signed).ok_or(Error::InvalidFormat { msb, lsb })
    }

    /// Parses parenthesis notation, e.g. `"(3,-4)"` or `"u(8,2)"`
    pub fn from_pnotation(notation: &str) -> Result<Self, Error> {
        let err = || Error::UnknownNotation(notation.to_owned());
        let (signed, rest) = strip_signedness(notation);
        let rest = rest
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| err())?;
        let (msb, lsb) = rest.split_once(',').ok_or_else(|| err())?;
        let msb: isize = msb.parse().map_err(|_| err())?;
        let lsb: isize = lsb.parse().map_err(|_| err())?;
        Format::checked_new(msb, lsb, signed).ok_or(Error::InvalidFormat { msb, lsb })
    }

    /// Parses either notation
    pub fn from_notation(notation: &str) -> Result<Self, Error> {
        Self::from_qnotation(notation)
            .or_else(|_| Self::from_pnotation(notation))
            .map_err(|_| Error::UnknownNotation(notation.to_owned()))
    }

    /// Prints `self` in Q notation
    pub fn to_qnotation(&self) -> String {
        let notation = format!("Q{}.{}", self.msb + self.signed as isize, -self.lsb);
        if self.signed {
            notation
        } else {
            format!("u{notation}")
        }
    }

    /// Prints `self` in parenthesis notation
    pub fn to_pnotation(&self) -> String {
        let notation = format!("({},{})", self.msb, self.lsb);
        if self.signed {
            notation
        } else {
            format!("u{notation}")
        }
    }
}

fn strip_signedness(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('u') {
        (false, rest)
    } else if let Some(rest) = s.strip_prefix('s') {
        (true, rest)
    } else {
        (true, s)
    }
}

/// A nonzero quantity quantized away to nothing, element-wise for arrays
fn vanished<T: Element, U: Element>(mantissa: &Value<T>, value: &Value<U>) -> bool {
    match (mantissa, value) {
        (Value::Array(ms), Value::Array(vs)) => ms
            .iter()
            .zip(vs.iter())
            .any(|(m, v)| m.is_zero() && !v.is_zero()),
        _ => mantissa.is_zero() && !value.is_zero(),
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_qnotation())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::from_notation(s)
    }
}
