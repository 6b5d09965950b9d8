use core::{
    cmp::Ordering,
    fmt,
    ops::{Add, Mul, Neg, Shl, Sub},
};

use num_rational::BigRational;
use num_traits::{One, Zero};
use qfix_core::{real::pow2, Interval, RealValue, Rounding, Value};

use crate::{error::Error, number::Number, unit::active};

/// The nominal value an [`ErrorBounded`] tracks: an exact real, an exact
/// range, or a fixed-point number under the active unit
#[derive(Debug, Clone)]
pub enum Nominal {
    Real(BigRational),
    Range(Interval<BigRational>),
    Fixed(Number),
}

impl Nominal {
    /// The exact value of the nominal
    pub fn to_real(&self) -> RealValue {
        match self {
            Nominal::Real(x) => Value::Scalar(x.clone()),
            Nominal::Range(iv) => Value::Range(iv.clone()),
            Nominal::Fixed(n) => n.to_real(),
        }
    }

    fn is_zero(&self) -> bool {
        self.to_real().is_zero()
    }

    /// Multiplication by −1, 0, or 1 never rounds
    fn is_exact_factor(&self) -> bool {
        let real = self.to_real();
        let one = BigRational::one();
        [BigRational::zero(), one.clone(), -one]
            .iter()
            .any(|c| match &real {
                Value::Scalar(x) => x == c,
                Value::Range(iv) => *iv == *c,
                Value::Array(_) => false,
            })
    }

    /// The LSB exponent when the nominal is fixed-point
    fn lsb(&self) -> Option<isize> {
        match self {
            Nominal::Fixed(n) => Some(n.format().lsb),
            _ => None,
        }
    }
}

impl PartialEq for Nominal {
    /// Fixed-point nominals compare under the active unit; mixed variants
    /// compare by exact value
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Nominal::Real(a), Nominal::Real(b)) => a == b,
            (Nominal::Range(a), Nominal::Range(b)) => a == b,
            (Nominal::Fixed(a), Nominal::Fixed(b)) => a == b,
            _ => self.to_real() == other.to_real(),
        }
    }
}

impl From<BigRational> for Nominal {
    fn from(x: BigRational) -> Self {
        Nominal::Real(x)
    }
}

impl From<Interval<BigRational>> for Nominal {
    fn from(iv: Interval<BigRational>) -> Self {
        Nominal::Range(iv)
    }
}

impl From<Number> for Nominal {
    fn from(n: Number) -> Self {
        Nominal::Fixed(n)
    }
}

impl From<f64> for Nominal {
    /// # Panics
    ///
    /// If `x` is not finite.
    #[track_caller]
    fn from(x: f64) -> Self {
        match RealValue::from_f64(x) {
            Some(Value::Scalar(x)) => Nominal::Real(x),
            _ => panic!("cannot represent non-finite value {x}"),
        }
    }
}

/// A value paired with an analytically tracked interval of worst-case
/// accumulated error.
///
/// Arithmetic propagates the nominal value through the underlying type's own
/// arithmetic — exactly for reals and ranges, through the active unit for
/// fixed-point numbers — and propagates the error interval alongside:
/// addition and subtraction sum the operand error intervals, multiplication
/// takes the exact range of `(x̂ ± eₓ)·(ŷ ± e_y)` around the nominal product
/// so cross terms are captured rather than linearized. When a fixed-point
/// result is coarser than an operand, the active rounding policy's analytic
/// error bound for that requantization is added on top.
#[derive(Debug, Clone)]
pub struct ErrorBounded {
    number: Nominal,
    error_bounds: Interval<BigRational>,
}

/// Pairs a value with an initial error interval
pub fn error_bounded<N: Into<Nominal>>(
    number: N,
    error_bounds: Interval<BigRational>,
) -> ErrorBounded {
    ErrorBounded {
        number: number.into(),
        error_bounds,
    }
}

impl ErrorBounded {
    /// A value carrying no error yet
    pub fn new<N: Into<Nominal>>(number: N) -> Self {
        error_bounded(number, Interval::point(BigRational::zero()))
    }

    /// The nominal value
    pub fn number(&self) -> &Nominal {
        &self.number
    }

    /// The tracked worst-case error interval
    pub fn error_bounds(&self) -> &Interval<BigRational> {
        &self.error_bounds
    }

    pub fn try_add(&self, other: &ErrorBounded) -> Result<ErrorBounded, Error> {
        let number = nominal_add(&self.number, &other.number)?;
        let mut error_bounds = &self.error_bounds + &other.error_bounds;
        if let Nominal::Fixed(result) = &number {
            error_bounds = add_requantization_terms(
                error_bounds,
                result,
                &self.number,
                &other.number,
            )?;
        }
        Ok(error_bounded(number, error_bounds))
    }

    pub fn try_sub(&self, other: &ErrorBounded) -> Result<ErrorBounded, Error> {
        let number = nominal_sub(&self.number, &other.number)?;
        let mut error_bounds = &self.error_bounds + &other.error_bounds;
        if let Nominal::Fixed(result) = &number {
            error_bounds = add_requantization_terms(
                error_bounds,
                result,
                &self.number,
                &other.number,
            )?;
        }
        Ok(error_bounded(number, error_bounds))
    }

    pub fn try_mul(&self, other: &ErrorBounded) -> Result<ErrorBounded, Error> {
        let number = nominal_mul(&self.number, &other.number)?;
        let x = self.number.to_real();
        let y = other.number.to_real();
        // the exact range of (x̂ ± eₓ)·(ŷ ± e_y), re-centered on the nominal
        // product
        let spread = widen(&x, &self.error_bounds) * widen(&y, &other.error_bounds);
        let mut error_bounds = spread.difference(&as_interval(&(&x * &y)));
        if let Nominal::Fixed(result) = &number {
            let exact = self.number.is_exact_factor() || other.number.is_exact_factor();
            if !exact {
                let rounding = active()?.rounding();
                let result_lsb = result.format().lsb;
                match (self.number.lsb(), other.number.lsb()) {
                    (Some(lx), Some(ly)) => {
                        if result_lsb > lx + ly {
                            error_bounds = error_bounds
                                + rounding.error_bounds(result_lsb, Some(lx + ly));
                        }
                    }
                    _ => {
                        error_bounds =
                            error_bounds + rounding.error_bounds(result_lsb, None);
                    }
                }
            }
        }
        Ok(error_bounded(number, error_bounds))
    }

    pub fn try_neg(&self) -> Result<ErrorBounded, Error> {
        let number = match &self.number {
            Nominal::Real(x) => Nominal::Real(-x),
            Nominal::Range(iv) => Nominal::Range(-iv),
            Nominal::Fixed(n) => Nominal::Fixed(n.try_neg()?),
        };
        Ok(error_bounded(number, -self.error_bounds.clone()))
    }

    /// Scales the value and its error by `2^n`
    pub fn try_shl(&self, n: usize) -> Result<ErrorBounded, Error> {
        let scale = pow2(n as isize);
        let number = match &self.number {
            Nominal::Real(x) => Nominal::Real(x * &scale),
            Nominal::Range(iv) => Nominal::Range(iv.clone() * scale.clone()),
            Nominal::Fixed(x) => Nominal::Fixed(x.try_shl(n)?),
        };
        Ok(error_bounded(number, self.error_bounds.clone() * scale))
    }

    fn apply_rounding(&self, rounding: Rounding) -> Result<ErrorBounded, Error> {
        let number = match &self.number {
            Nominal::Real(x) => Nominal::Real(BigRational::from_integer(rounding.apply(x))),
            Nominal::Range(iv) => {
                Nominal::Range(iv.map(|b| BigRational::from_integer(rounding.apply(b))))
            }
            Nominal::Fixed(n) => Nominal::Fixed(match rounding {
                Rounding::Nearest => n.try_round()?,
                Rounding::Floor => n.try_floor()?,
                Rounding::Ceil => n.try_ceil()?,
                Rounding::Truncate => n.try_trunc()?,
            }),
        };
        let error_bounds = match self.number.lsb() {
            // an integer-valued fixed-point number converts exactly
            Some(lsb) if lsb >= 0 => self.error_bounds.clone(),
            Some(lsb) => self.error_bounds.clone() + rounding.error_bounds(0, Some(lsb)),
            None => self.error_bounds.clone() + rounding.error_bounds(0, None),
        };
        Ok(error_bounded(number, error_bounds))
    }

    /// Rounds the value toward zero to an integer, widening the error by
    /// the truncation bound
    pub fn try_trunc(&self) -> Result<ErrorBounded, Error> {
        self.apply_rounding(Rounding::Truncate)
    }

    pub fn try_floor(&self) -> Result<ErrorBounded, Error> {
        self.apply_rounding(Rounding::Floor)
    }

    pub fn try_ceil(&self) -> Result<ErrorBounded, Error> {
        self.apply_rounding(Rounding::Ceil)
    }

    pub fn try_round(&self) -> Result<ErrorBounded, Error> {
        self.apply_rounding(Rounding::Nearest)
    }
}

/// `value + bounds` as an interval: what the true value may be once the
/// tracked error is taken into account
fn widen(value: &RealValue, bounds: &Interval<BigRational>) -> Interval<BigRational> {
    match value {
        Value::Scalar(x) => bounds.clone() + x.clone(),
        Value::Range(iv) => iv.clone() + bounds.clone(),
        Value::Array(_) => panic!("array nominals are not supported"),
    }
}

fn as_interval(value: &RealValue) -> Interval<BigRational> {
    match value {
        Value::Scalar(x) => Interval::point(x.clone()),
        Value::Range(iv) => iv.clone(),
        Value::Array(_) => panic!("array nominals are not supported"),
    }
}

fn nominal_add(a: &Nominal, b: &Nominal) -> Result<Nominal, Error> {
    use Nominal::*;
    Ok(match (a, b) {
        (Fixed(x), Fixed(y)) => Fixed(x.try_add(y)?),
        (Fixed(x), _) => Fixed(x.try_add(&Number::from_value(b.to_real())?)?),
        (_, Fixed(y)) => Fixed(Number::from_value(a.to_real())?.try_add(y)?),
        (Real(x), Real(y)) => Real(x + y),
        (Real(x), Range(iv)) => Range(iv.clone() + x.clone()),
        (Range(iv), Real(y)) => Range(iv.clone() + y.clone()),
        (Range(x), Range(y)) => Range(x + y),
    })
}

fn nominal_sub(a: &Nominal, b: &Nominal) -> Result<Nominal, Error> {
    use Nominal::*;
    Ok(match (a, b) {
        (Fixed(x), Fixed(y)) => Fixed(x.try_sub(y)?),
        (Fixed(x), _) => Fixed(x.try_sub(&Number::from_value(b.to_real())?)?),
        (_, Fixed(y)) => Fixed(Number::from_value(a.to_real())?.try_sub(y)?),
        (Real(x), Real(y)) => Real(x - y),
        (Real(x), Range(iv)) => Range(Interval::point(x.clone()) - iv.clone()),
        (Range(iv), Real(y)) => Range(iv.clone() - y.clone()),
        (Range(x), Range(y)) => Range(x - y),
    })
}

fn nominal_mul(a: &Nominal, b: &Nominal) -> Result<Nominal, Error> {
    use Nominal::*;
    Ok(match (a, b) {
        (Fixed(x), Fixed(y)) => Fixed(x.try_mul(y)?),
        (Fixed(x), _) => Fixed(x.try_mul(&Number::from_value(b.to_real())?)?),
        (_, Fixed(y)) => Fixed(Number::from_value(a.to_real())?.try_mul(y)?),
        (Real(x), Real(y)) => Real(x * y),
        (Real(x), Range(iv)) => Range(iv.clone() * x.clone()),
        (Range(iv), Real(y)) => Range(iv.clone() * y.clone()),
        (Range(x), Range(y)) => Range(x * y),
    })
}

/// Adds the rounding-error term for each operand the additive result is
/// coarser than: tightened for fixed-point operands (their own LSB already
/// bounded the error below), untightened for exact operands that had to be
/// freshly quantized. Exact when either operand is zero.
fn add_requantization_terms(
    mut error_bounds: Interval<BigRational>,
    result: &Number,
    x: &Nominal,
    y: &Nominal,
) -> Result<Interval<BigRational>, Error> {
    if x.is_zero() || y.is_zero() {
        return Ok(error_bounds);
    }
    let rounding = active()?.rounding();
    let result_lsb = result.format().lsb;
    for operand in [x, y] {
        match operand {
            Nominal::Fixed(n) => {
                if result_lsb > n.format().lsb {
                    error_bounds =
                        error_bounds + rounding.error_bounds(result_lsb, Some(n.format().lsb));
                }
            }
            nominal => {
                if !nominal.is_zero() {
                    error_bounds = error_bounds + rounding.error_bounds(result_lsb, None);
                }
            }
        }
    }
    Ok(error_bounds)
}

impl PartialEq for ErrorBounded {
    /// Strict: the nominals must be equal *and* both error bounds must be
    /// exactly zero. Two values that merely overlap within their error are
    /// not equal, they are indistinguishable — a weaker statement.
    fn eq(&self, other: &Self) -> bool {
        let zero = BigRational::zero();
        self.error_bounds == zero && other.error_bounds == zero && self.number == other.number
    }
}

impl PartialOrd for ErrorBounded {
    /// Conservative: `Less`/`Greater` only when the two error envelopes are
    /// disjoint, `Equal` only for strict equality, `None` otherwise
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        let a = widen(&self.number.to_real(), &self.error_bounds);
        let b = widen(&other.number.to_real(), &other.error_bounds);
        if a.lt(&b) {
            Some(Ordering::Less)
        } else if a.gt(&b) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

macro_rules! impl_binop {
    ($($imp:ident, $method:ident, $try:ident);*;) => {
        $(
            impl $imp for ErrorBounded {
                type Output = ErrorBounded;

                fn $method(self, rhs: ErrorBounded) -> ErrorBounded {
                    self.$try(&rhs).unwrap()
                }
            }

            impl<'a, 'b> $imp<&'b ErrorBounded> for &'a ErrorBounded {
                type Output = ErrorBounded;

                fn $method(self, rhs: &'b ErrorBounded) -> ErrorBounded {
                    self.$try(rhs).unwrap()
                }
            }

            /// Lifts `rhs` to an error-free value, then operates
            impl $imp<f64> for ErrorBounded {
                type Output = ErrorBounded;

                fn $method(self, rhs: f64) -> ErrorBounded {
                    self.$try(&ErrorBounded::new(rhs)).unwrap()
                }
            }

            /// Lifts `self` to an error-free value, then operates
            impl $imp<ErrorBounded> for f64 {
                type Output = ErrorBounded;

                fn $method(self, rhs: ErrorBounded) -> ErrorBounded {
                    ErrorBounded::new(self).$try(&rhs).unwrap()
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

impl Neg for ErrorBounded {
    type Output = ErrorBounded;

    fn neg(self) -> ErrorBounded {
        self.try_neg().unwrap()
    }
}

impl Shl<usize> for ErrorBounded {
    type Output = ErrorBounded;

    fn shl(self, n: usize) -> ErrorBounded {
        self.try_shl(n).unwrap()
    }
}

impl fmt::Display for ErrorBounded {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.number {
            Nominal::Real(x) => write!(f, "{} + {}", x, self.error_bounds),
            Nominal::Range(iv) => write!(f, "{} + {}", iv, self.error_bounds),
            Nominal::Fixed(n) => write!(f, "{} + {}", n, self.error_bounds),
        }
    }
}
