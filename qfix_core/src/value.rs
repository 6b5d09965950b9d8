use core::{
    fmt,
    ops::{Add, Mul, Neg, Shl, Shr, Sub},
};

use num_bigint::BigInt;
use num_rational::BigRational;
use smallvec::SmallVec;

use crate::interval::{Element, Interval};

/// A numeric quantity that is either a single scalar, a bounded range, or an
/// element-wise array.
///
/// Mantissas and real values flow through the same operations whether they
/// are single numbers, intervals of numbers, or arrays of numbers, so every
/// consumer dispatches over this one family. Arithmetic broadcasts:
/// scalar⊕array maps over the elements, array⊕array zips arrays of equal
/// length, scalar⊕range lifts the scalar to a degenerate range, and
/// range⊕range is interval arithmetic. A range cannot be combined with an
/// array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum Value<T> {
    Scalar(T),
    Range(Interval<T>),
    Array(Vec<T>),
}

/// Integer quantities: mantissas and mantissa differences
pub type IntValue = Value<BigInt>;

/// Exact real quantities: values on the number line and error magnitudes
pub type RealValue = Value<BigRational>;

fn broadcast<T, S, R>(lhs: &Value<T>, rhs: &Value<T>, scalar: S, range: R) -> Value<T>
where
    T: Element,
    S: Fn(&T, &T) -> T,
    R: Fn(Interval<T>, Interval<T>) -> Interval<T>,
{
    use Value::*;
    match (lhs, rhs) {
        (Scalar(a), Scalar(b)) => Scalar(scalar(a, b)),
        (Scalar(a), Range(b)) => Range(range(Interval::point(a.clone()), b.clone())),
        (Range(a), Scalar(b)) => Range(range(a.clone(), Interval::point(b.clone()))),
        (Range(a), Range(b)) => Range(range(a.clone(), b.clone())),
        (Scalar(a), Array(b)) => Array(b.iter().map(|x| scalar(a, x)).collect()),
        (Array(a), Scalar(b)) => Array(a.iter().map(|x| scalar(x, b)).collect()),
        (Array(a), Array(b)) => {
            assert_eq!(a.len(), b.len(), "array length mismatch");
            Array(a.iter().zip(b.iter()).map(|(x, y)| scalar(x, y)).collect())
        }
        (Range(_), Array(_)) | (Array(_), Range(_)) => {
            panic!("range and array quantities cannot be broadcast together")
        }
    }
}

impl<T: Element> Value<T> {
    /// Returns `true` if `predicate` holds for every element, or for both
    /// bounds of a range
    pub fn all<F: Fn(&T) -> bool>(&self, predicate: F) -> bool {
        self.parts().iter().all(|x| predicate(x))
    }

    /// Returns `true` if `predicate` holds for any element or bound
    pub fn any<F: Fn(&T) -> bool>(&self, predicate: F) -> bool {
        self.parts().iter().any(|x| predicate(x))
    }

    /// The scalars making up `self`: one for a scalar, the two bounds for a
    /// range, every element for an array
    pub fn parts(&self) -> SmallVec<[&T; 2]> {
        match self {
            Value::Scalar(x) => SmallVec::from_slice(&[x]),
            Value::Range(iv) => SmallVec::from_slice(&[iv.lower_bound(), iv.upper_bound()]),
            Value::Array(xs) => xs.iter().collect(),
        }
    }

    /// Applies `map` to every element. `map` must be monotonically
    /// nondecreasing so that range bounds stay ordered.
    #[track_caller]
    pub fn map<U: Element, F: Fn(&T) -> U>(&self, map: F) -> Value<U> {
        match self {
            Value::Scalar(x) => Value::Scalar(map(x)),
            Value::Range(iv) => Value::Range(iv.map(map)),
            Value::Array(xs) => Value::Array(xs.iter().map(|x| map(x)).collect()),
        }
    }

    /// Returns `true` if every element of `self` lies within `range`
    pub fn in_interval(&self, range: &Interval<T>) -> bool {
        self.all(|x| range.contains_value(x))
    }

    /// Returns `true` if `self` is zero everywhere
    pub fn is_zero(&self) -> bool {
        self.all(|x| x.is_zero())
    }

    /// Returns the scalar if `self` is the `Scalar` variant
    pub fn as_scalar(&self) -> Option<&T> {
        match self {
            Value::Scalar(x) => Some(x),
            _ => None,
        }
    }

    /// Returns the range if `self` is the `Range` variant
    pub fn as_range(&self) -> Option<&Interval<T>> {
        match self {
            Value::Range(iv) => Some(iv),
            _ => None,
        }
    }
}

impl RealValue {
    /// The exact rational a finite float denotes. Returns `None` for NaN and
    /// infinities.
    pub fn from_f64(x: f64) -> Option<RealValue> {
        BigRational::from_float(x).map(Value::Scalar)
    }
}

impl From<f64> for RealValue {
    /// Infallible version of [`RealValue::from_f64`] for literal values.
    ///
    /// # Panics
    ///
    /// If `x` is not finite.
    #[track_caller]
    fn from(x: f64) -> Self {
        match RealValue::from_f64(x) {
            Some(value) => value,
            None => panic!("cannot represent non-finite value {x}"),
        }
    }
}

impl<T: Element> Add for &Value<T> {
    type Output = Value<T>;

    fn add(self, rhs: Self) -> Value<T> {
        broadcast(self, rhs, |a, b| a.clone() + b.clone(), |a, b| a + b)
    }
}

impl<T: Element> Sub for &Value<T> {
    /// Range minus range is widening interval subtraction
    type Output = Value<T>;

    fn sub(self, rhs: Self) -> Value<T> {
        broadcast(self, rhs, |a, b| a.clone() - b.clone(), |a, b| a - b)
    }
}

impl<T: Element> Mul for &Value<T> {
    type Output = Value<T>;

    fn mul(self, rhs: Self) -> Value<T> {
        broadcast(self, rhs, |a, b| a.clone() * b.clone(), |a, b| a * b)
    }
}

impl<T: Element> Neg for &Value<T> {
    type Output = Value<T>;

    fn neg(self) -> Value<T> {
        match self {
            Value::Scalar(x) => Value::Scalar(-x.clone()),
            Value::Range(iv) => Value::Range(-iv),
            Value::Array(xs) => Value::Array(xs.iter().map(|x| -x.clone()).collect()),
        }
    }
}

impl<T: Element + Shl<usize, Output = T>> Shl<usize> for &Value<T> {
    type Output = Value<T>;

    fn shl(self, s: usize) -> Value<T> {
        match self {
            Value::Scalar(x) => Value::Scalar(x.clone() << s),
            Value::Range(iv) => Value::Range(iv.clone() << s),
            Value::Array(xs) => Value::Array(xs.iter().map(|x| x.clone() << s).collect()),
        }
    }
}

impl<T: Element + Shr<usize, Output = T>> Shr<usize> for &Value<T> {
    type Output = Value<T>;

    fn shr(self, s: usize) -> Value<T> {
        match self {
            Value::Scalar(x) => Value::Scalar(x.clone() >> s),
            Value::Range(iv) => Value::Range(iv.clone() >> s),
            Value::Array(xs) => Value::Array(xs.iter().map(|x| x.clone() >> s).collect()),
        }
    }
}

impl<T: Element> From<T> for Value<T> {
    fn from(x: T) -> Self {
        Value::Scalar(x)
    }
}

impl<T: Element> From<Interval<T>> for Value<T> {
    fn from(iv: Interval<T>) -> Self {
        Value::Range(iv)
    }
}

impl<T: Element> From<Vec<T>> for Value<T> {
    fn from(xs: Vec<T>) -> Self {
        Value::Array(xs)
    }
}

macro_rules! impl_from_prim {
    ($($prim:ty),*) => {
        $(
            impl From<$prim> for IntValue {
                fn from(x: $prim) -> Self {
                    Value::Scalar(BigInt::from(x))
                }
            }

            impl From<$prim> for RealValue {
                fn from(x: $prim) -> Self {
                    Value::Scalar(BigRational::from_integer(BigInt::from(x)))
                }
            }
        )*
    };
}

impl_from_prim!(i32, i64, u32, u64, isize, usize);

impl<T: fmt::Display> fmt::Display for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Scalar(x) => fmt::Display::fmt(x, f),
            Value::Range(iv) => fmt::Display::fmt(iv, f),
            Value::Array(xs) => {
                f.write_str("{")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(x, f)?;
                }
                f.write_str("}")
            }
        }
    }
}
