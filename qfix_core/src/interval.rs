use core::{
    fmt,
    ops::{Add, Div, Mul, Neg, Rem, Shl, Shr, Sub},
};

use num_integer::Integer;
use num_traits::{Signed, Zero};

/// Bound on the scalars an [`Interval`] can range over. Blanket-implemented
/// for every ordered ring type with owned arithmetic, which in this workspace
/// means `BigInt` and `BigRational`.
pub trait Element:
    Clone
    + Ord
    + Zero
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
}

impl<T> Element for T where
    T: Clone
        + Ord
        + Zero
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
        + Neg<Output = T>
{
}

/// A closed range `[lower, upper]` used both as a value range and as an
/// error-margin range.
///
/// The invariant `upper >= lower` is enforced on construction. Arithmetic is
/// widening interval arithmetic: the result of an operation bounds every
/// combination of values drawn from the operands. Products and quotients are
/// computed from all four bound pairings because the bound signs are not
/// known a priori.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval<T> {
    lower: T,
    upper: T,
}

impl<T: Element> Interval<T> {
    /// Creates the interval `[lower, upper]`.
    ///
    /// # Panics
    ///
    /// If `upper < lower`.
    #[track_caller]
    pub fn new(lower: T, upper: T) -> Self {
        match Self::checked_new(lower, upper) {
            Some(interval) => interval,
            None => panic!("interval upper bound cannot be lower than lower bound"),
        }
    }

    /// Fallible version of [`Interval::new`], returning `None` if
    /// `upper < lower`.
    pub fn checked_new(lower: T, upper: T) -> Option<Self> {
        if upper < lower {
            None
        } else {
            Some(Self { lower, upper })
        }
    }

    /// Creates the degenerate interval `[value, value]`.
    pub fn point(value: T) -> Self {
        Self {
            lower: value.clone(),
            upper: value,
        }
    }

    /// Returns a reference to the lower bound of `self`
    #[inline]
    pub fn lower_bound(&self) -> &T {
        &self.lower
    }

    /// Returns a reference to the upper bound of `self`
    #[inline]
    pub fn upper_bound(&self) -> &T {
        &self.upper
    }

    /// Consumes `self`, returning `(lower, upper)`
    #[inline]
    pub fn into_bounds(self) -> (T, T) {
        (self.lower, self.upper)
    }

    /// Returns `true` if both bounds coincide
    pub fn is_point(&self) -> bool {
        self.lower == self.upper
    }

    /// Returns `true` if every value of `other` lies within `self`
    pub fn contains(&self, other: &Self) -> bool {
        (self.lower <= other.lower) && (other.upper <= self.upper)
    }

    /// Returns `true` if `value` lies within `self`
    pub fn contains_value(&self, value: &T) -> bool {
        (self.lower <= *value) && (*value <= self.upper)
    }

    /// Bound-wise subtraction, without the defensive widening performed by
    /// `-`. Intended for deltas between intervals whose bounds are known to
    /// track together, such as an enclosure and a value it encloses.
    ///
    /// # Panics
    ///
    /// If the bounds do not track, i.e. the bound-wise differences are not
    /// themselves ordered.
    #[track_caller]
    pub fn difference(&self, other: &Self) -> Self {
        Self::new(
            self.lower.clone() - other.lower.clone(),
            self.upper.clone() - other.upper.clone(),
        )
    }

    /// Applies `map` to both bounds. `map` must be monotonically
    /// nondecreasing, otherwise this panics on the inverted bounds.
    #[track_caller]
    pub fn map<U: Element, F: Fn(&T) -> U>(&self, map: F) -> Interval<U> {
        Interval::new(map(&self.lower), map(&self.upper))
    }

    /// Conservative strict ordering: `true` only if every value of `self` is
    /// below every value of `other`. Overlapping intervals compare `false`
    /// under all four of [`lt`](Self::lt), [`le`](Self::le),
    /// [`gt`](Self::gt), and [`ge`](Self::ge), which is why these are not a
    /// `PartialOrd` implementation: a `false` here means "not provably
    /// ordered", never "equal".
    pub fn lt(&self, other: &Self) -> bool {
        self.upper < other.lower
    }

    /// Conservative `<=`: `true` only if every value of `self` is at most
    /// every value of `other`
    pub fn le(&self, other: &Self) -> bool {
        self.upper <= other.lower
    }

    /// Conservative `>`: `true` only if every value of `self` is above every
    /// value of `other`
    pub fn gt(&self, other: &Self) -> bool {
        self.lower > other.upper
    }

    /// Conservative `>=`: `true` only if every value of `self` is at least
    /// every value of `other`
    pub fn ge(&self, other: &Self) -> bool {
        self.lower >= other.upper
    }
}

impl<T: Element + Signed> Interval<T> {
    /// The interval of `|x|` over all `x` in `self`
    pub fn abs(&self) -> Self {
        let zero = T::zero();
        let lower = if self.lower > zero {
            self.lower.clone()
        } else {
            zero
        };
        let upper = self.lower.abs().max(self.upper.abs());
        Self { lower, upper }
    }
}

fn corner_fold<T: Element, F: Fn(&T, &T) -> T>(
    lhs: &Interval<T>,
    rhs: &Interval<T>,
    f: F,
) -> Interval<T> {
    let corners = [
        f(&lhs.lower, &rhs.lower),
        f(&lhs.lower, &rhs.upper),
        f(&lhs.upper, &rhs.lower),
        f(&lhs.upper, &rhs.upper),
    ];
    let mut lower = corners[0].clone();
    let mut upper = corners[0].clone();
    for corner in &corners[1..] {
        if *corner < lower {
            lower = corner.clone();
        }
        if *corner > upper {
            upper = corner.clone();
        }
    }
    Interval { lower, upper }
}

impl<T: Element + Integer> Interval<T> {
    /// Flooring division over all four bound pairings
    pub fn div_floor(&self, other: &Self) -> Self {
        corner_fold(self, other, |a, b| a.div_floor(b))
    }

    /// Flooring remainder over all four bound pairings
    pub fn mod_floor(&self, other: &Self) -> Self {
        corner_fold(self, other, |a, b| a.mod_floor(b))
    }
}

impl<T: Element> Add for Interval<T> {
    type Output = Interval<T>;

    fn add(self, rhs: Self) -> Self::Output {
        Interval {
            lower: self.lower + rhs.lower,
            upper: self.upper + rhs.upper,
        }
    }
}

impl<T: Element> Sub for Interval<T> {
    /// Widening subtraction: `self.lower - rhs.upper` up to
    /// `self.upper - rhs.lower`. See [`Interval::difference`] for the
    /// bound-wise variant.
    type Output = Interval<T>;

    fn sub(self, rhs: Self) -> Self::Output {
        Interval {
            lower: self.lower - rhs.upper,
            upper: self.upper - rhs.lower,
        }
    }
}

impl<T: Element> Mul for Interval<T> {
    type Output = Interval<T>;

    fn mul(self, rhs: Self) -> Self::Output {
        corner_fold(&self, &rhs, |a, b| a.clone() * b.clone())
    }
}

impl<T: Element + Div<Output = T>> Div for Interval<T> {
    /// Quotient over all four bound pairings. Division semantics (and
    /// division by an interval spanning zero) follow the scalar type.
    type Output = Interval<T>;

    fn div(self, rhs: Self) -> Self::Output {
        corner_fold(&self, &rhs, |a, b| a.clone() / b.clone())
    }
}

impl<T: Element + Rem<Output = T>> Rem for Interval<T> {
    /// Remainder over all four bound pairings, with the scalar type's
    /// remainder semantics
    type Output = Interval<T>;

    fn rem(self, rhs: Self) -> Self::Output {
        corner_fold(&self, &rhs, |a, b| a.clone() % b.clone())
    }
}

impl<T: Element> Neg for Interval<T> {
    type Output = Interval<T>;

    fn neg(self) -> Self::Output {
        Interval {
            lower: -self.upper,
            upper: -self.lower,
        }
    }
}

impl<T: Element> Add<T> for Interval<T> {
    type Output = Interval<T>;

    fn add(self, rhs: T) -> Self::Output {
        Interval {
            lower: self.lower + rhs.clone(),
            upper: self.upper + rhs,
        }
    }
}

impl<T: Element> Sub<T> for Interval<T> {
    type Output = Interval<T>;

    fn sub(self, rhs: T) -> Self::Output {
        Interval {
            lower: self.lower - rhs.clone(),
            upper: self.upper - rhs,
        }
    }
}

impl<T: Element> Mul<T> for Interval<T> {
    type Output = Interval<T>;

    fn mul(self, rhs: T) -> Self::Output {
        let a = self.lower * rhs.clone();
        let b = self.upper * rhs;
        if a <= b {
            Interval { lower: a, upper: b }
        } else {
            Interval { lower: b, upper: a }
        }
    }
}

impl<T: Element + Shl<usize, Output = T>> Shl<usize> for Interval<T> {
    type Output = Interval<T>;

    fn shl(self, s: usize) -> Self::Output {
        Interval {
            lower: self.lower << s,
            upper: self.upper << s,
        }
    }
}

impl<T: Element + Shr<usize, Output = T>> Shr<usize> for Interval<T> {
    type Output = Interval<T>;

    fn shr(self, s: usize) -> Self::Output {
        Interval {
            lower: self.lower >> s,
            upper: self.upper >> s,
        }
    }
}

macro_rules! forward_ref_binop {
    ($($imp:ident, $method:ident);*;) => {
        $(
            impl<'a, 'b, T: Element> $imp<&'b Interval<T>> for &'a Interval<T>
            where
                Interval<T>: $imp<Interval<T>, Output = Interval<T>>,
            {
                type Output = Interval<T>;

                fn $method(self, rhs: &'b Interval<T>) -> Interval<T> {
                    self.clone().$method(rhs.clone())
                }
            }
        )*
    };
}

forward_ref_binop!(
    Add, add;
    Sub, sub;
    Mul, mul;
);

impl<'a, T: Element> Neg for &'a Interval<T> {
    type Output = Interval<T>;

    fn neg(self) -> Interval<T> {
        -self.clone()
    }
}

impl<T: Element> PartialEq<T> for Interval<T> {
    /// A degenerate interval compares equal to its single value
    fn eq(&self, rhs: &T) -> bool {
        (self.lower == *rhs) && (self.upper == *rhs)
    }
}

impl<T: fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
