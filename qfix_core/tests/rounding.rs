use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use qfix_core::{real::pow2, Interval, Rounding};

fn rat(numer: i64, denom: i64) -> BigRational {
    BigRational::new(numer.into(), denom.into())
}

#[track_caller]
fn check(rounding: Rounding, x: BigRational, expected: i64) {
    assert_eq!(rounding.apply(&x), BigInt::from(expected), "{rounding:?}({x})");
}

#[test]
fn nearest() {
    check(Rounding::Nearest, rat(-8, 5), -2);
    check(Rounding::Nearest, rat(-7, 5), -1);
    check(Rounding::Nearest, rat(0, 1), 0);
    check(Rounding::Nearest, rat(1, 1), 1);
    check(Rounding::Nearest, rat(7, 5), 1);
    check(Rounding::Nearest, rat(8, 5), 2);
    // ties resolve to even
    check(Rounding::Nearest, rat(1, 2), 0);
    check(Rounding::Nearest, rat(3, 2), 2);
    check(Rounding::Nearest, rat(-1, 2), 0);
    check(Rounding::Nearest, rat(-3, 2), -2);
}

#[test]
fn floor() {
    check(Rounding::Floor, rat(-8, 5), -2);
    check(Rounding::Floor, rat(-7, 5), -2);
    check(Rounding::Floor, rat(0, 1), 0);
    check(Rounding::Floor, rat(1, 1), 1);
    check(Rounding::Floor, rat(7, 5), 1);
    check(Rounding::Floor, rat(8, 5), 1);
}

#[test]
fn ceil() {
    check(Rounding::Ceil, rat(-8, 5), -1);
    check(Rounding::Ceil, rat(-7, 5), -1);
    check(Rounding::Ceil, rat(0, 1), 0);
    check(Rounding::Ceil, rat(1, 1), 1);
    check(Rounding::Ceil, rat(7, 5), 2);
    check(Rounding::Ceil, rat(8, 5), 2);
}

#[test]
fn truncate() {
    check(Rounding::Truncate, rat(-8, 5), -1);
    check(Rounding::Truncate, rat(-7, 5), -1);
    check(Rounding::Truncate, rat(0, 1), 0);
    check(Rounding::Truncate, rat(1, 1), 1);
    check(Rounding::Truncate, rat(7, 5), 1);
    check(Rounding::Truncate, rat(8, 5), 1);
}

#[test]
fn shift_left_is_exact() {
    for rounding in [
        Rounding::Nearest,
        Rounding::Floor,
        Rounding::Ceil,
        Rounding::Truncate,
    ] {
        assert_eq!(rounding.shift(&BigInt::from(-3), 4), BigInt::from(-48));
        assert_eq!(rounding.shift(&BigInt::from(5), 0), BigInt::from(5));
    }
}

#[test]
fn shift_right_rounds_per_policy() {
    // 5/2 = 2.5, -5/2 = -2.5
    assert_eq!(Rounding::Floor.shift(&BigInt::from(5), -1), BigInt::from(2));
    assert_eq!(Rounding::Floor.shift(&BigInt::from(-5), -1), BigInt::from(-3));
    assert_eq!(Rounding::Ceil.shift(&BigInt::from(5), -1), BigInt::from(3));
    assert_eq!(Rounding::Ceil.shift(&BigInt::from(-5), -1), BigInt::from(-2));
    assert_eq!(Rounding::Truncate.shift(&BigInt::from(5), -1), BigInt::from(2));
    assert_eq!(Rounding::Truncate.shift(&BigInt::from(-5), -1), BigInt::from(-2));
    // the nearest shift adds the dropped bit, carrying shifted ties upward
    assert_eq!(Rounding::Nearest.shift(&BigInt::from(5), -1), BigInt::from(3));
    assert_eq!(Rounding::Nearest.shift(&BigInt::from(-5), -1), BigInt::from(-2));
    assert_eq!(Rounding::Nearest.shift(&BigInt::from(1), -1), BigInt::from(1));
    assert_eq!(Rounding::Nearest.shift(&BigInt::from(39), -2), BigInt::from(10));
}

#[test]
fn left_then_right_shift_is_identity() {
    for n in 0..12 {
        for m in [-77i64, -1, 0, 1, 53] {
            let m = BigInt::from(m);
            let shifted = Rounding::Floor.shift(&Rounding::Floor.shift(&m, n), -n);
            assert_eq!(shifted, m);
        }
    }
}

#[test]
fn error_bounds_formulas() {
    let o = -7;
    let i = -14;
    assert_eq!(
        Rounding::Nearest.error_bounds(o, None),
        Interval::new(-pow2(o - 1), pow2(o - 1))
    );
    assert_eq!(
        Rounding::Nearest.error_bounds(o, Some(i)),
        Interval::new(-pow2(o - 1) + pow2(i), pow2(o - 1))
    );
    assert_eq!(
        Rounding::Floor.error_bounds(o, None),
        Interval::new(-pow2(o), BigRational::zero())
    );
    assert_eq!(
        Rounding::Floor.error_bounds(o, Some(i)),
        Interval::new(-pow2(o) + pow2(i), BigRational::zero())
    );
    assert_eq!(
        Rounding::Ceil.error_bounds(o, None),
        Interval::new(BigRational::zero(), pow2(o))
    );
    assert_eq!(
        Rounding::Ceil.error_bounds(o, Some(i)),
        Interval::new(BigRational::zero(), pow2(o) - pow2(i))
    );
    assert_eq!(
        Rounding::Truncate.error_bounds(o, None),
        Interval::new(-pow2(o), pow2(o))
    );
    assert_eq!(
        Rounding::Truncate.error_bounds(o, Some(i)),
        Interval::new(-pow2(o) + pow2(i), pow2(o) - pow2(i))
    );
}
