use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Signed;
use qfix::prelude::*;
use qfix::{wraparound, OpTable, Representation};
use rand_xoshiro::{
    rand_core::{RngCore, SeedableRng},
    Xoshiro128StarStar,
};

fn rand_bool(rng: &mut Xoshiro128StarStar) -> bool {
    (rng.next_u32() & 1) == 0
}

fn rand_range(rng: &mut Xoshiro128StarStar, lo: i64, hi: i64) -> i64 {
    lo + (rng.next_u64() % ((hi - lo + 1) as u64)) as i64
}

fn rand_format(rng: &mut Xoshiro128StarStar) -> Format {
    let msb = rand_range(rng, -6, 6) as isize;
    let lsb = msb - rand_range(rng, 1, 10) as isize;
    Format::new(msb, lsb, rand_bool(rng))
}

fn rat(numer: i64, denom: i64) -> BigRational {
    BigRational::new(numer.into(), denom.into())
}

/// Every value representable within a format quantizes to within one step
/// of itself
#[test]
fn represent_is_within_epsilon() {
    let rng = &mut Xoshiro128StarStar::seed_from_u64(0);
    for _ in 0..1000 {
        let format = rand_format(rng);
        let mantissas = format.mantissa_interval();
        let (lo, hi) = (mantissas.lower_bound().clone(), mantissas.upper_bound().clone());
        let (lo, hi) = (
            i64::try_from(&lo).unwrap(),
            i64::try_from(&hi).unwrap(),
        );
        let m = rand_range(rng, lo, hi);
        // jitter by fractions of a step, keeping the value in range
        let mut jitter = rand_range(rng, -4, 4);
        if m == lo {
            jitter = jitter.abs();
        }
        if m == hi {
            jitter = -jitter.abs();
        }
        let value = (rat(m, 1) + rat(jitter, 8)) * qfix::real::pow2(format.lsb);
        let exact = RealValue::Scalar(value.clone());
        assert!(format.can_represent(&exact));

        let (mantissa, (_, overflow)) = format.represent(&exact, Rounding::Nearest).unwrap();
        assert!(!overflow, "{value} overflowed {format}");
        let result = match format.value_of(&mantissa) {
            Value::Scalar(x) => x,
            other => panic!("scalar in, {other} out"),
        };
        assert!(
            (result - value).abs() <= format.value_epsilon(),
            "quantization moved a value by more than one step in {format}"
        );
    }
}

/// The fixed-format multiplier equals the shifted-and-wrapped product of the
/// raw mantissas
#[test]
fn fixed_multiply_follows_the_mantissa_law() {
    let rng = &mut Xoshiro128StarStar::seed_from_u64(1);
    let format = Format::q(4, 4);
    let alu = FixedFormatAlu::new(format).with_rounding(Rounding::Nearest);
    for _ in 0..1000 {
        let mx = rand_range(rng, -128, 127);
        let my = rand_range(rng, -128, 127);
        let x = Representation::new(IntValue::from(mx), format).unwrap();
        let y = Representation::new(IntValue::from(my), format).unwrap();
        let z = alu.mul(&x, &y).unwrap();

        // product at 2·lsb, requantized up to lsb, wrapped into range
        let shifted = Rounding::Nearest.shift(&BigInt::from(mx * my), format.lsb);
        let (expected, _) = wraparound(&shifted, &format.mantissa_interval());
        assert_eq!(z.mantissa(), &IntValue::Scalar(expected), "{mx} * {my}");
    }
}

#[test]
fn notations_round_trip() {
    let rng = &mut Xoshiro128StarStar::seed_from_u64(2);
    for _ in 0..1000 {
        let format = rand_format(rng);
        assert_eq!(Format::from_notation(&format.to_qnotation()).unwrap(), format);
        assert_eq!(Format::from_notation(&format.to_pnotation()).unwrap(), format);
    }
}

#[test]
fn wraparound_lands_in_range() {
    let rng = &mut Xoshiro128StarStar::seed_from_u64(3);
    for _ in 0..1000 {
        let lo = rand_range(rng, -300, 200);
        let hi = lo + rand_range(rng, 0, 500);
        let range = Interval::new(BigInt::from(lo), BigInt::from(hi));
        let value = BigInt::from(rand_range(rng, -2000, 2000));
        let (wrapped, overflow) = wraparound(&value, &range);
        assert!(range.contains_value(&wrapped));
        assert_eq!(overflow, !range.contains_value(&value));
    }
}

#[test]
fn saturate_clamps_to_the_nearest_bound() {
    let rng = &mut Xoshiro128StarStar::seed_from_u64(4);
    for _ in 0..1000 {
        let lo = rand_range(rng, -300, 200);
        let hi = lo + rand_range(rng, 0, 500);
        let range = Interval::new(BigInt::from(lo), BigInt::from(hi));
        let value = BigInt::from(rand_range(rng, -2000, 2000));
        let (clamped, overflow) = qfix::saturate(&value, &range);
        if range.contains_value(&value) {
            assert_eq!(clamped, value);
            assert!(!overflow);
        } else {
            assert!(overflow);
            assert!(clamped == *range.lower_bound() || clamped == *range.upper_bound());
        }
    }
}

#[test]
fn left_then_right_shift_is_identity() {
    let rng = &mut Xoshiro128StarStar::seed_from_u64(5);
    for _ in 0..1000 {
        let m = BigInt::from(rand_range(rng, -100_000, 100_000));
        let n = rand_range(rng, 0, 24) as isize;
        for rounding in [
            Rounding::Nearest,
            Rounding::Floor,
            Rounding::Ceil,
            Rounding::Truncate,
        ] {
            assert_eq!(rounding.shift(&rounding.shift(&m, n), -n), m);
        }
    }
}

/// Multi-format addition with growth enabled stays within one quantization
/// step of the exact sum
#[test]
fn multi_add_is_one_step_accurate() {
    let rng = &mut Xoshiro128StarStar::seed_from_u64(6);
    let alu = MultiFormatAlu::new(wl(8))
        .with_rounding(Rounding::Nearest)
        .with_op_table(OpTable::new(false, true));
    for _ in 0..1000 {
        let x = rat(rand_range(rng, -400, 400), 100);
        let y = rat(rand_range(rng, -400, 400), 100);
        let rx = alu.represent(&RealValue::Scalar(x)).unwrap();
        let ry = alu.represent(&RealValue::Scalar(y)).unwrap();
        let z = alu.add(&rx, &ry).unwrap();

        let exact = match (rx.to_real(), ry.to_real()) {
            (Value::Scalar(a), Value::Scalar(b)) => a + b,
            _ => unreachable!(),
        };
        let result = match z.to_real() {
            Value::Scalar(r) => r,
            _ => unreachable!(),
        };
        assert!(
            (result - exact).abs() <= qfix::real::pow2(z.format().lsb),
            "{rx} + {ry} drifted more than one step"
        );
    }
}
