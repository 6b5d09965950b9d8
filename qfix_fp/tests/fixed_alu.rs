use num_bigint::BigInt;
use num_rational::BigRational;
use qfix_core::{Interval, IntValue, OverflowBehavior, RealValue, Rounding};
use qfix_fp::{Error, FixedFormatAlu, Format, OpTable, ProcessingUnit};

fn iv(lo: i64, hi: i64) -> Interval<BigInt> {
    Interval::new(BigInt::from(lo), BigInt::from(hi))
}

fn rat(numer: i64, denom: i64) -> BigRational {
    BigRational::new(numer.into(), denom.into())
}

fn strict_q1_7() -> FixedFormatAlu {
    FixedFormatAlu::new(Format::q(1, 7))
        .with_rounding(Rounding::Nearest)
        .with_overflow_behavior(OverflowBehavior::Wraparound)
        .with_op_table(OpTable::strict())
}

#[test]
fn represent_errors() {
    let alu = strict_q1_7();
    assert!(matches!(
        alu.represent(&RealValue::from(1e-3)),
        Err(Error::Underflow(_))
    ));
    assert!(matches!(
        alu.represent(&RealValue::from(10.0)),
        Err(Error::Overflow(_))
    ));
}

#[test]
fn represent() {
    let alu = strict_q1_7();
    let info = alu.rinfo();
    assert_eq!(info.eps, rat(1, 128));
    assert_eq!(info.min, rat(-1, 1));
    assert_eq!(info.max, rat(127, 128));

    for (value, mantissa) in [(0.0, 0), (0.25, 32), (-0.25, -32), (0.3, 38), (-0.3, -38)] {
        let r = alu.represent(&RealValue::from(value)).unwrap();
        assert_eq!(r.mantissa(), &IntValue::from(mantissa), "{value}");
        assert_eq!(r.format(), alu.format());
    }

    let r = alu
        .represent(&RealValue::Range(Interval::new(rat(-3, 4), rat(3, 4))))
        .unwrap();
    assert_eq!(r.mantissa(), &IntValue::Range(iv(-96, 96)));
}

#[test]
fn add_wraps_when_permitted() {
    let alu = FixedFormatAlu::new(Format::q(4, 4))
        .with_rounding(Rounding::Nearest)
        .with_op_table(OpTable::new(true, false));

    let x = alu.represent(&RealValue::from(1.0)).unwrap();
    let y = alu.represent(&RealValue::from(2.0)).unwrap();
    let z = alu.add(&x, &y).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(48));
    assert_eq!(z.format(), alu.format());

    // 4 + 4 drops the carry and lands at the bottom of the range
    let x = alu.represent(&RealValue::from(4.0)).unwrap();
    let z = alu.add(&x, &x).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(-128));

    let y = alu.represent(&RealValue::from(-2.0)).unwrap();
    let z = alu.add(&x, &y).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(32));
}

#[test]
fn add_of_straddling_ranges_collapses() {
    let alu = FixedFormatAlu::new(Format::q(4, 4))
        .with_rounding(Rounding::Nearest)
        .with_op_table(OpTable::new(true, false));

    let x = alu
        .represent(&RealValue::Range(Interval::new(rat(-1, 1), rat(1, 1))))
        .unwrap();
    let y = alu
        .represent(&RealValue::Range(Interval::new(rat(3, 1), rat(5, 1))))
        .unwrap();
    let z = alu.add(&x, &y).unwrap();
    assert_eq!(z.mantissa(), &IntValue::Range(iv(32, 96)));

    // the upper bound overflows, so the wrapped range covers everything
    let x = alu
        .represent(&RealValue::Range(Interval::new(rat(-1, 1), rat(3, 1))))
        .unwrap();
    let z = alu.add(&x, &y).unwrap();
    assert_eq!(z.mantissa(), &IntValue::Range(iv(-128, 127)));
}

#[test]
fn add_rejects_foreign_formats() {
    let alu = strict_q1_7();
    let other = FixedFormatAlu::new(Format::q(4, 4));
    let x = alu.represent(&RealValue::from(0.25)).unwrap();
    let y = other.represent(&RealValue::from(0.25)).unwrap();
    assert!(matches!(
        alu.add(&x, &y),
        Err(Error::FormatMismatch { .. })
    ));
}

#[test]
fn multiply_requantizes_through_double_width() {
    let alu = strict_q1_7();
    let x = alu.represent(&RealValue::from(0.5)).unwrap();
    let z = alu.mul(&x, &x).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(32));
    assert_eq!(z.format(), alu.format());

    // mantissas 38 * 26 = 988, shifted 7 right with the nearest bit: 8
    let x = alu.represent(&RealValue::from(0.3)).unwrap();
    let y = alu.represent(&RealValue::from(0.2)).unwrap();
    let z = alu.mul(&x, &y).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(8));
}

#[test]
fn multiply_underflow_is_detected() {
    let alu = strict_q1_7();
    // (1/128)² rounds to zero at the 2⁻⁷ grid
    let x = alu.represent(&RealValue::from(0.008)).unwrap();
    assert_eq!(x.mantissa(), &IntValue::from(1));
    assert!(matches!(alu.mul(&x, &x), Err(Error::Underflow(_))));

    let permissive = FixedFormatAlu::new(Format::q(1, 7))
        .with_rounding(Rounding::Nearest)
        .with_op_table(OpTable::permissive());
    let z = permissive.mul(&x, &x).unwrap();
    assert!(z.is_zero());
}

#[test]
fn negate() {
    let alu = strict_q1_7();
    let x = alu.represent(&RealValue::from(0.25)).unwrap();
    let z = alu.neg(&x).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(-32));

    let zero = alu.represent(&RealValue::from(0.0)).unwrap();
    assert!(alu.neg(&zero).unwrap().is_zero());

    // -(-1) is not representable in two's-complement style ranges
    let most_negative = alu.represent(&RealValue::from(-1.0)).unwrap();
    assert!(matches!(alu.neg(&most_negative), Err(Error::Overflow(_))));

    let unsigned = FixedFormatAlu::new(Format::uq(0, 8));
    let x = unsigned.represent(&RealValue::from(0.25)).unwrap();
    assert!(matches!(
        unsigned.neg(&x),
        Err(Error::UnsignedNegate { .. })
    ));
}

#[test]
fn compare_is_mantissa_exact() {
    use num_traits::Signed;

    let alu = strict_q1_7();
    let x = alu.represent(&RealValue::from(0.3)).unwrap();
    let y = alu.represent(&RealValue::from(0.2)).unwrap();
    assert!(alu.compare(&x, &y).unwrap().all(|d| d.is_positive()));
    assert!(alu.compare(&y, &x).unwrap().all(|d| d.is_negative()));
    assert!(alu.compare(&x, &x).unwrap().is_zero());
}

#[test]
fn shifts() {
    let alu = FixedFormatAlu::new(Format::q(1, 7))
        .with_rounding(Rounding::Nearest)
        .with_op_table(OpTable::strict());

    let x = alu.represent(&RealValue::from(0.25)).unwrap();
    let z = alu.shl(&x, 1).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(64));
    assert!(matches!(alu.shl(&x, 3), Err(Error::Overflow(_))));

    // a right shift only loses information, never range
    let z = alu.shr(&x, 5).unwrap();
    assert_eq!(z.mantissa(), &IntValue::from(1));
    assert!(alu.shr(&x, 8).unwrap().is_zero());
}

#[test]
fn rounding_conversions() {
    let alu = FixedFormatAlu::new(Format::q(4, 4))
        .with_rounding(Rounding::Nearest)
        .with_op_table(OpTable::new(true, false));

    let x = alu.represent(&RealValue::from(2.3)).unwrap();
    assert_eq!(alu.floor(&x).unwrap().mantissa(), &IntValue::from(32));
    assert_eq!(alu.ceil(&x).unwrap().mantissa(), &IntValue::from(48));
    assert_eq!(alu.trunc(&x).unwrap().mantissa(), &IntValue::from(32));
    assert_eq!(alu.round(&x).unwrap().mantissa(), &IntValue::from(32));

    let y = alu.represent(&RealValue::from(-2.7)).unwrap();
    assert_eq!(alu.floor(&y).unwrap().mantissa(), &IntValue::from(-48));
    assert_eq!(alu.ceil(&y).unwrap().mantissa(), &IntValue::from(-32));
    assert_eq!(alu.trunc(&y).unwrap().mantissa(), &IntValue::from(-32));
    assert_eq!(alu.round(&y).unwrap().mantissa(), &IntValue::from(-48));

    // already integer-valued layouts pass through untouched
    let integer_alu = FixedFormatAlu::new(Format::new(7, 0, true));
    let x = integer_alu.represent(&RealValue::from(5.0)).unwrap();
    assert_eq!(integer_alu.floor(&x).unwrap().mantissa(), &IntValue::from(5));
}

#[test]
fn division_is_unsupported() {
    let alu = strict_q1_7();
    let x = alu.represent(&RealValue::from(0.25)).unwrap();
    assert!(matches!(alu.div(&x, &x), Err(Error::Unsupported(_))));
    assert!(matches!(alu.rem(&x, &x), Err(Error::Unsupported(_))));
}
