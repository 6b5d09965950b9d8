use core::num::NonZeroUsize;
use std::rc::Rc;

use num_rational::BigRational;
use num_traits::{One, Zero};
use qfix_core::{
    real::pow2, IntValue, OverflowBehavior, OverflowError, RealValue, Rounding, UnderflowError,
};

use crate::{
    error::Error,
    formats::Format,
    representation::Representation,
    unit::{OpKind, OpTable, ProcessingUnit, RangeInfo, Tracer},
};

/// An arithmetic logic unit over mixed formats, bounded by one maximum
/// wordlength.
///
/// Operands may carry different formats; results grow or shrink their format
/// as the values require, up to the configured wordlength. Binary operations
/// first derive a common working format (widest MSB, finest LSB, clipped to
/// the wordlength by raising the LSB — precision is sacrificed, range never
/// is) and align both operands into it. When an addition overflows and
/// overflow is not permitted, the format grows by one MSB bit instead, again
/// re-deriving the LSB to stay within the wordlength.
pub struct MultiFormatAlu {
    wordlength: NonZeroUsize,
    rounding: Rounding,
    overflow: OverflowBehavior,
    ops: OpTable,
    tracer: Option<Rc<dyn Tracer>>,
}

impl MultiFormatAlu {
    /// A unit bounded by `wordlength` bits with flooring rounding,
    /// wraparound overflow, and a permissive operation table
    pub fn new(wordlength: NonZeroUsize) -> Self {
        Self {
            wordlength,
            rounding: Rounding::Floor,
            overflow: OverflowBehavior::Wraparound,
            ops: OpTable::permissive(),
            tracer: None,
        }
    }

    /// Replaces the rounding policy
    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Replaces the overflow behavior
    pub fn with_overflow_behavior(mut self, overflow: OverflowBehavior) -> Self {
        self.overflow = overflow;
        self
    }

    /// Replaces the operation permission table
    pub fn with_op_table(mut self, ops: OpTable) -> Self {
        self.ops = ops;
        self
    }

    /// Installs an operation event sink
    pub fn with_tracer(mut self, tracer: Rc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    fn trace(&self, op: OpKind) {
        if let Some(tracer) = &self.tracer {
            tracer.record(op);
        }
    }

    fn check_operand(&self, x: &Representation) -> Result<(), Error> {
        if x.format().wordlength() > self.wordlength.get() {
            return Err(Error::WordlengthExceeded {
                format: x.format(),
                wordlength: self.wordlength.get(),
            });
        }
        Ok(())
    }

    fn check_pair(&self, x: &Representation, y: &Representation) -> Result<(), Error> {
        self.check_operand(x)?;
        self.check_operand(y)?;
        if x.format().signed != y.format().signed {
            return Err(Error::MixedSignedness);
        }
        Ok(())
    }

    /// The working format both operands are aligned into: widest MSB,
    /// finest LSB, LSB raised if the pair would exceed the wordlength
    fn common_format(&self, x: Format, y: Format) -> Format {
        if x == y {
            return x;
        }
        debug_assert_eq!(x.signed, y.signed);
        let signed = x.signed;
        let msb = x.msb.max(y.msb);
        let mut lsb = x.lsb.min(y.lsb);
        let wordlength = self.wordlength.get() as isize;
        if msb - lsb + signed as isize > wordlength {
            lsb = msb - wordlength + signed as isize;
        }
        Format::new(msb, lsb, signed)
    }

    /// Requantizes `x` into `format`. Raising the LSB may underflow; the
    /// common format's MSB covers both operands, so alignment cannot
    /// overflow.
    fn align_operand_mantissa(
        &self,
        x: &Representation,
        format: Format,
        allows_underflow: bool,
    ) -> Result<IntValue, Error> {
        if x.format() == format {
            return Ok(x.mantissa().clone());
        }
        let (mantissa, (underflow, overflow)) = format.represent_fixed(x, self.rounding)?;
        if underflow && !allows_underflow {
            return Err(UnderflowError {
                value: x.to_real(),
                epsilon: format.value_epsilon(),
            }
            .into());
        }
        debug_assert!(!overflow);
        Ok(mantissa)
    }

    /// Reacts to an out-of-range mantissa: if `op` forbids overflow the
    /// format grows by `off_by` MSB bits and the mantissa is requantized at
    /// the re-derived LSB (precision loss, no value loss); otherwise the
    /// overflow behavior corrects the mantissa in place.
    fn handle_overflow(
        &self,
        op: OpKind,
        mantissa: IntValue,
        format: Format,
        off_by: isize,
    ) -> Result<(IntValue, Format), Error> {
        if !self.ops.flags(op).allows_overflow {
            let signed = format.signed;
            let msb = format.msb + off_by;
            let extended = Format::new(msb, format.lsb, signed);
            let lsb = msb - self.wordlength.get() as isize + signed as isize;
            let target = Format::new(msb, lsb, signed);
            let (mantissa, (underflow, overflow)) =
                target.represent_fixed(&Representation::new_unchecked(mantissa, extended), self.rounding)?;
            debug_assert!(!underflow);
            debug_assert!(!overflow);
            Ok((mantissa, target))
        } else {
            let corrected = self.overflow.apply(&mantissa, &format.mantissa_interval()).0;
            Ok((corrected, format))
        }
    }

    /// Quantizes `value` into an explicitly chosen format instead of the
    /// best-fitting one
    pub fn represent_in(
        &self,
        value: &RealValue,
        format: Format,
    ) -> Result<Representation, Error> {
        self.trace(OpKind::Represent);
        if format.wordlength() > self.wordlength.get() {
            return Err(Error::WordlengthExceeded {
                format,
                wordlength: self.wordlength.get(),
            });
        }
        let flags = self.ops.flags(OpKind::Represent);
        let (mut mantissa, (underflow, overflow)) = format.represent(value, self.rounding)?;
        if underflow && !flags.allows_underflow {
            return Err(UnderflowError {
                value: value.clone(),
                epsilon: format.value_epsilon(),
            }
            .into());
        }
        if overflow {
            if !flags.allows_overflow {
                return Err(OverflowError {
                    value: value.clone(),
                    limits: format.value_interval(),
                }
                .into());
            }
            mantissa = self.overflow.apply(&mantissa, &format.mantissa_interval()).0;
        }
        Ok(Representation::new_unchecked(mantissa, format))
    }

    /// [`rinfo`](ProcessingUnit::rinfo) for either signedness. The signed
    /// range assumes the binary point sits just below the sign bit; the
    /// unsigned range assumes a pure fraction.
    pub fn rinfo_with_sign(&self, signed: bool) -> RangeInfo {
        let wordlength = self.wordlength.get() as isize;
        if signed {
            let limit = pow2(wordlength - 1);
            RangeInfo {
                eps: pow2(1 - wordlength),
                min: -limit.clone(),
                max: limit - BigRational::one(),
            }
        } else {
            RangeInfo {
                eps: pow2(-wordlength),
                min: BigRational::zero(),
                max: pow2(wordlength),
            }
        }
    }

    /// Rounds `x` to an integer-valued representation, growing the format
    /// on overflow when `grow` is set
    fn to_integer(
        &self,
        op: OpKind,
        x: &Representation,
        rounding: Rounding,
        grow: bool,
    ) -> Result<Representation, Error> {
        self.trace(op);
        self.check_operand(x)?;
        if x.is_integer() {
            return Ok(x.clone());
        }
        let value = x
            .to_real()
            .map(|v| BigRational::from_integer(rounding.apply(v)));
        let mut format = x.format();
        let (mut mantissa, (_, overflow)) = format.represent(&value, Rounding::Nearest)?;
        if overflow {
            debug_assert!(grow, "rounding toward zero cannot overflow");
            (mantissa, format) = self.handle_overflow(op, mantissa, format, 1)?;
        }
        Ok(Representation::new_unchecked(mantissa, format))
    }
}

impl ProcessingUnit for MultiFormatAlu {
    fn wordlength(&self) -> NonZeroUsize {
        self.wordlength
    }

    fn rounding(&self) -> Rounding {
        self.rounding
    }

    fn overflow_behavior(&self) -> OverflowBehavior {
        self.overflow
    }

    fn op_table(&self) -> &OpTable {
        &self.ops
    }

    fn rinfo(&self) -> RangeInfo {
        self.rinfo_with_sign(true)
    }

    /// Quantizes into the best-fitting signed format for the value's
    /// magnitude, with nearest rounding
    fn represent(&self, value: &RealValue) -> Result<Representation, Error> {
        self.trace(OpKind::Represent);
        let (mantissa, format) =
            Format::best(value, self.wordlength, Rounding::Nearest, true)?;
        Ok(Representation::new_unchecked(mantissa, format))
    }

    fn add(&self, x: &Representation, y: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Add);
        self.check_pair(x, y)?;
        let flags = self.ops.flags(OpKind::Add);
        let mut format = self.common_format(x.format(), y.format());
        let mx = self.align_operand_mantissa(x, format, flags.allows_underflow)?;
        let my = self.align_operand_mantissa(y, format, flags.allows_underflow)?;
        let mut mantissa = &mx + &my;
        if format.overflows_with(&mantissa) {
            (mantissa, format) = self.handle_overflow(OpKind::Add, mantissa, format, 1)?;
        }
        Ok(Representation::new_unchecked(mantissa, format))
    }

    fn sub(&self, x: &Representation, y: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Sub);
        self.check_pair(x, y)?;
        let flags = self.ops.flags(OpKind::Sub);
        let mut format = self.common_format(x.format(), y.format());
        let mx = self.align_operand_mantissa(x, format, flags.allows_underflow)?;
        let my = self.align_operand_mantissa(y, format, flags.allows_underflow)?;
        let mut mantissa = &mx - &my;
        if format.overflows_with(&mantissa) {
            // growing the MSB cannot make room below zero
            if !flags.allows_overflow && !format.signed {
                return Err(OverflowError {
                    value: format.value_of(&mantissa),
                    limits: format.value_interval(),
                }
                .into());
            }
            (mantissa, format) = self.handle_overflow(OpKind::Sub, mantissa, format, 1)?;
        }
        Ok(Representation::new_unchecked(mantissa, format))
    }

    /// The product is exact in the format summing the operand exponents;
    /// only when that format exceeds the wordlength is it requantized into
    /// the best fitting one
    fn mul(&self, x: &Representation, y: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Mul);
        self.check_pair(x, y)?;
        let signed = x.format().signed;
        let format = Format::new(
            x.format().msb + y.format().msb,
            x.format().lsb + y.format().lsb,
            signed,
        );
        let mantissa = x.mantissa() * y.mantissa();
        if format.wordlength() > self.wordlength.get() {
            let (mantissa, format) = Format::best(
                &format.value_of(&mantissa),
                self.wordlength,
                self.rounding,
                signed,
            )?;
            Ok(Representation::new_unchecked(mantissa, format))
        } else {
            Ok(Representation::new_unchecked(mantissa, format))
        }
    }

    fn compare(&self, x: &Representation, y: &Representation) -> Result<IntValue, Error> {
        self.trace(OpKind::Compare);
        self.check_pair(x, y)?;
        let flags = self.ops.flags(OpKind::Compare);
        let format = self.common_format(x.format(), y.format());
        let mx = self.align_operand_mantissa(x, format, flags.allows_underflow)?;
        let my = self.align_operand_mantissa(y, format, flags.allows_underflow)?;
        Ok(&mx - &my)
    }

    fn neg(&self, x: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Neg);
        self.check_operand(x)?;
        if !x.format().signed {
            return Err(Error::UnsignedNegate { format: x.format() });
        }
        if x.is_zero() {
            return Ok(x.clone());
        }
        let mut format = x.format();
        let mut mantissa = -x.mantissa();
        if format.overflows_with(&mantissa) {
            (mantissa, format) = self.handle_overflow(OpKind::Neg, mantissa, format, 1)?;
        }
        Ok(Representation::new_unchecked(mantissa, format))
    }

    /// Shifts slide the format window over an untouched mantissa, which is
    /// exact and cannot overflow
    fn shl(&self, x: &Representation, n: usize) -> Result<Representation, Error> {
        self.trace(OpKind::Shl);
        self.check_operand(x)?;
        let format = x.format();
        Ok(Representation::new_unchecked(
            x.mantissa().clone(),
            Format::new(format.msb + n as isize, format.lsb + n as isize, format.signed),
        ))
    }

    fn shr(&self, x: &Representation, n: usize) -> Result<Representation, Error> {
        self.trace(OpKind::Shr);
        self.check_operand(x)?;
        let format = x.format();
        Ok(Representation::new_unchecked(
            x.mantissa().clone(),
            Format::new(format.msb - n as isize, format.lsb - n as isize, format.signed),
        ))
    }

    fn trunc(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Trunc, x, Rounding::Truncate, false)
    }

    fn floor(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Floor, x, Rounding::Floor, true)
    }

    fn ceil(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Ceil, x, Rounding::Ceil, true)
    }

    fn round(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Round, x, Rounding::Nearest, true)
    }
}

impl core::fmt::Debug for MultiFormatAlu {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("MultiFormatAlu")
            .field("wordlength", &self.wordlength)
            .field("rounding", &self.rounding)
            .field("overflow", &self.overflow)
            .field("ops", &self.ops)
            .finish_non_exhaustive()
    }
}

impl core::fmt::Display for MultiFormatAlu {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{} bits multi-format ALU", self.wordlength)
    }
}
