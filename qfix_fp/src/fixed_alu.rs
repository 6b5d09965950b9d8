use core::num::NonZeroUsize;
use std::rc::Rc;

use num_rational::BigRational;
use qfix_core::{
    wl, IntValue, OverflowBehavior, OverflowError, RealValue, Rounding, UnderflowError,
};

use crate::{
    error::Error,
    formats::Format,
    representation::Representation,
    unit::{OpKind, OpTable, ProcessingUnit, RangeInfo, Tracer},
};

/// An arithmetic logic unit over a single fixed [`Format`].
///
/// Every operand and every result carries the same format, as in a datapath
/// with one register width and one binary point. Binary operations check
/// operand formats and fail on mismatch. Overflow and underflow handling per
/// operation follows the configured [`OpTable`]: permitted overflows go
/// through the configured [`OverflowBehavior`], forbidden ones fail with the
/// structured error.
pub struct FixedFormatAlu {
    format: Format,
    rounding: Rounding,
    overflow: OverflowBehavior,
    ops: OpTable,
    tracer: Option<Rc<dyn Tracer>>,
}

impl FixedFormatAlu {
    /// A unit over `format` with flooring rounding, wraparound overflow, and
    /// a permissive operation table.
    ///
    /// # Panics
    ///
    /// If `format` has a zero wordlength.
    #[track_caller]
    pub fn new(format: Format) -> Self {
        assert!(
            format.wordlength() >= 1,
            "a processing unit needs at least 1 bit of wordlength"
        );
        Self {
            format,
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

    /// The format every operand and result of this unit carries
    pub fn format(&self) -> Format {
        self.format
    }

    fn trace(&self, op: OpKind) {
        if let Some(tracer) = &self.tracer {
            tracer.record(op);
        }
    }

    fn check_format(&self, x: &Representation) -> Result<(), Error> {
        if x.format() != self.format {
            return Err(Error::FormatMismatch {
                expected: self.format,
                found: x.format(),
            });
        }
        Ok(())
    }

    /// Applies the overflow behavior to an out-of-range mantissa, or fails
    /// if `op` does not permit overflow
    fn handle_overflow(&self, op: OpKind, mantissa: IntValue) -> Result<IntValue, Error> {
        if !self.ops.flags(op).allows_overflow {
            return Err(OverflowError {
                value: self.format.value_of(&mantissa),
                limits: self.format.value_interval(),
            }
            .into());
        }
        Ok(self.overflow.apply(&mantissa, &self.format.mantissa_interval()).0)
    }

    /// Rounds `x` to an integer-valued representation with `rounding`,
    /// shared by the four rounding conversions
    fn to_integer(
        &self,
        op: OpKind,
        x: &Representation,
        rounding: Rounding,
    ) -> Result<Representation, Error> {
        self.trace(op);
        self.check_format(x)?;
        if x.is_integer() {
            return Ok(x.clone());
        }
        let value = x
            .to_real()
            .map(|v| BigRational::from_integer(rounding.apply(v)));
        let (mut mantissa, (_, overflow)) = self.format.represent(&value, Rounding::Nearest)?;
        if overflow {
            mantissa = self.handle_overflow(op, mantissa)?;
        }
        Ok(Representation::new_unchecked(mantissa, self.format))
    }
}

impl ProcessingUnit for FixedFormatAlu {
    fn wordlength(&self) -> NonZeroUsize {
        wl(self.format.wordlength())
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
        let range = self.format.value_interval();
        RangeInfo {
            eps: self.format.value_epsilon(),
            min: range.lower_bound().clone(),
            max: range.upper_bound().clone(),
        }
    }

    /// Quantizes with nearest rounding whatever the unit's rounding policy;
    /// the policy governs arithmetic requantization, not input conversion
    fn represent(&self, value: &RealValue) -> Result<Representation, Error> {
        self.trace(OpKind::Represent);
        let flags = self.ops.flags(OpKind::Represent);
        let (mut mantissa, (underflow, overflow)) =
            self.format.represent(value, Rounding::Nearest)?;
        if underflow && !flags.allows_underflow {
            return Err(UnderflowError {
                value: value.clone(),
                epsilon: self.format.value_epsilon(),
            }
            .into());
        }
        if overflow {
            if !flags.allows_overflow {
                return Err(OverflowError {
                    value: value.clone(),
                    limits: self.format.value_interval(),
                }
                .into());
            }
            mantissa = self.overflow.apply(&mantissa, &self.format.mantissa_interval()).0;
        }
        Ok(Representation::new_unchecked(mantissa, self.format))
    }

    fn add(&self, x: &Representation, y: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Add);
        self.check_format(x)?;
        self.check_format(y)?;
        let mut mantissa = x.mantissa() + y.mantissa();
        if self.format.overflows_with(&mantissa) {
            mantissa = self.handle_overflow(OpKind::Add, mantissa)?;
        }
        Ok(Representation::new_unchecked(mantissa, self.format))
    }

    fn sub(&self, x: &Representation, y: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Sub);
        self.check_format(x)?;
        self.check_format(y)?;
        let mut mantissa = x.mantissa() - y.mantissa();
        if self.format.overflows_with(&mantissa) {
            mantissa = self.handle_overflow(OpKind::Sub, mantissa)?;
        }
        Ok(Representation::new_unchecked(mantissa, self.format))
    }

    /// The exact product is formed in a doubled-width intermediate format
    /// and requantized to the unit format with the configured rounding, as a
    /// `2n × 2n` hardware multiplier would
    fn mul(&self, x: &Representation, y: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Mul);
        self.check_format(x)?;
        self.check_format(y)?;
        let flags = self.ops.flags(OpKind::Mul);
        let product = Representation::new_unchecked(
            x.mantissa() * y.mantissa(),
            Format::new(
                self.format.msb * 2 + 1,
                self.format.lsb * 2,
                self.format.signed,
            ),
        );
        let (mut mantissa, (underflow, overflow)) =
            self.format.represent_fixed(&product, self.rounding)?;
        if underflow && !flags.allows_underflow {
            return Err(UnderflowError {
                value: product.to_real(),
                epsilon: self.format.value_epsilon(),
            }
            .into());
        }
        if overflow {
            if !flags.allows_overflow {
                return Err(OverflowError {
                    value: product.to_real(),
                    limits: self.format.value_interval(),
                }
                .into());
            }
            mantissa = self.overflow.apply(&mantissa, &self.format.mantissa_interval()).0;
        }
        Ok(Representation::new_unchecked(mantissa, self.format))
    }

    /// Integer mantissa difference; no format change, no rounding
    fn compare(&self, x: &Representation, y: &Representation) -> Result<IntValue, Error> {
        self.trace(OpKind::Compare);
        self.check_format(x)?;
        self.check_format(y)?;
        Ok(x.mantissa() - y.mantissa())
    }

    fn neg(&self, x: &Representation) -> Result<Representation, Error> {
        self.trace(OpKind::Neg);
        self.check_format(x)?;
        if !self.format.signed {
            return Err(Error::UnsignedNegate {
                format: self.format,
            });
        }
        if x.is_zero() {
            return Ok(x.clone());
        }
        // negating the most negative mantissa overflows
        let mut mantissa = -x.mantissa();
        if self.format.overflows_with(&mantissa) {
            mantissa = self.handle_overflow(OpKind::Neg, mantissa)?;
        }
        Ok(Representation::new_unchecked(mantissa, self.format))
    }

    fn shl(&self, x: &Representation, n: usize) -> Result<Representation, Error> {
        self.trace(OpKind::Shl);
        self.check_format(x)?;
        let mut mantissa = x.mantissa() << n;
        if self.format.overflows_with(&mantissa) {
            mantissa = self.handle_overflow(OpKind::Shl, mantissa)?;
        }
        Ok(Representation::new_unchecked(mantissa, self.format))
    }

    /// A right shift only discards information, which is what a right shift
    /// is for; it cannot overflow
    fn shr(&self, x: &Representation, n: usize) -> Result<Representation, Error> {
        self.trace(OpKind::Shr);
        self.check_format(x)?;
        Ok(Representation::new_unchecked(
            x.mantissa() >> n,
            self.format,
        ))
    }

    fn trunc(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Trunc, x, Rounding::Truncate)
    }

    fn floor(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Floor, x, Rounding::Floor)
    }

    fn ceil(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Ceil, x, Rounding::Ceil)
    }

    fn round(&self, x: &Representation) -> Result<Representation, Error> {
        self.to_integer(OpKind::Round, x, Rounding::Nearest)
    }
}

impl core::fmt::Debug for FixedFormatAlu {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("FixedFormatAlu")
            .field("format", &self.format)
            .field("rounding", &self.rounding)
            .field("overflow", &self.overflow)
            .field("ops", &self.ops)
            .finish_non_exhaustive()
    }
}

impl core::fmt::Display for FixedFormatAlu {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{} ALU", self.format.to_qnotation())
    }
}
