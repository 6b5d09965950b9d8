//! # Bit-exact fixed-point arithmetic with analytic error bounds
//!
//! `qfix` models the finite-precision arithmetic of embedded and hardware
//! digital-filter implementations — wordlength-limited mantissas,
//! configurable rounding, configurable overflow handling — and tracks, in
//! closed form, the worst-case numerical error a sequence of such
//! operations can accumulate. It is the numeric core for tools that search
//! over filter realizations: construct values under a format, do
//! arithmetic, catch the structured overflow/underflow errors, and rank
//! candidates by how infeasible they were.
//!
//! The pieces, leaf to root:
//!
//! - [`Interval`]: closed ranges with widening interval arithmetic.
//! - [`Value`]: one family for scalar, range, and array quantities.
//! - [`Rounding`]: nearest/floor/ceil/truncate, each with a bit-exact
//!   mantissa shift and an analytic rounding-error bound.
//! - [`OverflowBehavior`]: wraparound or saturation of out-of-range values.
//! - [`Format`]: a bit layout with derived wordlength, ranges, and
//!   quantization step, plus the printable `Q`/parenthesis notations.
//! - [`Representation`]: an immutable (mantissa, format) pair.
//! - [`FixedFormatAlu`] / [`MultiFormatAlu`]: the two arithmetic units.
//! - [`Number`]: a wrapper whose operators go through the thread's
//!   [`active`] unit, entered for a scope via [`ProcessingUnit::enter`].
//! - [`ErrorBounded`]: a value paired with a propagated worst-case error
//!   interval.
//!
//! ```
//! use qfix::prelude::*;
//!
//! let alu = FixedFormatAlu::new(Format::q(1, 7))
//!     .with_rounding(Rounding::Nearest)
//!     .with_overflow_behavior(OverflowBehavior::Saturate);
//! let guard = alu.enter();
//! let x = fixed(0.3).unwrap();
//! let y = fixed(0.2).unwrap();
//! let sum = &x + &y;
//! assert_eq!(sum.mantissa(), &IntValue::from(64));
//! drop(guard);
//! ```
//!
//! Overflow and underflow are expected outcomes, not bugs: the fallible
//! `try_*` methods and the unit operations return structured errors whose
//! `margin()` tells an optimizer how near a miss was.

pub use qfix_core::{
    real, saturate, wraparound, wl, Element, Interval, IntValue, OverflowBehavior,
    OverflowError, RealValue, Rounding, UnderflowError, Value,
};
pub use qfix_fp::{
    active, enter, error_bounded, fixed, Counter, Error, ErrorBounded, FixedFormatAlu, Format,
    MultiFormatAlu, Nominal, Number, OpFlags, OpKind, OpTable, ProcessingUnit, RangeInfo,
    Representation, Tracer, UnitGuard,
};

pub mod prelude {
    pub use crate::{
        active, fixed, wl, ErrorBounded, FixedFormatAlu, Format, Interval, IntValue,
        MultiFormatAlu, Number, OverflowBehavior, OverflowError, ProcessingUnit, RealValue,
        Rounding, UnderflowError, Value,
    };
}
