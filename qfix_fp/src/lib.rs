//! Fixed-point formats, arithmetic logic units, and error tracking.
//!
//! This crate models the arithmetic of wordlength-limited hardware exactly:
//! a [`Format`] fixes a bit layout, a [`Representation`] is a bit-exact
//! value under a layout, and a [`ProcessingUnit`] performs arithmetic under
//! a configured rounding policy and overflow behavior. Two units are
//! provided — [`FixedFormatAlu`] for single-format datapaths and
//! [`MultiFormatAlu`] for datapaths whose formats follow the values within
//! one maximum wordlength.
//!
//! One unit is *active* per thread at a time; [`Number`] forwards every
//! operator to it, so the same expression replays bit-exactly under
//! whichever unit is ambient when it runs. [`ErrorBounded`] pairs any value
//! with an analytically propagated worst-case error interval, using the
//! active unit's rounding policy to account for every requantization.
//!
//! This crate is intended to be used through the main `qfix` crate.

// not const and tends to be longer
#![allow(clippy::manual_range_contains)]

mod error;
mod error_bounded;
mod fixed_alu;
mod formats;
mod multi_alu;
mod number;
mod representation;
mod unit;

pub use error::Error;
pub use error_bounded::{error_bounded, ErrorBounded, Nominal};
pub use fixed_alu::FixedFormatAlu;
pub use formats::Format;
pub use multi_alu::MultiFormatAlu;
pub use number::{fixed, Number};
pub use representation::Representation;
pub use unit::{
    active, enter, Counter, OpFlags, OpKind, OpTable, ProcessingUnit, RangeInfo, Tracer,
    UnitGuard,
};
