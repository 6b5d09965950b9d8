use qfix_core::{OverflowError, RealValue, UnderflowError};

use crate::formats::Format;

/// Everything that can go wrong in the fixed-point layer.
///
/// [`Overflow`](Self::Overflow) and [`Underflow`](Self::Underflow) are
/// expected outcomes of quantized arithmetic and carry the structure callers
/// rank candidates by; every other variant is a usage error and is never
/// produced by a well-formed computation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Overflow(#[from] OverflowError),
    #[error(transparent)]
    Underflow(#[from] UnderflowError),
    #[error("operand format {found} does not match this unit's format {expected}")]
    FormatMismatch { expected: Format, found: Format },
    #[error("operands mix signed and unsigned formats")]
    MixedSignedness,
    #[error("format {format} does not fit in the {wordlength} bits of this unit")]
    WordlengthExceeded { format: Format, wordlength: usize },
    #[error("an unsigned format cannot represent {value}")]
    UnsignedValue { value: RealValue },
    #[error("cannot negate a value in the unsigned format {format}")]
    UnsignedNegate { format: Format },
    #[error("least significant bit {lsb} cannot be above most significant bit {msb}")]
    InvalidFormat { msb: isize, lsb: isize },
    #[error("'{0}' is not in a known format notation")]
    UnknownNotation(String),
    #[error("cannot represent non-finite value {0}")]
    NonFinite(f64),
    #[error("no active processing unit")]
    NoActiveUnit,
    #[error("{0} is not implemented by this unit")]
    Unsupported(&'static str),
}
