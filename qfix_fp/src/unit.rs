use core::{
    cell::{Cell, RefCell},
    marker::PhantomData,
    num::{NonZeroU64, NonZeroUsize},
};
use std::rc::Rc;

use num_rational::BigRational;
use qfix_core::{IntValue, OverflowBehavior, RealValue, Rounding};

use crate::{error::Error, representation::Representation};

/// The representable range of the active unit: quantization step, smallest
/// value, largest value. Queried by callers validating inputs before a
/// simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInfo {
    pub eps: BigRational,
    pub min: BigRational,
    pub max: BigRational,
}

/// The operations a processing unit performs, used to key per-operation
/// permissions and traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum OpKind {
    Represent,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Compare,
    Neg,
    Shl,
    Shr,
    Trunc,
    Floor,
    Ceil,
    Round,
}

impl OpKind {
    /// Number of operation kinds
    pub const COUNT: usize = 14;
}

/// Whether an operation may overflow or underflow without raising
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct OpFlags {
    /// Out-of-range results go through the unit's overflow behavior instead
    /// of failing
    pub allows_overflow: bool,
    /// Nonzero values may quantize to zero instead of failing
    pub allows_underflow: bool,
}

/// Per-operation overflow/underflow permissions, consulted by a unit before
/// every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct OpTable {
    flags: [OpFlags; OpKind::COUNT],
}

impl OpTable {
    /// A table with the same flags for every operation
    pub fn new(allows_overflow: bool, allows_underflow: bool) -> Self {
        Self {
            flags: [OpFlags {
                allows_overflow,
                allows_underflow,
            }; OpKind::COUNT],
        }
    }

    /// Every operation may overflow and underflow silently
    pub fn permissive() -> Self {
        Self::new(true, true)
    }

    /// Every overflow and underflow raises
    pub fn strict() -> Self {
        Self::new(false, false)
    }

    /// Overrides the flags of one operation
    pub fn with(mut self, op: OpKind, flags: OpFlags) -> Self {
        self.flags[op as usize] = flags;
        self
    }

    /// The flags of `op`
    pub fn flags(&self, op: OpKind) -> OpFlags {
        self.flags[op as usize]
    }
}

impl Default for OpTable {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Optional event sink for the operations a unit performs. Installed at unit
/// construction; useful to extract operation counts from a computation
/// without instrumenting the computation itself.
pub trait Tracer {
    fn record(&self, op: OpKind);
}

/// A [`Tracer`] that tallies operations by kind
#[derive(Debug, Default)]
pub struct Counter {
    counts: RefCell<[u64; OpKind::COUNT]>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many operations of kind `op` were recorded
    pub fn count(&self, op: OpKind) -> u64 {
        self.counts.borrow()[op as usize]
    }

    /// How many operations were recorded in total
    pub fn total(&self) -> u64 {
        self.counts.borrow().iter().sum()
    }
}

impl Tracer for Counter {
    fn record(&self, op: OpKind) {
        self.counts.borrow_mut()[op as usize] += 1;
    }
}

/// A configured arithmetic capability: a rounding policy, an overflow
/// behavior, a permission table, and the operations themselves.
///
/// Exactly one unit is *active* per thread at any instant; `Number`
/// arithmetic always goes through [`active`], so the same expression yields
/// different bit-exact results under different ambient units. Units are
/// activated for a scope with [`ProcessingUnit::enter`] or [`enter`].
///
/// `div` and `rem` are declared for completeness of the capability but not
/// implemented by any unit here; fixed-point division is left to future
/// hardware models.
pub trait ProcessingUnit {
    /// Maximum bits a representation handled by this unit may use
    fn wordlength(&self) -> NonZeroUsize;

    /// The rounding policy of this unit
    fn rounding(&self) -> Rounding;

    /// The overflow behavior of this unit
    fn overflow_behavior(&self) -> OverflowBehavior;

    /// The per-operation permission table of this unit
    fn op_table(&self) -> &OpTable;

    /// Quantization step and representable range of this unit
    fn rinfo(&self) -> RangeInfo;

    /// Quantizes `value` into a representation this unit can operate on
    fn represent(&self, value: &RealValue) -> Result<Representation, Error>;

    fn add(&self, x: &Representation, y: &Representation) -> Result<Representation, Error>;

    fn sub(&self, x: &Representation, y: &Representation) -> Result<Representation, Error>;

    fn mul(&self, x: &Representation, y: &Representation) -> Result<Representation, Error>;

    fn div(&self, _x: &Representation, _y: &Representation) -> Result<Representation, Error> {
        Err(Error::Unsupported("division"))
    }

    fn rem(&self, _x: &Representation, _y: &Representation) -> Result<Representation, Error> {
        Err(Error::Unsupported("modulus"))
    }

    /// The sign of the result orders `x` against `y`. Comparison works on
    /// mantissas only and never rounds: it must not go through approximate
    /// values.
    fn compare(&self, x: &Representation, y: &Representation) -> Result<IntValue, Error>;

    fn neg(&self, x: &Representation) -> Result<Representation, Error>;

    fn shl(&self, x: &Representation, n: usize) -> Result<Representation, Error>;

    fn shr(&self, x: &Representation, n: usize) -> Result<Representation, Error>;

    /// Rounds to integer toward zero
    fn trunc(&self, x: &Representation) -> Result<Representation, Error>;

    /// Rounds to integer toward negative infinity
    fn floor(&self, x: &Representation) -> Result<Representation, Error>;

    /// Rounds to integer toward positive infinity
    fn ceil(&self, x: &Representation) -> Result<Representation, Error>;

    /// Rounds to the nearest integer
    fn round(&self, x: &Representation) -> Result<Representation, Error>;

    /// Makes `self` the active unit of this thread until the returned guard
    /// drops
    fn enter(self) -> UnitGuard
    where
        Self: Sized + 'static,
    {
        enter(Rc::new(self))
    }
}

thread_local!(
    /// The current scope generation, used for insuring that unit scope
    /// lifetimes are stacklike
    static UNIT_GEN: Cell<NonZeroU64> = Cell::new(NonZeroU64::new(2).unwrap());

    /// The active unit stack, with the generation each entry was pushed at.
    /// Only the top entry is visible to `active`.
    static UNIT_STACK: RefCell<Vec<(NonZeroU64, Rc<dyn ProcessingUnit>)>> =
        RefCell::new(Vec::new());
);

/// The unit governing ambient arithmetic on this thread. Fails with
/// [`Error::NoActiveUnit`] if no scope has been entered.
pub fn active() -> Result<Rc<dyn ProcessingUnit>, Error> {
    UNIT_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|(_, unit)| Rc::clone(unit))
            .ok_or(Error::NoActiveUnit)
    })
}

/// Makes `unit` the active unit of this thread. The previously active unit
/// becomes visible again when the returned guard drops, so scopes nest
/// LIFO.
pub fn enter(unit: Rc<dyn ProcessingUnit>) -> UnitGuard {
    let generation = UNIT_GEN.with(|g| {
        let generation = g.get();
        g.set(
            NonZeroU64::new(generation.get().wrapping_add(1))
                .expect("unit scope generation counter overflow"),
        );
        generation
    });
    UNIT_STACK.with(|stack| {
        stack.borrow_mut().push((generation, unit));
    });
    UnitGuard {
        generation,
        _no_send_or_sync: PhantomData,
    }
}

/// Scope handle returned by [`enter`]. Dropping it deactivates the unit and
/// restores the previously active one.
#[derive(Debug)]
pub struct UnitGuard {
    generation: NonZeroU64,
    _no_send_or_sync: PhantomData<*const ()>,
}

impl Drop for UnitGuard {
    /// # Panics
    ///
    /// If a scope entered after this one is still open: the stack invariant
    /// is violated and arithmetic after this point would silently run under
    /// the wrong unit.
    fn drop(&mut self) {
        let ordered = UNIT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            match stack.last() {
                Some((generation, _)) if *generation == self.generation => {
                    stack.pop();
                    true
                }
                _ => false,
            }
        });
        if !ordered && !std::thread::panicking() {
            panic!("unit scopes must be exited in LIFO order");
        }
    }
}
