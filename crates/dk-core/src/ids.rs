use core::fmt;
use core::num::NonZeroU32;

/// Stable handle identifying one model variable across the runtime API.
///
/// Value references are dense 0-based indices into the per-type variable
/// banks of an instance; which bank a reference addresses is determined by
/// the operation it is passed to (`set_reals` vs `set_integers`, ...).
///
/// - `u32` keeps the ref tables small
/// - `NonZero` enables `Option<ValueRef>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueRef(NonZeroU32);

impl ValueRef {
    /// Create a reference from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        // index+1 must be nonzero
        Self(NonZeroU32::new(index + 1).expect("index+1 is nonzero"))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Index as usize, for direct bank addressing.
    pub fn as_usize(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueRef({})", self.index())
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}
