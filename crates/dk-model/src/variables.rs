//! Typed variable storage addressed by value reference.

use dk_core::{CoreError, CoreResult, Real, ValueRef};

/// One instance's working variable storage.
///
/// Four dense banks, one per variable type. A `ValueRef` indexes into the
/// bank selected by the accessor it is passed to; every access is bounds
/// checked and reports `CoreError::RefOob` instead of panicking.
#[derive(Clone, Debug, Default)]
pub struct VariableBank {
    reals: Vec<Real>,
    integers: Vec<i32>,
    booleans: Vec<bool>,
    strings: Vec<String>,
}

impl VariableBank {
    /// Allocate zeroed/empty banks of the given sizes.
    pub fn with_counts(n_reals: usize, n_integers: usize, n_booleans: usize, n_strings: usize) -> Self {
        Self {
            reals: vec![0.0; n_reals],
            integers: vec![0; n_integers],
            booleans: vec![false; n_booleans],
            strings: vec![String::new(); n_strings],
        }
    }

    pub fn n_reals(&self) -> usize {
        self.reals.len()
    }

    pub fn n_integers(&self) -> usize {
        self.integers.len()
    }

    pub fn n_booleans(&self) -> usize {
        self.booleans.len()
    }

    pub fn n_strings(&self) -> usize {
        self.strings.len()
    }

    pub fn real(&self, vr: ValueRef) -> CoreResult<Real> {
        self.reals
            .get(vr.as_usize())
            .copied()
            .ok_or(CoreError::RefOob {
                what: "real variable",
                index: vr.as_usize(),
                len: self.reals.len(),
            })
    }

    pub fn set_real(&mut self, vr: ValueRef, value: Real) -> CoreResult<()> {
        let len = self.reals.len();
        match self.reals.get_mut(vr.as_usize()) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CoreError::RefOob {
                what: "real variable",
                index: vr.as_usize(),
                len,
            }),
        }
    }

    pub fn integer(&self, vr: ValueRef) -> CoreResult<i32> {
        self.integers
            .get(vr.as_usize())
            .copied()
            .ok_or(CoreError::RefOob {
                what: "integer variable",
                index: vr.as_usize(),
                len: self.integers.len(),
            })
    }

    pub fn set_integer(&mut self, vr: ValueRef, value: i32) -> CoreResult<()> {
        let len = self.integers.len();
        match self.integers.get_mut(vr.as_usize()) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CoreError::RefOob {
                what: "integer variable",
                index: vr.as_usize(),
                len,
            }),
        }
    }

    pub fn boolean(&self, vr: ValueRef) -> CoreResult<bool> {
        self.booleans
            .get(vr.as_usize())
            .copied()
            .ok_or(CoreError::RefOob {
                what: "boolean variable",
                index: vr.as_usize(),
                len: self.booleans.len(),
            })
    }

    pub fn set_boolean(&mut self, vr: ValueRef, value: bool) -> CoreResult<()> {
        let len = self.booleans.len();
        match self.booleans.get_mut(vr.as_usize()) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CoreError::RefOob {
                what: "boolean variable",
                index: vr.as_usize(),
                len,
            }),
        }
    }

    pub fn string(&self, vr: ValueRef) -> CoreResult<&str> {
        self.strings
            .get(vr.as_usize())
            .map(String::as_str)
            .ok_or(CoreError::RefOob {
                what: "string variable",
                index: vr.as_usize(),
                len: self.strings.len(),
            })
    }

    /// Assign a string slot. The owned `String` keeps its capacity across
    /// assignments of equal or shorter values.
    pub fn set_string(&mut self, vr: ValueRef, value: &str) -> CoreResult<()> {
        let len = self.strings.len();
        match self.strings.get_mut(vr.as_usize()) {
            Some(slot) => {
                slot.clear();
                slot.push_str(value);
                Ok(())
            }
            None => Err(CoreError::RefOob {
                what: "string variable",
                index: vr.as_usize(),
                len,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vr(i: u32) -> ValueRef {
        ValueRef::from_index(i)
    }

    #[test]
    fn real_round_trip() {
        let mut bank = VariableBank::with_counts(3, 0, 0, 0);
        bank.set_real(vr(1), 4.25).unwrap();
        assert_eq!(bank.real(vr(1)).unwrap(), 4.25);
        assert_eq!(bank.real(vr(0)).unwrap(), 0.0);
    }

    #[test]
    fn out_of_range_reports_ref_oob() {
        let mut bank = VariableBank::with_counts(2, 1, 1, 1);
        assert!(bank.real(vr(2)).is_err());
        assert!(bank.set_real(vr(7), 1.0).is_err());
        assert!(bank.integer(vr(1)).is_err());
        assert!(bank.set_boolean(vr(3), true).is_err());
        assert!(bank.string(vr(1)).is_err());
    }

    #[test]
    fn string_set_keeps_value_across_shorter_assignments() {
        let mut bank = VariableBank::with_counts(0, 0, 0, 1);
        bank.set_string(vr(0), "longer value").unwrap();
        bank.set_string(vr(0), "short").unwrap();
        assert_eq!(bank.string(vr(0)).unwrap(), "short");
    }

    #[test]
    fn counts_reflect_allocation() {
        let bank = VariableBank::with_counts(4, 3, 2, 1);
        assert_eq!(bank.n_reals(), 4);
        assert_eq!(bank.n_integers(), 3);
        assert_eq!(bank.n_booleans(), 2);
        assert_eq!(bank.n_strings(), 1);
    }
}
