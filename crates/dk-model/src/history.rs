//! Fixed-capacity ring of variable snapshots.
//!
//! The runtime keeps the last few accepted time steps' variable values for
//! delay/history evaluation and for discarding stale continuous history
//! after a discrete event. This is the explicit, step-indexed replacement
//! for the raw pointer-rotation ring the exported C interface used.

use crate::variables::VariableBank;
use dk_core::{CoreError, CoreResult};

/// Circular history of [`VariableBank`] snapshots.
///
/// Exactly one slot is "current"; `advance` rotates by one slot, seeding
/// the new current snapshot with a copy of the previous one so partially
/// updated steps never expose uninitialized values. `previous(k)` reads
/// the snapshot `k` accepted steps back.
#[derive(Clone, Debug)]
pub struct History {
    slots: Vec<VariableBank>,
    head: usize,
    steps: u64,
}

impl History {
    /// Create a history of `depth` slots, all seeded from `template`.
    ///
    /// A depth of at least 2 is required: one current slot plus one
    /// retained step for pre-value and delay lookups.
    pub fn new(depth: usize, template: VariableBank) -> CoreResult<Self> {
        if depth < 2 {
            return Err(CoreError::InvalidArg {
                what: "history depth must be at least 2",
            });
        }
        Ok(Self {
            slots: vec![template; depth],
            head: 0,
            steps: 0,
        })
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Number of times the ring has advanced since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The working snapshot for the step in progress.
    pub fn current(&self) -> &VariableBank {
        &self.slots[self.head]
    }

    pub fn current_mut(&mut self) -> &mut VariableBank {
        &mut self.slots[self.head]
    }

    /// Snapshot `offset` steps back; `previous(0)` is `current()`.
    ///
    /// Returns `None` when the offset exceeds the retained depth or the
    /// number of steps taken so far.
    pub fn previous(&self, offset: usize) -> Option<&VariableBank> {
        if offset >= self.slots.len() || offset as u64 > self.steps {
            return None;
        }
        let depth = self.slots.len();
        let idx = (self.head + depth - offset) % depth;
        Some(&self.slots[idx])
    }

    /// Rotate one slot: the working snapshot becomes step history and the
    /// new working snapshot starts as a copy of it.
    pub fn advance(&mut self) {
        let prev = self.head;
        self.head = (self.head + 1) % self.slots.len();
        let snapshot = self.slots[prev].clone();
        self.slots[self.head] = snapshot;
        self.steps += 1;
    }

    /// Overwrite every retained snapshot with the current one.
    ///
    /// Called after a discrete event: values from before the jump must not
    /// leak into delay/history lookups.
    pub fn flush(&mut self) {
        let current = self.slots[self.head].clone();
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if idx != self.head {
                *slot = current.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk_core::ValueRef;

    fn vr(i: u32) -> ValueRef {
        ValueRef::from_index(i)
    }

    fn history() -> History {
        History::new(3, VariableBank::with_counts(1, 0, 0, 0)).unwrap()
    }

    #[test]
    fn rejects_depth_below_two() {
        assert!(History::new(1, VariableBank::default()).is_err());
    }

    #[test]
    fn advance_seeds_current_from_previous() {
        let mut h = history();
        h.current_mut().set_real(vr(0), 1.5).unwrap();
        h.advance();
        // new current starts as a copy
        assert_eq!(h.current().real(vr(0)).unwrap(), 1.5);
        // and the old step is retained at offset 1
        h.current_mut().set_real(vr(0), 2.5).unwrap();
        assert_eq!(h.previous(1).unwrap().real(vr(0)).unwrap(), 1.5);
        assert_eq!(h.previous(0).unwrap().real(vr(0)).unwrap(), 2.5);
    }

    #[test]
    fn previous_bounded_by_depth_and_steps() {
        let mut h = history();
        assert!(h.previous(1).is_none()); // no steps taken yet
        h.advance();
        assert!(h.previous(1).is_some());
        assert!(h.previous(2).is_none()); // only one step taken
        h.advance();
        h.advance();
        assert!(h.previous(2).is_some());
        assert!(h.previous(3).is_none()); // beyond retained depth
    }

    #[test]
    fn wrap_around_keeps_most_recent_snapshots() {
        let mut h = history();
        for step in 0..5 {
            h.current_mut().set_real(vr(0), step as f64).unwrap();
            h.advance();
        }
        h.current_mut().set_real(vr(0), 99.0).unwrap();
        assert_eq!(h.previous(1).unwrap().real(vr(0)).unwrap(), 4.0);
        assert_eq!(h.previous(2).unwrap().real(vr(0)).unwrap(), 3.0);
    }

    #[test]
    fn flush_discards_history() {
        let mut h = history();
        h.current_mut().set_real(vr(0), 1.0).unwrap();
        h.advance();
        h.current_mut().set_real(vr(0), 2.0).unwrap();
        h.flush();
        assert_eq!(h.previous(1).unwrap().real(vr(0)).unwrap(), 2.0);
    }
}
