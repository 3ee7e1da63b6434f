//! Structural model description owned by each instance.
//!
//! Replaces the exported C interface's compile-time constant tables
//! (`NUMBER_OF_REALS`, `vrStates[]`, ...) with configuration data built by
//! the surrounding model runtime and handed to `instantiate`, so several
//! instances of different models can coexist in one process.

use crate::error::{ModelError, ModelResult};
use crate::sample::SamplePlan;
use dk_core::ValueRef;

/// Variable mapping of one switchable state set.
///
/// `candidates[i]` and `derivatives[i]` are the real-variable references
/// of the i-th candidate and its derivative. `slots` lists the positions
/// of the global continuous-state vector this set's selected states
/// occupy; its length is the set's true state count.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSetVars {
    pub candidates: Vec<ValueRef>,
    pub derivatives: Vec<ValueRef>,
    pub slots: Vec<usize>,
}

impl StateSetVars {
    pub fn n_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn n_states(&self) -> usize {
        self.slots.len()
    }
}

/// Frozen structural description of one compiled model.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelDescription {
    pub name: String,
    /// Identity handshake token checked at instantiation.
    pub guid: String,
    pub n_reals: usize,
    pub n_integers: usize,
    pub n_booleans: usize,
    pub n_strings: usize,
    pub n_event_indicators: usize,
    /// Default (initial selection) continuous-state references.
    pub state_refs: Vec<ValueRef>,
    /// Derivative reference for each entry of `state_refs`.
    pub derivative_refs: Vec<ValueRef>,
    /// Switchable state sets; may be empty for fixed-causality models.
    pub state_sets: Vec<StateSetVars>,
    pub samples: Vec<SamplePlan>,
    /// Snapshot ring depth for delay/history evaluation (>= 2).
    pub history_depth: usize,
}

impl ModelDescription {
    pub fn n_states(&self) -> usize {
        self.state_refs.len()
    }

    /// Structural consistency check, run once at instantiation.
    pub fn validate(&self) -> ModelResult<()> {
        if self.guid.is_empty() {
            return Err(ModelError::Description {
                what: "model GUID must not be empty".into(),
            });
        }
        if self.state_refs.len() != self.derivative_refs.len() {
            return Err(ModelError::Description {
                what: format!(
                    "{} state refs but {} derivative refs",
                    self.state_refs.len(),
                    self.derivative_refs.len()
                ),
            });
        }
        if self.history_depth < 2 {
            return Err(ModelError::Description {
                what: "history depth must be at least 2".into(),
            });
        }
        for vr in self.state_refs.iter().chain(self.derivative_refs.iter()) {
            if vr.as_usize() >= self.n_reals {
                return Err(ModelError::Description {
                    what: format!("state/derivative ref {vr} exceeds {} reals", self.n_reals),
                });
            }
        }
        for (i, set) in self.state_sets.iter().enumerate() {
            if set.candidates.len() != set.derivatives.len() {
                return Err(ModelError::Description {
                    what: format!("state set {i}: candidate/derivative length mismatch"),
                });
            }
            if set.slots.len() > set.candidates.len() {
                return Err(ModelError::Description {
                    what: format!(
                        "state set {i}: {} states exceed {} candidates",
                        set.slots.len(),
                        set.candidates.len()
                    ),
                });
            }
            for vr in set.candidates.iter().chain(set.derivatives.iter()) {
                if vr.as_usize() >= self.n_reals {
                    return Err(ModelError::Description {
                        what: format!("state set {i}: ref {vr} exceeds {} reals", self.n_reals),
                    });
                }
            }
            for &slot in &set.slots {
                if slot >= self.state_refs.len() {
                    return Err(ModelError::Description {
                        what: format!(
                            "state set {i}: slot {slot} exceeds {} states",
                            self.state_refs.len()
                        ),
                    });
                }
            }
        }
        for (i, plan) in self.samples.iter().enumerate() {
            if plan.interval <= 0.0 || !plan.interval.is_finite() || !plan.start.is_finite() {
                return Err(ModelError::Description {
                    what: format!("sample plan {i} has invalid timing"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vr(i: u32) -> ValueRef {
        ValueRef::from_index(i)
    }

    fn minimal() -> ModelDescription {
        ModelDescription {
            name: "test".into(),
            guid: "{guid}".into(),
            n_reals: 4,
            n_integers: 0,
            n_booleans: 0,
            n_strings: 0,
            n_event_indicators: 0,
            state_refs: vec![vr(0)],
            derivative_refs: vec![vr(1)],
            state_sets: Vec::new(),
            samples: Vec::new(),
            history_depth: 2,
        }
    }

    #[test]
    fn minimal_description_validates() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn rejects_ref_count_mismatch() {
        let mut d = minimal();
        d.derivative_refs.clear();
        assert!(d.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_state_ref() {
        let mut d = minimal();
        d.state_refs = vec![vr(9)];
        assert!(d.validate().is_err());
    }

    #[test]
    fn rejects_state_set_with_more_states_than_candidates() {
        let mut d = minimal();
        d.state_sets = vec![StateSetVars {
            candidates: vec![vr(0), vr(1)],
            derivatives: vec![vr(2), vr(3)],
            slots: vec![0, 0, 0],
        }];
        assert!(d.validate().is_err());
    }

    #[test]
    fn rejects_slot_beyond_state_vector() {
        let mut d = minimal();
        d.state_sets = vec![StateSetVars {
            candidates: vec![vr(0), vr(1)],
            derivatives: vec![vr(2), vr(3)],
            slots: vec![1],
        }];
        assert!(d.validate().is_err());
    }
}
