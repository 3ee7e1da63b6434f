//! Selection manager: owns the active pivots and decides switches.

use crate::error::{SelectError, SelectResult};
use crate::pivot;
use crate::state_set::StateSet;
use dk_core::Tolerances;
use dk_model::CandidateMatrixProvider;
use tracing::debug;

/// Owns one [`StateSet`] per switchable candidate group and runs the
/// selection algorithm against the model's [`CandidateMatrixProvider`].
#[derive(Debug)]
pub struct SystemStateSelection {
    sets: Vec<StateSet>,
    tol: Tolerances,
    initialized: bool,
}

impl SystemStateSelection {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            sets: Vec::new(),
            tol,
            initialized: false,
        }
    }

    pub fn tolerances(&self) -> Tolerances {
        self.tol
    }

    /// Override the singularity tolerance, e.g. from a caller-supplied
    /// relative tolerance at instance initialization.
    pub fn set_tolerances(&mut self, tol: Tolerances) {
        self.tol = tol;
    }

    pub fn sets(&self) -> &[StateSet] {
        &self.sets
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Allocate pivot records for every state set, seeded with the model's
    /// declared default selection.
    pub fn initialize(&mut self, provider: &dyn CandidateMatrixProvider) -> SelectResult<()> {
        let count = provider.state_set_count();
        let mut sets = Vec::with_capacity(count);
        for idx in 0..count {
            let info = provider.candidate_info(idx);
            if info.states > info.candidates {
                return Err(SelectError::TooManyStates {
                    set: idx,
                    states: info.states,
                    candidates: info.candidates,
                });
            }
            sets.push(StateSet::identity(info));
        }
        self.sets = sets;
        self.initialized = true;
        Ok(())
    }

    /// Re-evaluate the selection of every state set.
    ///
    /// `switch_states` distinguishes the two call sites: `false` is the
    /// post-step monitoring check, where a still-valid selection is kept
    /// even if pivoting would prefer another (hysteresis); `true` is the
    /// discrete-event re-evaluation, which commits whatever full pivoting
    /// proposes.
    ///
    /// Returns `true` iff at least one set's selected block changed, which
    /// obliges the caller to rebuild the integrator's state vector from
    /// current variable values. On [`SelectError::StructuralSingularity`]
    /// no set is partially committed.
    pub fn state_selection(
        &mut self,
        provider: &dyn CandidateMatrixProvider,
        switch_states: bool,
    ) -> SelectResult<bool> {
        if !self.initialized {
            return Err(SelectError::NotInitialized);
        }

        // Two phases so a structural singularity in any set commits
        // nothing at all, not even the sets examined before it.
        let mut proposals: Vec<Option<(Vec<usize>, Vec<usize>)>> = vec![None; self.sets.len()];
        for (idx, set) in self.sets.iter().enumerate() {
            if set.candidates() == 0 || set.states() == 0 {
                continue;
            }

            let mask = provider.candidate_mask(idx);
            if mask.len() != set.candidates() {
                return Err(SelectError::DimensionMismatch {
                    set: idx,
                    what: "candidate mask",
                    expected: set.candidates(),
                    actual: mask.len(),
                });
            }
            let a = provider.coefficient_matrix(idx, &mask);
            if a.nrows() != set.candidates() || a.ncols() != set.candidates() {
                return Err(SelectError::DimensionMismatch {
                    set: idx,
                    what: "coefficient matrix",
                    expected: set.candidates(),
                    actual: a.nrows().max(a.ncols()),
                });
            }

            let threshold = self.tol.pivot_threshold(a.amax());

            // Propose a fresh pivot, seeded from the active one so an
            // unchanged matrix reproduces the active order exactly.
            let mut new_rp = set.row_pivot.clone();
            let mut new_cp = set.col_pivot.clone();
            pivot::eliminate(&a, &mask, set.states(), threshold, &mut new_rp, &mut new_cp)
                .map_err(|rank| SelectError::StructuralSingularity {
                    set: idx,
                    rank,
                    needed: set.states(),
                })?;

            let differing = pivot::compare_leading(&set.col_pivot, &new_cp, set.states());
            if differing == 0 {
                continue;
            }

            if !switch_states && old_selection_valid(set, &a, &mask, threshold) {
                debug!(
                    set = idx,
                    differing, "keeping still-valid state selection (monitoring call)"
                );
                continue;
            }

            debug!(
                set = idx,
                differing,
                selected = ?&new_cp[..set.states()],
                "state selection switched"
            );
            proposals[idx] = Some((new_rp, new_cp));
        }

        let mut changed = false;
        for (set, proposal) in self.sets.iter_mut().zip(proposals) {
            if let Some((new_rp, new_cp)) = proposal {
                set.row_pivot = new_rp;
                set.col_pivot = new_cp;
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Is the active leading block still usable: every selected candidate
/// enabled, and the addressed sub-matrix non-singular under `threshold`?
fn old_selection_valid(
    set: &StateSet,
    a: &nalgebra::DMatrix<dk_core::Real>,
    mask: &[bool],
    threshold: dk_core::Real,
) -> bool {
    if set.selected().iter().any(|&c| !mask[c]) {
        return false;
    }
    let s = set.states();
    pivot::block_rank(a, &set.row_pivot()[..s], &set.col_pivot()[..s], threshold) == s
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk_core::Real;
    use dk_model::CandidateInfo;
    use nalgebra::{DMatrix, dmatrix};

    /// Provider with one state set whose matrix and mask are swappable.
    struct OneSet {
        info: CandidateInfo,
        matrix: DMatrix<Real>,
        mask: Vec<bool>,
    }

    impl OneSet {
        fn new(states: usize, matrix: DMatrix<Real>) -> Self {
            let candidates = matrix.nrows();
            Self {
                info: CandidateInfo { candidates, states },
                matrix,
                mask: vec![true; candidates],
            }
        }
    }

    impl CandidateMatrixProvider for OneSet {
        fn state_set_count(&self) -> usize {
            1
        }

        fn candidate_info(&self, _set: usize) -> CandidateInfo {
            self.info
        }

        fn candidate_mask(&self, _set: usize) -> Vec<bool> {
            self.mask.clone()
        }

        fn coefficient_matrix(&self, _set: usize, _mask: &[bool]) -> DMatrix<Real> {
            self.matrix.clone()
        }
    }

    fn manager(provider: &OneSet) -> SystemStateSelection {
        let mut mgr = SystemStateSelection::new(Tolerances::default());
        mgr.initialize(provider).unwrap();
        mgr
    }

    #[test]
    fn initialize_rejects_more_states_than_candidates() {
        let provider = OneSet::new(4, DMatrix::identity(3, 3));
        let mut mgr = SystemStateSelection::new(Tolerances::default());
        let err = mgr.initialize(&provider).unwrap_err();
        assert!(matches!(err, SelectError::TooManyStates { .. }));
    }

    #[test]
    fn selection_before_initialize_fails() {
        let provider = OneSet::new(1, DMatrix::identity(2, 2));
        let mut mgr = SystemStateSelection::new(Tolerances::default());
        assert!(matches!(
            mgr.state_selection(&provider, true),
            Err(SelectError::NotInitialized)
        ));
    }

    #[test]
    fn default_selection_kept_when_valid() {
        let provider = OneSet::new(2, DMatrix::identity(3, 3));
        let mut mgr = manager(&provider);
        assert!(!mgr.state_selection(&provider, false).unwrap());
        assert_eq!(mgr.sets()[0].selected(), &[0, 1]);
    }

    #[test]
    fn hysteresis_keeps_valid_old_selection_on_monitoring_call() {
        // Pivoting prefers the large column 2, but {0,1} is still
        // perfectly non-singular: the monitoring call must not churn.
        let a = dmatrix![1.0, 0.0, 10.0;
                        0.0, 1.0, 10.0;
                        0.0, 0.0, 0.0];
        let provider = OneSet::new(2, a);
        let mut mgr = manager(&provider);
        assert!(!mgr.state_selection(&provider, false).unwrap());
        assert_eq!(mgr.sets()[0].selected(), &[0, 1]);
    }

    #[test]
    fn commit_mode_adopts_pivoting_preference() {
        let a = dmatrix![1.0, 0.0, 10.0;
                        0.0, 1.0, 10.0;
                        0.0, 0.0, 0.0];
        let provider = OneSet::new(2, a);
        let mut mgr = manager(&provider);
        assert!(mgr.state_selection(&provider, true).unwrap());
        assert!(mgr.sets()[0].selected().contains(&2));
    }

    #[test]
    fn forced_switch_on_singular_old_selection() {
        // Mode change wipes candidate 1 out of the constraints: {0,1}
        // becomes singular while {0,2} stays regular. Even the monitoring
        // call must switch, demoting candidate 1 to the dummy role.
        let a = dmatrix![1.0, 0.0, 0.0;
                        0.0, 0.0, 1.0;
                        0.0, 0.0, 0.0];
        let provider = OneSet::new(2, a);
        let mut mgr = manager(&provider);
        assert!(mgr.state_selection(&provider, false).unwrap());
        let set = &mgr.sets()[0];
        let mut selected = set.selected().to_vec();
        selected.sort_unstable();
        assert_eq!(selected, vec![0, 2]);
        assert_eq!(set.demoted(), &[1]);
    }

    #[test]
    fn forced_switch_via_disabled_candidate() {
        // Structural ineligibility: the mode disables candidate 1
        // entirely, so the old selection is invalid regardless of values.
        let a = dmatrix![1.0, 1.0, 0.0;
                        0.0, 1.0, 1.0;
                        0.0, 0.0, 0.0];
        let mut provider = OneSet::new(2, a);
        provider.mask[1] = false;
        let mut mgr = manager(&provider);
        assert!(mgr.state_selection(&provider, true).unwrap());
        let mut selected = mgr.sets()[0].selected().to_vec();
        selected.sort_unstable();
        assert_eq!(selected, vec![0, 2]);
    }

    #[test]
    fn idempotent_after_commit() {
        let a = dmatrix![1.0, 0.0, 0.0;
                        0.0, 0.0, 1.0;
                        0.0, 0.0, 0.0];
        let provider = OneSet::new(2, a);
        let mut mgr = manager(&provider);
        assert!(mgr.state_selection(&provider, false).unwrap());
        let pivot_after_first = mgr.sets()[0].col_pivot().to_vec();
        assert!(!mgr.state_selection(&provider, false).unwrap());
        assert_eq!(mgr.sets()[0].col_pivot(), &pivot_after_first[..]);
    }

    #[test]
    fn structural_singularity_is_fatal_and_commits_nothing() {
        let a = dmatrix![1.0, 1.0, 1.0;
                        2.0, 2.0, 2.0;
                        3.0, 3.0, 3.0];
        let provider = OneSet::new(2, a);
        let mut mgr = manager(&provider);
        let before = mgr.sets()[0].col_pivot().to_vec();
        let err = mgr.state_selection(&provider, true).unwrap_err();
        assert!(matches!(
            err,
            SelectError::StructuralSingularity {
                set: 0,
                rank: 1,
                needed: 2
            }
        ));
        assert_eq!(mgr.sets()[0].col_pivot(), &before[..]);
    }

    #[test]
    fn partition_invariant_holds_after_switches() {
        let a = dmatrix![1.0, 0.0, 0.0;
                        0.0, 0.0, 1.0;
                        0.0, 0.0, 0.0];
        let provider = OneSet::new(2, a);
        let mut mgr = manager(&provider);
        mgr.state_selection(&provider, true).unwrap();
        let set = &mgr.sets()[0];
        assert_eq!(set.states() + set.dummies(), set.candidates());
        let mut all = set.col_pivot().to_vec();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2]);
    }
}
