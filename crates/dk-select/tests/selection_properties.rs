//! Property tests: selection output stays a well-formed partition and
//! repeated calls on an unchanged matrix settle immediately.

use dk_core::{Real, Tolerances};
use dk_model::{CandidateInfo, CandidateMatrixProvider};
use dk_select::{SelectError, SystemStateSelection};
use nalgebra::DMatrix;
use proptest::prelude::*;

struct OneSet {
    info: CandidateInfo,
    matrix: DMatrix<Real>,
}

impl CandidateMatrixProvider for OneSet {
    fn state_set_count(&self) -> usize {
        1
    }

    fn candidate_info(&self, _set: usize) -> CandidateInfo {
        self.info
    }

    fn candidate_mask(&self, _set: usize) -> Vec<bool> {
        vec![true; self.info.candidates]
    }

    fn coefficient_matrix(&self, _set: usize, _mask: &[bool]) -> DMatrix<Real> {
        self.matrix.clone()
    }
}

proptest! {
    #[test]
    fn pivots_stay_permutations_and_selection_settles(
        entries in prop::collection::vec(-10.0f64..10.0, 16),
        states in 1usize..=4,
    ) {
        let provider = OneSet {
            info: CandidateInfo { candidates: 4, states },
            matrix: DMatrix::from_row_slice(4, 4, &entries),
        };
        let mut mgr = SystemStateSelection::new(Tolerances::default());
        mgr.initialize(&provider).unwrap();

        match mgr.state_selection(&provider, true) {
            Ok(_) => {
                let set = &mgr.sets()[0];
                prop_assert_eq!(set.states() + set.dummies(), set.candidates());

                let mut cols = set.col_pivot().to_vec();
                cols.sort_unstable();
                prop_assert_eq!(cols, (0..4).collect::<Vec<_>>());
                let mut rows = set.row_pivot().to_vec();
                rows.sort_unstable();
                prop_assert_eq!(rows, (0..4).collect::<Vec<_>>());

                // Unchanged matrix: the selection must already be settled.
                prop_assert!(!mgr.state_selection(&provider, true).unwrap());
            }
            Err(SelectError::StructuralSingularity { rank, needed, .. }) => {
                prop_assert!(rank < needed);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
