//! Pivot records for one switchable group of state candidates.

use dk_model::CandidateInfo;

/// Active selection of one state set.
///
/// `row_pivot` and `col_pivot` are permutations of `0..candidates`. The
/// leading `states` entries of `col_pivot` name the candidates currently
/// acting as differential states; the trailing entries are demoted to the
/// algebraic "dummy" role. The leading block of the pivot pair addresses a
/// non-singular sub-matrix of the constraint coefficient matrix whenever a
/// selection is active.
#[derive(Clone, Debug)]
pub struct StateSet {
    candidates: usize,
    states: usize,
    pub(crate) row_pivot: Vec<usize>,
    pub(crate) col_pivot: Vec<usize>,
}

impl StateSet {
    /// Seed with identity ordering: the model's declared default state
    /// choice occupies the leading block.
    pub(crate) fn identity(info: CandidateInfo) -> Self {
        Self {
            candidates: info.candidates,
            states: info.states,
            row_pivot: (0..info.candidates).collect(),
            col_pivot: (0..info.candidates).collect(),
        }
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn states(&self) -> usize {
        self.states
    }

    /// Candidates currently demoted to the algebraic role.
    pub fn dummies(&self) -> usize {
        self.candidates - self.states
    }

    /// Candidate indices currently selected as differential states.
    pub fn selected(&self) -> &[usize] {
        &self.col_pivot[..self.states]
    }

    /// Candidate indices currently demoted to dummies.
    pub fn demoted(&self) -> &[usize] {
        &self.col_pivot[self.states..]
    }

    pub fn row_pivot(&self) -> &[usize] {
        &self.row_pivot
    }

    pub fn col_pivot(&self) -> &[usize] {
        &self.col_pivot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_seed_partitions_candidates() {
        let set = StateSet::identity(CandidateInfo {
            candidates: 5,
            states: 2,
        });
        assert_eq!(set.selected(), &[0, 1]);
        assert_eq!(set.demoted(), &[2, 3, 4]);
        assert_eq!(set.states() + set.dummies(), set.candidates());
    }
}
