//! Error types for state selection.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectError {
    #[error("state selection called before initialize")]
    NotInitialized,

    /// No non-singular selection of the required size exists among the
    /// enabled candidates. A modeling defect, fatal to the instance.
    #[error("state set {set}: structural singularity, rank {rank} but {needed} states required")]
    StructuralSingularity {
        set: usize,
        rank: usize,
        needed: usize,
    },

    #[error("state set {set}: {states} states exceed {candidates} candidates")]
    TooManyStates {
        set: usize,
        states: usize,
        candidates: usize,
    },

    #[error("state set {set}: {what} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        set: usize,
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type SelectResult<T> = Result<T, SelectError>;
