//! Runtime error taxonomy.
//!
//! Four families, all fatal to the instance:
//! - contract violations (`IllegalCall`, `ArgumentCount`, `VrOutOfRange`,
//!   `GuidMismatch`, `Description`): wrong call-sequence state or
//!   malformed arguments, rejected before any model data is touched
//! - `ResourceExhaustion`: sub-solver allocation failure
//! - `StructuralSingularity`: no valid state selection exists under the
//!   current mode, a modeling defect that is not recoverable at runtime
//! - `NumericFailure`: an initial-condition or discrete-update solve did
//!   not converge
//!
//! Once an instance is in the `Error` state every further operation fails
//! with `IllegalCall` until the instance is dropped.

use crate::instance::InstanceState;
use dk_model::ModelError;
use dk_select::SelectError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("{op}: illegal call sequence in state {state}")]
    IllegalCall {
        op: &'static str,
        state: InstanceState,
    },

    #[error("{op}: expected {expected} values, got {actual}")]
    ArgumentCount {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{op}: illegal value reference {index} (limit {len})")]
    VrOutOfRange {
        op: &'static str,
        index: usize,
        len: usize,
    },

    #[error("wrong GUID {actual}, expected {expected}")]
    GuidMismatch { expected: String, actual: String },

    #[error("invalid model structure: {what}")]
    Description { what: String },

    #[error("allocation failed: {what}")]
    ResourceExhaustion { what: String },

    #[error("state set {set}: structural singularity, rank {rank} but {needed} states required")]
    StructuralSingularity {
        set: usize,
        rank: usize,
        needed: usize,
    },

    #[error("numeric failure: {what}")]
    NumericFailure { what: String },
}

impl RuntimeError {
    /// Wrong call sequence or malformed arguments, as opposed to a
    /// numeric or structural failure of the model itself.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            RuntimeError::IllegalCall { .. }
                | RuntimeError::ArgumentCount { .. }
                | RuntimeError::VrOutOfRange { .. }
                | RuntimeError::GuidMismatch { .. }
                | RuntimeError::Description { .. }
        )
    }
}

impl From<ModelError> for RuntimeError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Description { what } => RuntimeError::Description { what },
            ModelError::Allocation { what } => RuntimeError::ResourceExhaustion { what },
            ModelError::Numeric { what } => RuntimeError::NumericFailure { what },
            ModelError::Core(core) => RuntimeError::NumericFailure {
                what: core.to_string(),
            },
        }
    }
}

impl From<SelectError> for RuntimeError {
    fn from(e: SelectError) -> Self {
        match e {
            SelectError::StructuralSingularity { set, rank, needed } => {
                RuntimeError::StructuralSingularity { set, rank, needed }
            }
            other => RuntimeError::Description {
                what: other.to_string(),
            },
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
