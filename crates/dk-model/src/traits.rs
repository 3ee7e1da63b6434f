//! Collaborator traits consumed by the runtime core.
//!
//! The generated model supplies these: equation evaluation, the state-set
//! coefficient matrices, and algebraic sub-solver lifecycles. The core
//! never owns their internals; it drives them through these seams.

use crate::error::ModelResult;
use crate::variables::VariableBank;
use dk_core::Real;
use nalgebra::DMatrix;

/// Structural sizes of one state set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateInfo {
    /// Number of mutually substitutable candidate variables.
    pub candidates: usize,
    /// Number of true differential states that must be chosen.
    pub states: usize,
}

/// Supplies, per state set, the constraint coefficient matrix over the
/// candidate variables and the candidates' structural eligibility under
/// the active discrete mode.
pub trait CandidateMatrixProvider {
    fn state_set_count(&self) -> usize;

    fn candidate_info(&self, set: usize) -> CandidateInfo;

    /// Eligibility of each candidate this call; disabled candidates must
    /// not be picked as differential states.
    fn candidate_mask(&self, set: usize) -> Vec<bool>;

    /// Square `candidates x candidates` matrix: row `i` is constraint `i`'s
    /// sensitivity to each candidate variable, evaluated at the current
    /// operating point under `mask`.
    fn coefficient_matrix(&self, set: usize, mask: &[bool]) -> DMatrix<Real>;
}

/// Evaluation entry points of the compiled model's equations.
///
/// All methods are synchronous and run to completion; the runtime calls
/// them in a fixed order documented on each coordinator operation.
pub trait ModelEquations {
    /// Propagate declared start values into working storage.
    fn set_start_values(&mut self, vars: &mut VariableBank) -> ModelResult<()>;

    /// Solve the initial-condition system at time `t`. A non-converging
    /// solve is a numeric failure, fatal to the instance.
    fn solve_initial(&mut self, t: Real, vars: &mut VariableBank) -> ModelResult<()>;

    /// Full residual/update evaluation: derivatives, algebraics and
    /// discrete equations.
    fn evaluate_dae(&mut self, t: Real, vars: &mut VariableBank) -> ModelResult<()>;

    /// Algebraic/output equations only, after an accepted integrator step.
    fn evaluate_algebraics(&mut self, t: Real, vars: &mut VariableBank) -> ModelResult<()>;

    /// Zero-crossing indicator functions at the current point.
    fn evaluate_zero_crossings(&mut self, t: Real, vars: &VariableBank) -> ModelResult<Vec<Real>>;

    /// Did any discrete variable change against its pre-event value?
    fn check_discrete_changes(&mut self, vars: &VariableBank) -> bool;

    /// Did any relation (zero-crossing sign) flip against its stored state?
    fn check_relations(&mut self, t: Real, vars: &VariableBank) -> bool;

    /// Latch current values as the "pre" values for discrete-change
    /// detection. Models without discrete variables can ignore this.
    fn store_pre_values(&mut self, _vars: &VariableBank) {}

    /// Latch current relation signs.
    fn store_relations(&mut self, _t: Real, _vars: &VariableBank) {}

    /// Flush buffered delayed-variable history for the completed step.
    fn store_delayed(&mut self, _t: Real, _vars: &VariableBank) {}

    /// Model-driven cancellation: the equations may ask the orchestrator
    /// to stop the simulation at the next event boundary.
    fn terminate_requested(&self) -> bool {
        false
    }
}

/// Lifecycle of the algebraic sub-solvers the model's equations need.
///
/// Allocation happens once during `initialize`, release during
/// `terminate`. Any allocation failure is fatal to the instance.
pub trait SubSolvers {
    fn allocate_nonlinear(&mut self) -> ModelResult<()> {
        Ok(())
    }

    fn allocate_linear(&mut self) -> ModelResult<()> {
        Ok(())
    }

    fn allocate_mixed(&mut self) -> ModelResult<()> {
        Ok(())
    }

    fn allocate_state_set_jacobians(&mut self) -> ModelResult<()> {
        Ok(())
    }

    fn free_nonlinear(&mut self) {}

    fn free_linear(&mut self) {}

    fn free_mixed(&mut self) {}

    fn free_state_set_jacobians(&mut self) {}
}

/// Sub-solver bank for models without algebraic loops.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSolvers;

impl SubSolvers for NullSolvers {}
