//! Dynamic state selection for hybrid DAE models.
//!
//! When a mode switch makes a chosen differential state structurally
//! redundant, integration cannot continue on the old state vector. This
//! crate picks, per state set, a non-singular subset of the candidate
//! variables via full pivoted elimination of the constraint coefficient
//! matrix, with hysteresis so monitoring calls do not churn between
//! equally valid selections.

pub mod error;
pub mod selection;
pub mod state_set;

mod pivot;

pub use error::{SelectError, SelectResult};
pub use selection::SystemStateSelection;
pub use state_set::StateSet;
