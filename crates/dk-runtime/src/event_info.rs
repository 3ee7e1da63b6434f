//! Event status record returned by the coordinator operations.

use dk_core::Real;

/// Discrete-event status handed back to the orchestrator after
/// `initialize` and every `event_update` pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EventInfo {
    /// The discrete state reached a fixed point this pass. While false,
    /// the orchestrator must call `event_update` again before resuming
    /// integration.
    pub iteration_converged: bool,
    /// A state-selection switch remapped the continuous-state reference
    /// tables; `state_value_references()` reflects the new mapping.
    pub state_value_references_changed: bool,
    /// Continuous state values changed discontinuously; the integrator
    /// must restart from current variable values.
    pub state_values_changed: bool,
    /// The model's equations requested the end of the simulation.
    pub terminate_simulation: bool,
    pub upcoming_time_event: bool,
    /// Meaningful only while `upcoming_time_event` is true.
    pub next_event_time: Real,
}
