//! Hybrid event coordination: initialize, post-step check, event update,
//! terminate.
//!
//! The coordinator never loops internally. `event_update` performs exactly
//! one discrete pass and reports `iteration_converged`; driving the passes
//! to a fixed point, and bounding them, is the orchestrator's job. This
//! control inversion is deliberate: the caller keeps the ability to cap
//! iteration counts or abort on non-convergence.

use crate::error::RuntimeResult;
use crate::event_info::EventInfo;
use crate::instance::{Instance, InstanceState};

impl Instance {
    /// Bring the instance from `Instantiated` to `Initialized`.
    ///
    /// Propagates start values, allocates the algebraic sub-solvers and
    /// the state-selection context, runs the initial-condition solve and
    /// seeds the sample schedule. If a time event is already due at the
    /// start time, one `event_update` pass runs immediately so the
    /// returned [`EventInfo`] describes a consistent discrete state.
    pub fn initialize(
        &mut self,
        tolerance_controlled: bool,
        relative_tolerance: f64,
    ) -> RuntimeResult<EventInfo> {
        self.require("initialize", &[InstanceState::Instantiated])?;
        self.log_debug(format!(
            "initialize: tolerance_controlled={tolerance_controlled} relative_tolerance={relative_tolerance}"
        ));

        if tolerance_controlled {
            self.selection
                .set_tolerances(dk_core::Tolerances::from_relative(relative_tolerance));
        }

        self.equations
            .set_start_values(self.history.current_mut())
            .map_err(|e| self.fail(e.into()))?;

        self.solvers
            .allocate_nonlinear()
            .and_then(|_| self.solvers.allocate_linear())
            .and_then(|_| self.solvers.allocate_mixed())
            .and_then(|_| self.solvers.allocate_state_set_jacobians())
            .map_err(|e| self.fail(e.into()))?;

        self.selection
            .initialize(self.provider.as_ref())
            .map_err(|e| self.fail(e.into()))?;
        self.check_state_set_shapes()?;
        self.apply_selection();

        let time = self.time;
        match self.equations.solve_initial(time, self.history.current_mut()) {
            Ok(()) => self.log_debug("initialize: initial-condition solve succeeded".into()),
            Err(e) => return Err(self.fail(e.into())),
        }

        self.samples.reset(time);
        self.history.flush();

        self.event_info = EventInfo {
            iteration_converged: true,
            state_value_references_changed: false,
            state_values_changed: true,
            terminate_simulation: false,
            upcoming_time_event: false,
            next_event_time: 0.0,
        };
        self.state = InstanceState::Initialized;

        if let Some(next) = self.samples.next_event() {
            self.event_info.upcoming_time_event = true;
            self.event_info.next_event_time = next;
            // A sample due at the start time must be processed before the
            // orchestrator sees the initial discrete state.
            if next <= self.time {
                self.event_update(false)?;
            }
        }

        Ok(self.event_info)
    }

    /// One pass of discrete-event processing.
    ///
    /// Runs state selection in commit mode, fires due sample events,
    /// evaluates the discrete/algebraic update and reports whether another
    /// pass is needed. `intermediate_results` only asks for chattier
    /// logging of the pass; partial results are always visible through the
    /// getters between passes.
    pub fn event_update(&mut self, intermediate_results: bool) -> RuntimeResult<EventInfo> {
        self.require("event_update", &[InstanceState::Initialized])?;
        self.log_debug(format!(
            "event_update: start, next time event {}",
            self.event_info.next_event_time
        ));
        self.event_info.state_values_changed = false;
        self.event_info.state_value_references_changed = false;
        let time = self.time;

        // Refresh zero-crossing/relation state at the event point before
        // anything depends on it.
        self.equations
            .evaluate_zero_crossings(time, self.history.current())
            .map_err(|e| self.fail(e.into()))?;

        let selection_changed = self
            .selection
            .state_selection(self.provider.as_ref(), true)
            .map_err(|e| self.fail(e.into()))?;
        if selection_changed {
            self.apply_selection();
            self.event_info.state_values_changed = true;
            self.event_info.state_value_references_changed = true;
            self.log_debug("event_update: state selection switched, must iterate".into());
        }

        self.equations.store_pre_values(self.history.current());
        self.equations.store_relations(time, self.history.current());

        let fired = self.samples.activate_due(time);
        if fired > 0 {
            self.log_debug(format!("event_update: {fired} sample event(s) fired"));
        }

        self.equations
            .evaluate_dae(time, self.history.current_mut())
            .map_err(|e| self.fail(e.into()))?;

        self.samples.deactivate_and_advance();

        let discrete_changed = self.equations.check_discrete_changes(self.history.current());
        let relations_changed = self.equations.check_relations(time, self.history.current());

        if discrete_changed || relations_changed || selection_changed {
            self.event_info.iteration_converged = false;
            self.event_info.state_values_changed = true;
            if intermediate_results {
                self.log_debug(format!(
                    "event_update: must iterate (discrete={discrete_changed} relations={relations_changed} selection={selection_changed})"
                ));
            }
        } else {
            self.event_info.iteration_converged = true;
        }
        self.event_info.terminate_simulation = self.equations.terminate_requested();

        // The event invalidates retained continuous history.
        self.history.flush();
        self.equations.store_relations(time, self.history.current());

        match self.samples.next_event() {
            Some(next) => {
                self.event_info.upcoming_time_event = true;
                self.event_info.next_event_time = next;
            }
            None => {
                self.event_info.upcoming_time_event = false;
            }
        }
        self.log_debug(format!(
            "event_update: converged={}, next time event {}",
            self.event_info.iteration_converged, self.event_info.next_event_time
        ));

        Ok(self.event_info)
    }

    /// Post-step check after an accepted integrator step.
    ///
    /// Evaluates algebraic/output equations, flushes delayed-variable
    /// history and runs state selection in monitoring mode (hysteresis
    /// applies). Returns `true` iff the selection changed: the
    /// integrator's state vector layout is then stale and must be rebuilt
    /// from current variable values before the next step.
    pub fn completed_integrator_step(&mut self) -> RuntimeResult<bool> {
        self.require("completed_integrator_step", &[InstanceState::Initialized])?;
        let time = self.time;

        self.equations
            .evaluate_algebraics(time, self.history.current_mut())
            .map_err(|e| self.fail(e.into()))?;
        self.equations.store_delayed(time, self.history.current());

        let changed = self
            .selection
            .state_selection(self.provider.as_ref(), false)
            .map_err(|e| self.fail(e.into()))?;
        if changed {
            self.apply_selection();
            self.log_debug(
                "completed_integrator_step: state selection switched, reinitialize integrator"
                    .into(),
            );
        }
        Ok(changed)
    }

    /// Release sub-solver state and end the instance's active life.
    pub fn terminate(&mut self) -> RuntimeResult<()> {
        self.require("terminate", &[InstanceState::Initialized])?;
        self.log_debug("terminate".into());
        self.solvers.free_nonlinear();
        self.solvers.free_mixed();
        self.solvers.free_linear();
        self.solvers.free_state_set_jacobians();
        self.state = InstanceState::Terminated;
        Ok(())
    }

    /// Rewrite the continuous-state reference tables from the active
    /// selection: each set's selected candidates occupy its declared
    /// state-vector slots, demoted candidates drop out of the tables.
    pub(crate) fn apply_selection(&mut self) {
        for (set, vars) in self
            .selection
            .sets()
            .iter()
            .zip(&self.description.state_sets)
        {
            for (k, &candidate) in set.selected().iter().enumerate() {
                let slot = vars.slots[k];
                self.state_refs[slot] = vars.candidates[candidate];
                self.derivative_refs[slot] = vars.derivatives[candidate];
            }
        }
    }

    /// The provider and the description must agree on every set's shape
    /// before selections start remapping reference tables.
    fn check_state_set_shapes(&mut self) -> RuntimeResult<()> {
        let declared = self.description.state_sets.len();
        let provided = self.provider.state_set_count();
        if declared != provided {
            let err = crate::error::RuntimeError::Description {
                what: format!("model declares {declared} state sets, provider reports {provided}"),
            };
            return Err(self.fail(err));
        }
        for idx in 0..provided {
            let info = self.provider.candidate_info(idx);
            let vars = &self.description.state_sets[idx];
            if vars.n_candidates() != info.candidates || vars.n_states() != info.states {
                let err = crate::error::RuntimeError::Description {
                    what: format!(
                        "state set {idx}: description has {}/{} candidates/states, provider reports {}/{}",
                        vars.n_candidates(),
                        vars.n_states(),
                        info.candidates,
                        info.states
                    ),
                };
                return Err(self.fail(err));
            }
        }
        Ok(())
    }
}
