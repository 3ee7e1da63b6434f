//! Simulation instance: lifecycle state machine plus the standardized
//! variable access surface.

use crate::error::{RuntimeError, RuntimeResult};
use crate::event_info::EventInfo;
use crate::logger::{Logger, Severity};
use dk_core::{Real, Tolerances, ValueRef};
use dk_model::{
    CandidateMatrixProvider, History, ModelDescription, ModelEquations, SampleSchedule, SubSolvers,
    VariableBank,
};
use dk_select::SystemStateSelection;
use std::fmt;

/// Lifecycle state of an [`Instance`].
///
/// Every operation declares the set of states it may be called from; a
/// call outside that set is a contract violation that forces `Error`.
/// `Error` is sticky: only dropping the instance is legal afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
    Instantiated,
    Initialized,
    Terminated,
    Error,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceState::Instantiated => "Instantiated",
            InstanceState::Initialized => "Initialized",
            InstanceState::Terminated => "Terminated",
            InstanceState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// States a variable setter may be called from.
pub(crate) const SETTABLE: &[InstanceState] =
    &[InstanceState::Instantiated, InstanceState::Initialized];

/// Any live state; getters work up to and including `Terminated`.
pub(crate) const LIVE: &[InstanceState] = &[
    InstanceState::Instantiated,
    InstanceState::Initialized,
    InstanceState::Terminated,
];

/// One simulation instance.
///
/// Exclusively owns its variable storage (inside the snapshot `History`),
/// its state-selection context, sample schedule and event record. The
/// model collaborators are held as boxed trait objects; their internals
/// belong to the surrounding model runtime. Dropping the instance is the
/// `freeInstance` of the exported interface.
pub struct Instance {
    pub(crate) name: String,
    pub(crate) state: InstanceState,
    pub(crate) logging_on: bool,
    pub(crate) time: Real,
    pub(crate) description: ModelDescription,
    /// Current continuous-state mapping; rewritten when state selection
    /// switches.
    pub(crate) state_refs: Vec<ValueRef>,
    pub(crate) derivative_refs: Vec<ValueRef>,
    pub(crate) history: History,
    pub(crate) samples: SampleSchedule,
    pub(crate) selection: SystemStateSelection,
    pub(crate) event_info: EventInfo,
    pub(crate) equations: Box<dyn ModelEquations>,
    pub(crate) provider: Box<dyn CandidateMatrixProvider>,
    pub(crate) solvers: Box<dyn SubSolvers>,
    pub(crate) logger: Box<dyn Logger>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("logging_on", &self.logging_on)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl Instance {
    /// Create an instance of the described model.
    ///
    /// `guid` is the identity handshake: it must match the token the
    /// model description was generated with. Validation failures here
    /// leave no instance behind.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate(
        name: &str,
        guid: &str,
        description: ModelDescription,
        equations: Box<dyn ModelEquations>,
        provider: Box<dyn CandidateMatrixProvider>,
        solvers: Box<dyn SubSolvers>,
        logger: Box<dyn Logger>,
        logging_on: bool,
    ) -> RuntimeResult<Self> {
        if name.is_empty() {
            logger.log(Severity::Warning, "warning", "instantiate: missing instance name");
        }
        if guid != description.guid {
            let err = RuntimeError::GuidMismatch {
                expected: description.guid.clone(),
                actual: guid.to_string(),
            };
            logger.log(Severity::Error, "error", &format!("instantiate: {err}"));
            return Err(err);
        }
        description.validate().map_err(|e| {
            let err = RuntimeError::from(e);
            logger.log(Severity::Error, "error", &format!("instantiate: {err}"));
            err
        })?;

        let bank = VariableBank::with_counts(
            description.n_reals,
            description.n_integers,
            description.n_booleans,
            description.n_strings,
        );
        let history = History::new(description.history_depth, bank)
            .map_err(|e| RuntimeError::Description {
                what: e.to_string(),
            })?;
        let samples = SampleSchedule::new(description.samples.clone())?;

        let instance = Self {
            name: name.to_string(),
            state: InstanceState::Instantiated,
            logging_on,
            time: 0.0,
            state_refs: description.state_refs.clone(),
            derivative_refs: description.derivative_refs.clone(),
            description,
            history,
            samples,
            selection: SystemStateSelection::new(Tolerances::default()),
            event_info: EventInfo::default(),
            equations,
            provider,
            solvers,
            logger,
        };
        instance.log_debug(format!("instantiate: GUID={guid}"));
        Ok(instance)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn time(&self) -> Real {
        self.time
    }

    pub fn event_info(&self) -> EventInfo {
        self.event_info
    }

    pub fn n_states(&self) -> usize {
        self.state_refs.len()
    }

    pub fn n_event_indicators(&self) -> usize {
        self.description.n_event_indicators
    }

    /// Toggle the chatty log categories. Errors are always reported.
    pub fn set_debug_logging(&mut self, on: bool) -> RuntimeResult<()> {
        self.require("set_debug_logging", LIVE)?;
        self.logging_on = on;
        Ok(())
    }

    // -----------------------------------------------------------------
    // variable setters
    // -----------------------------------------------------------------

    pub fn set_time(&mut self, time: Real) -> RuntimeResult<()> {
        self.require("set_time", SETTABLE)?;
        self.time = time;
        Ok(())
    }

    pub fn set_reals(&mut self, vrs: &[ValueRef], values: &[Real]) -> RuntimeResult<()> {
        self.require("set_reals", SETTABLE)?;
        self.require_matched("set_reals", vrs.len(), values.len())?;
        self.require_in_range("set_reals", vrs, self.history.current().n_reals())?;
        self.log_debug(format!("set_reals: nvr = {}", vrs.len()));
        let bank = self.history.current_mut();
        for (vr, value) in vrs.iter().zip(values) {
            bank.set_real(*vr, *value)
                .expect("references validated above");
        }
        Ok(())
    }

    pub fn set_integers(&mut self, vrs: &[ValueRef], values: &[i32]) -> RuntimeResult<()> {
        self.require("set_integers", SETTABLE)?;
        self.require_matched("set_integers", vrs.len(), values.len())?;
        self.require_in_range("set_integers", vrs, self.history.current().n_integers())?;
        self.log_debug(format!("set_integers: nvr = {}", vrs.len()));
        let bank = self.history.current_mut();
        for (vr, value) in vrs.iter().zip(values) {
            bank.set_integer(*vr, *value)
                .expect("references validated above");
        }
        Ok(())
    }

    pub fn set_booleans(&mut self, vrs: &[ValueRef], values: &[bool]) -> RuntimeResult<()> {
        self.require("set_booleans", SETTABLE)?;
        self.require_matched("set_booleans", vrs.len(), values.len())?;
        self.require_in_range("set_booleans", vrs, self.history.current().n_booleans())?;
        self.log_debug(format!("set_booleans: nvr = {}", vrs.len()));
        let bank = self.history.current_mut();
        for (vr, value) in vrs.iter().zip(values) {
            bank.set_boolean(*vr, *value)
                .expect("references validated above");
        }
        Ok(())
    }

    pub fn set_strings(&mut self, vrs: &[ValueRef], values: &[&str]) -> RuntimeResult<()> {
        self.require("set_strings", SETTABLE)?;
        self.require_matched("set_strings", vrs.len(), values.len())?;
        self.require_in_range("set_strings", vrs, self.history.current().n_strings())?;
        self.log_debug(format!("set_strings: nvr = {}", vrs.len()));
        let bank = self.history.current_mut();
        for (vr, value) in vrs.iter().zip(values) {
            bank.set_string(*vr, value)
                .expect("references validated above");
        }
        Ok(())
    }

    /// Accept the integrator's state vector for the step in progress:
    /// rotate the snapshot ring by one slot, then assign through the
    /// current state-reference table.
    pub fn set_continuous_states(&mut self, x: &[Real]) -> RuntimeResult<()> {
        self.require("set_continuous_states", &[InstanceState::Initialized])?;
        self.require_matched("set_continuous_states", self.state_refs.len(), x.len())?;
        self.history.advance();
        let bank = self.history.current_mut();
        for (vr, value) in self.state_refs.iter().zip(x) {
            bank.set_real(*vr, *value)
                .expect("state references validated at instantiation");
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // variable getters
    // -----------------------------------------------------------------

    pub fn get_reals(&mut self, vrs: &[ValueRef], out: &mut [Real]) -> RuntimeResult<()> {
        self.require("get_reals", LIVE)?;
        self.require_matched("get_reals", vrs.len(), out.len())?;
        self.require_in_range("get_reals", vrs, self.history.current().n_reals())?;
        let bank = self.history.current();
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            *slot = bank.real(*vr).expect("references validated above");
        }
        Ok(())
    }

    pub fn get_integers(&mut self, vrs: &[ValueRef], out: &mut [i32]) -> RuntimeResult<()> {
        self.require("get_integers", LIVE)?;
        self.require_matched("get_integers", vrs.len(), out.len())?;
        self.require_in_range("get_integers", vrs, self.history.current().n_integers())?;
        let bank = self.history.current();
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            *slot = bank.integer(*vr).expect("references validated above");
        }
        Ok(())
    }

    pub fn get_booleans(&mut self, vrs: &[ValueRef], out: &mut [bool]) -> RuntimeResult<()> {
        self.require("get_booleans", LIVE)?;
        self.require_matched("get_booleans", vrs.len(), out.len())?;
        self.require_in_range("get_booleans", vrs, self.history.current().n_booleans())?;
        let bank = self.history.current();
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            *slot = bank.boolean(*vr).expect("references validated above");
        }
        Ok(())
    }

    pub fn get_strings(&mut self, vrs: &[ValueRef], out: &mut [String]) -> RuntimeResult<()> {
        self.require("get_strings", LIVE)?;
        self.require_matched("get_strings", vrs.len(), out.len())?;
        self.require_in_range("get_strings", vrs, self.history.current().n_strings())?;
        let bank = self.history.current();
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            slot.clear();
            slot.push_str(bank.string(*vr).expect("references validated above"));
        }
        Ok(())
    }

    /// Current continuous-state vector under the active selection.
    pub fn get_continuous_states(&mut self, out: &mut [Real]) -> RuntimeResult<()> {
        self.require("get_continuous_states", LIVE)?;
        self.require_matched("get_continuous_states", self.state_refs.len(), out.len())?;
        let bank = self.history.current();
        for (vr, slot) in self.state_refs.iter().zip(out.iter_mut()) {
            *slot = bank.real(*vr).expect("state references validated at instantiation");
        }
        Ok(())
    }

    /// Value references backing the continuous-state vector. Re-query
    /// after any `EventInfo::state_value_references_changed`.
    pub fn state_value_references(&mut self) -> RuntimeResult<&[ValueRef]> {
        self.require("state_value_references", LIVE)?;
        Ok(&self.state_refs)
    }

    /// Nominal magnitudes of the continuous states; this model layer has
    /// no scaling information, so all nominals are 1.0.
    pub fn nominal_continuous_states(&mut self, out: &mut [Real]) -> RuntimeResult<()> {
        self.require("nominal_continuous_states", LIVE)?;
        self.require_matched("nominal_continuous_states", self.state_refs.len(), out.len())?;
        out.fill(1.0);
        Ok(())
    }

    /// State derivatives at the current point. Triggers a full DAE
    /// evaluation as a side effect.
    pub fn get_derivatives(&mut self, out: &mut [Real]) -> RuntimeResult<()> {
        self.require("get_derivatives", LIVE)?;
        self.require_matched("get_derivatives", self.derivative_refs.len(), out.len())?;
        let time = self.time;
        self.equations
            .evaluate_dae(time, self.history.current_mut())
            .map_err(|e| self.fail(e.into()))?;
        let bank = self.history.current();
        for (vr, slot) in self.derivative_refs.iter().zip(out.iter_mut()) {
            *slot = bank
                .real(*vr)
                .expect("derivative references validated at instantiation");
        }
        Ok(())
    }

    /// Zero-crossing indicator values. Triggers indicator evaluation as a
    /// side effect.
    pub fn get_event_indicators(&mut self, out: &mut [Real]) -> RuntimeResult<()> {
        self.require("get_event_indicators", LIVE)?;
        self.require_matched(
            "get_event_indicators",
            self.description.n_event_indicators,
            out.len(),
        )?;
        let time = self.time;
        let indicators = self
            .equations
            .evaluate_zero_crossings(time, self.history.current())
            .map_err(|e| self.fail(e.into()))?;
        self.require_matched("get_event_indicators", out.len(), indicators.len())?;
        out.copy_from_slice(&indicators);
        Ok(())
    }

    // -----------------------------------------------------------------
    // internal helpers
    // -----------------------------------------------------------------

    /// Gate an operation on its declared precondition states. A call from
    /// any other state is a contract violation and forces `Error`.
    pub(crate) fn require(
        &mut self,
        op: &'static str,
        allowed: &[InstanceState],
    ) -> RuntimeResult<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        let was = self.state;
        Err(self.fail(RuntimeError::IllegalCall { op, state: was }))
    }

    pub(crate) fn require_matched(
        &mut self,
        op: &'static str,
        expected: usize,
        actual: usize,
    ) -> RuntimeResult<()> {
        if expected == actual {
            return Ok(());
        }
        Err(self.fail(RuntimeError::ArgumentCount {
            op,
            expected,
            actual,
        }))
    }

    pub(crate) fn require_in_range(
        &mut self,
        op: &'static str,
        vrs: &[ValueRef],
        len: usize,
    ) -> RuntimeResult<()> {
        for vr in vrs {
            if vr.as_usize() >= len {
                return Err(self.fail(RuntimeError::VrOutOfRange {
                    op,
                    index: vr.as_usize(),
                    len,
                }));
            }
        }
        Ok(())
    }

    /// Record a fatal failure: log it, force the sticky `Error` state and
    /// hand the error back for propagation.
    pub(crate) fn fail(&mut self, err: RuntimeError) -> RuntimeError {
        self.logger
            .log(Severity::Error, "error", &format!("{}: {err}", self.name));
        self.state = InstanceState::Error;
        err
    }

    pub(crate) fn log_debug(&self, message: String) {
        if self.logging_on {
            self.logger.log(Severity::Ok, "log", &message);
        }
    }
}
