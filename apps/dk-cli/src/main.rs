//! Demo orchestrator for the daekit runtime.
//!
//! Drives the full co-simulation protocol against a bundled two-mode
//! demo model: fixed-step explicit Euler integration, post-step checks,
//! zero-crossing detection and caller-side event iteration to a discrete
//! fixed point. The runtime core never loops internally; this binary is
//! the collaborator that owns the clock and the iteration bound.

use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use dk_core::{Real, ValueRef};
use dk_model::{
    CandidateInfo, CandidateMatrixProvider, ModelDescription, ModelEquations, ModelResult,
    NullSolvers, SamplePlan, StateSetVars, VariableBank,
};
use dk_runtime::{Instance, RuntimeError, RuntimeResult, TracingLogger};
use nalgebra::{DMatrix, dmatrix};

#[derive(Parser)]
#[command(name = "dk-cli")]
#[command(about = "daekit demo orchestrator - hybrid DAE runtime driver", long_about = None)]
struct Cli {
    /// Final simulation time in seconds
    #[arg(long, default_value_t = 2.0)]
    t_end: f64,

    /// Fixed integrator step in seconds
    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Cap on discrete event iterations per event instant
    #[arg(long, default_value_t = 20)]
    max_event_iters: usize,

    /// Chatty runtime logging
    #[arg(long)]
    verbose: bool,
}

fn vr(i: u32) -> ValueRef {
    ValueRef::from_index(i)
}

/// Discrete mode shared between equations and matrix provider.
#[derive(Default)]
struct Mode {
    clamped: bool,
}

/// Three-candidate demo: a damped trio of coupled stores. At t = 1 a
/// clamp engages that removes candidate 1 from the constraint structure,
/// forcing the runtime to promote candidate 2 into the state vector.
struct DemoEquations {
    mode: Rc<RefCell<Mode>>,
    pre_clamped: bool,
    relation_latch: bool,
}

const X0: u32 = 0;
const X1: u32 = 1;
const X2: u32 = 2;
const DER0: u32 = 3;
const CLAMP_TIME: Real = 1.0;
const DRAIN_LEVEL: Real = 0.4;

impl DemoEquations {
    fn drained(vars: &VariableBank) -> ModelResult<bool> {
        Ok(vars.real(vr(X0))? - DRAIN_LEVEL < 0.0)
    }
}

impl ModelEquations for DemoEquations {
    fn set_start_values(&mut self, vars: &mut VariableBank) -> ModelResult<()> {
        vars.set_real(vr(X0), 1.0)?;
        vars.set_real(vr(X1), 0.6)?;
        vars.set_real(vr(X2), 0.3)?;
        Ok(())
    }

    fn solve_initial(&mut self, t: Real, vars: &mut VariableBank) -> ModelResult<()> {
        self.evaluate_dae(t, vars)?;
        self.relation_latch = Self::drained(vars)?;
        Ok(())
    }

    fn evaluate_dae(&mut self, t: Real, vars: &mut VariableBank) -> ModelResult<()> {
        self.mode.borrow_mut().clamped = t >= CLAMP_TIME;
        let clamped = self.mode.borrow().clamped;

        let x0 = vars.real(vr(X0))?;
        let x1 = vars.real(vr(X1))?;
        let x2 = vars.real(vr(X2))?;
        // weak coupling between the stores, faster drain once clamped
        let rate = if clamped { 2.0 } else { 1.0 };
        vars.set_real(vr(DER0), -rate * x0 + 0.1 * x1)?;
        vars.set_real(vr(DER0 + 1), -rate * x1 + 0.1 * x2)?;
        vars.set_real(vr(DER0 + 2), -rate * x2)?;
        vars.set_boolean(vr(0), clamped)?;
        Ok(())
    }

    fn evaluate_algebraics(&mut self, _t: Real, _vars: &mut VariableBank) -> ModelResult<()> {
        Ok(())
    }

    fn evaluate_zero_crossings(&mut self, _t: Real, vars: &VariableBank) -> ModelResult<Vec<Real>> {
        Ok(vec![vars.real(vr(X0))? - DRAIN_LEVEL])
    }

    fn check_discrete_changes(&mut self, _vars: &VariableBank) -> bool {
        self.mode.borrow().clamped != self.pre_clamped
    }

    fn check_relations(&mut self, _t: Real, vars: &VariableBank) -> bool {
        Self::drained(vars).unwrap_or(false) != self.relation_latch
    }

    fn store_pre_values(&mut self, _vars: &VariableBank) {
        self.pre_clamped = self.mode.borrow().clamped;
    }

    fn store_relations(&mut self, _t: Real, vars: &VariableBank) {
        if let Ok(drained) = Self::drained(vars) {
            self.relation_latch = drained;
        }
    }
}

struct DemoProvider {
    mode: Rc<RefCell<Mode>>,
}

impl CandidateMatrixProvider for DemoProvider {
    fn state_set_count(&self) -> usize {
        1
    }

    fn candidate_info(&self, _set: usize) -> CandidateInfo {
        CandidateInfo {
            candidates: 3,
            states: 2,
        }
    }

    fn candidate_mask(&self, _set: usize) -> Vec<bool> {
        vec![true; 3]
    }

    fn coefficient_matrix(&self, _set: usize, _mask: &[bool]) -> DMatrix<Real> {
        if self.mode.borrow().clamped {
            // the clamp ties candidate 1 off: only {0, 2} spans the
            // constraint structure
            dmatrix![1.0, 0.0, 0.0;
                     0.0, 0.0, 1.0;
                     0.0, 0.0, 0.0]
        } else {
            DMatrix::identity(3, 3)
        }
    }
}

fn demo_description() -> ModelDescription {
    ModelDescription {
        name: "demo-clamp".into(),
        guid: "{daekit-demo-clamp-v1}".into(),
        n_reals: 6,
        n_integers: 0,
        n_booleans: 1,
        n_strings: 0,
        n_event_indicators: 1,
        state_refs: vec![vr(X0), vr(X1)],
        derivative_refs: vec![vr(DER0), vr(DER0 + 1)],
        state_sets: vec![StateSetVars {
            candidates: vec![vr(X0), vr(X1), vr(X2)],
            derivatives: vec![vr(DER0), vr(DER0 + 1), vr(DER0 + 2)],
            slots: vec![0, 1],
        }],
        samples: vec![SamplePlan {
            start: CLAMP_TIME,
            interval: CLAMP_TIME,
        }],
        history_depth: 3,
    }
}

fn demo_instance(verbose: bool) -> RuntimeResult<Instance> {
    let mode = Rc::new(RefCell::new(Mode::default()));
    Instance::instantiate(
        "demo1",
        "{daekit-demo-clamp-v1}",
        demo_description(),
        Box::new(DemoEquations {
            mode: Rc::clone(&mode),
            pre_clamped: false,
            relation_latch: false,
        }),
        Box::new(DemoProvider { mode }),
        Box::new(NullSolvers),
        Box::new(TracingLogger),
        verbose,
    )
}

fn main() -> RuntimeResult<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut inst = demo_instance(cli.verbose)?;
    let mut info = inst.initialize(true, 1e-6)?;

    let n = inst.n_states();
    let ni = inst.n_event_indicators();
    let mut x = vec![0.0; n];
    let mut dx = vec![0.0; n];
    let mut z = vec![0.0; ni];
    let mut z_prev = vec![0.0; ni];

    inst.get_continuous_states(&mut x)?;
    inst.get_event_indicators(&mut z_prev)?;

    let mut t = 0.0;
    let mut switches = 0;
    println!("t = {t:6.3}  x = {x:?}");

    while t < cli.t_end {
        // stop the step exactly on a scheduled time event
        let mut dt = cli.dt.min(cli.t_end - t);
        let mut time_event = false;
        if info.upcoming_time_event && info.next_event_time <= t + dt {
            dt = (info.next_event_time - t).max(0.0);
            time_event = true;
        }

        inst.get_derivatives(&mut dx)?;
        for (xi, dxi) in x.iter_mut().zip(&dx) {
            *xi += dt * dxi;
        }
        t += dt;
        inst.set_time(t)?;
        inst.set_continuous_states(&x)?;

        let must_reinit = inst.completed_integrator_step()?;

        inst.get_event_indicators(&mut z)?;
        let crossed = z
            .iter()
            .zip(&z_prev)
            .any(|(now, before)| now.signum() != before.signum());
        z_prev.copy_from_slice(&z);

        if must_reinit || time_event || crossed {
            let mut iters = 0;
            loop {
                info = inst.event_update(false)?;
                iters += 1;
                if info.iteration_converged {
                    break;
                }
                if iters >= cli.max_event_iters {
                    return Err(RuntimeError::NumericFailure {
                        what: format!("event iteration exceeded {} passes at t={t}", iters),
                    });
                }
            }
            if info.state_value_references_changed {
                switches += 1;
                println!(
                    "t = {t:6.3}  state selection switched to {:?}",
                    inst.state_value_references()?
                );
            }
            if info.state_values_changed {
                inst.get_continuous_states(&mut x)?;
                inst.get_event_indicators(&mut z_prev)?;
            }
            if info.terminate_simulation {
                println!("t = {t:6.3}  model requested termination");
                break;
            }
        }
    }

    inst.get_continuous_states(&mut x)?;
    println!("t = {t:6.3}  x = {x:?}");
    println!("done: {switches} state-selection switch(es)");
    inst.terminate()?;
    Ok(())
}
