//! Closed-loop simulation driver
//!
//! Runs the controller for `sim_steps` steps in strict sequence, recording
//! every applied control and resulting plant state. A failed step stops the
//! run; the history up to the last successful step is kept.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use crate::common::{MpcError, MpcResult, PlantState, QpSolver, ReferencePoint};
use crate::control::{MpcConfig, RecedingHorizonController};
use crate::reference::ReferenceTrajectory;
use crate::simulation::history::History;

/// Shared flag checked between steps
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a run ended
#[derive(Debug)]
pub enum RunStatus {
    Completed,
    Cancelled { at_step: usize },
    Failed { at_step: usize, error: MpcError },
}

/// Output of one run, handed to the presentation layer
#[derive(Debug)]
pub struct SimulationReport {
    pub status: RunStatus,
    pub history: History,
    /// Reference points for steps 0..=sim_steps, aligned with the states
    pub reference: Vec<ReferencePoint>,
}

impl SimulationReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    /// The recorded history, or the error of the failed step.
    /// A cancelled run yields its partial history.
    pub fn into_result(self) -> MpcResult<History> {
        match self.status {
            RunStatus::Failed { error, .. } => Err(error),
            RunStatus::Completed | RunStatus::Cancelled { .. } => Ok(self.history),
        }
    }
}

/// One configured closed-loop run
pub struct Simulation<S: QpSolver> {
    config: MpcConfig,
    controller: RecedingHorizonController<S>,
    reference: ReferenceTrajectory,
    cancel: Option<CancelToken>,
}

impl<S: QpSolver> Simulation<S> {
    /// Validate `config` and precompute the reference trajectory
    pub fn new(config: MpcConfig, solver: S) -> MpcResult<Self> {
        config.validate()?;
        let reference = ReferenceTrajectory::generate(&config.reference, config.reference_len());
        let controller = RecedingHorizonController::from_config(&config, solver);
        Ok(Simulation { config, controller, reference, cancel: None })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &MpcConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceTrajectory {
        &self.reference
    }

    pub fn controller(&self) -> &RecedingHorizonController<S> {
        &self.controller
    }

    pub fn run(&mut self) -> SimulationReport {
        let steps = self.config.sim_steps;
        let horizon = self.config.horizon;
        let started = Instant::now();
        info!(
            "running {} steps with horizon {} on {}",
            steps,
            horizon,
            self.controller.solver().name()
        );

        self.controller.reset();
        let mut plant = PlantState::new(self.config.initial_state, self.config.initial_objective);
        let mut history = History::with_capacity(plant, steps);
        let mut status = RunStatus::Completed;

        for t in 0..steps {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                info!("run cancelled before step {}", t);
                status = RunStatus::Cancelled { at_step: t };
                break;
            }

            let outcome = self
                .reference
                .window(t, horizon)
                .and_then(|window| self.controller.step(&plant, window));
            match outcome {
                Ok(outcome) => {
                    plant = outcome.next;
                    history.push(outcome.control, outcome.next);
                }
                Err(error) => {
                    warn!("run stopped at step {}: {}", t, error);
                    status = RunStatus::Failed { at_step: t, error };
                    break;
                }
            }
        }

        if matches!(status, RunStatus::Completed) {
            info!(
                "completed {} steps in {:.3}s, final state ({:.4}, {:.4})",
                history.steps(),
                started.elapsed().as_secs_f64(),
                plant.state.x1,
                plant.state.x2
            );
        }

        SimulationReport {
            status,
            history,
            reference: self.reference.points()[..=steps].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ControlBounds, Interval, State, StateBounds};
    use crate::model::filtered_objective_update;
    use crate::optim::{AdmmSolver, ClarabelSolver, SolverSettings};
    use crate::reference::ReferenceConfig;
    use crate::simulation::metrics::{is_non_increasing, tracking_errors};
    use approx::assert_abs_diff_eq;

    fn scenario(horizon: usize, sim_steps: usize) -> MpcConfig {
        MpcConfig {
            horizon,
            sim_steps,
            state_bounds: StateBounds::new(Interval::new(0.0, 5.0), Interval::new(0.0, 5.0)),
            control_bounds: ControlBounds::new(Interval::new(0.0, 2.0), Interval::new(0.0, 2.0)),
            reference: ReferenceConfig::constant(1.0, 0.8),
            ..MpcConfig::default()
        }
    }

    #[test]
    fn test_short_constant_reference_run() {
        let config = scenario(10, 5);
        let mut sim = Simulation::new(config.clone(), ClarabelSolver::default()).unwrap();
        let report = sim.run();
        assert!(report.is_completed(), "{:?}", report.status);

        let history = &report.history;
        assert_eq!(history.steps(), 5);
        assert_eq!(history.states().len(), 6);
        assert_eq!(history.controls().len(), 5);
        assert_eq!(history.objective().len(), 6);
        assert_eq!(report.reference.len(), 6);

        for u in history.controls() {
            assert!(config.control_bounds.contains(u, 1e-6), "{:?}", u);
        }
        for x in &history.states()[1..] {
            assert!(config.state_bounds.contains(x, 1e-6), "{:?}", x);
        }

        // Every step moves the plant closer to the target than it started
        let errors = tracking_errors(history, &report.reference);
        let initial_error = errors[0];
        assert!((initial_error - 0.5_f64.hypot(0.5)).abs() < 1e-12);
        for e in &errors[1..] {
            assert!(*e < initial_error, "{:?}", errors);
        }
    }

    #[test]
    fn test_short_run_tracking_errors() {
        // The o² cost pulls x1 + x2 down, so tracking degrades after step 2
        let expected = [0.707107, 0.613088, 0.603030, 0.620692, 0.645328, 0.670978];
        let mut sim = Simulation::new(scenario(10, 5), ClarabelSolver::default()).unwrap();
        let report = sim.run();
        let errors = tracking_errors(&report.history, &report.reference);
        assert_eq!(errors.len(), expected.len());
        for (e, x) in errors.iter().zip(expected) {
            assert_abs_diff_eq!(*e, x, epsilon = 1e-4);
        }
        assert!(!is_non_increasing(&errors, 0.0));
        assert!(is_non_increasing(&errors[..3], 0.0));
    }

    #[test]
    fn test_objective_recurrence_is_exact() {
        let mut sim = Simulation::new(MpcConfig { sim_steps: 8, ..MpcConfig::default() }, ClarabelSolver::default())
            .unwrap();
        let history = sim.run().into_result().unwrap();
        assert_eq!(history.objective()[0], 0.0);
        for t in 0..history.steps() {
            let expected = filtered_objective_update(
                history.objective()[t],
                &history.states()[t + 1],
                &history.controls()[t],
            );
            assert_eq!(history.objective()[t + 1], expected);
        }
    }

    #[test]
    fn test_default_run_respects_bounds() {
        let config = MpcConfig { sim_steps: 20, ..MpcConfig::default() };
        let mut sim = Simulation::new(config.clone(), ClarabelSolver::default()).unwrap();
        let history = sim.run().into_result().unwrap();
        assert_eq!(history.steps(), 20);
        for u in history.controls() {
            assert!(config.control_bounds.contains(u, 1e-6));
        }
        for x in &history.states()[1..] {
            assert!(config.state_bounds.contains(x, 1e-6));
        }
    }

    #[test]
    fn test_inverted_bounds_rejected_before_running() {
        let mut config = MpcConfig::default();
        config.state_bounds.x1 = Interval::new(2.0, 0.0);
        let result = Simulation::new(config, ClarabelSolver::default());
        assert!(matches!(result, Err(MpcError::Configuration(_))));
    }

    #[test]
    fn test_infeasible_first_step_keeps_initial_history() {
        // Starting outside the state box cannot satisfy x[0] bounds
        let config = MpcConfig {
            initial_state: State::new(2.5, 0.3),
            sim_steps: 5,
            ..MpcConfig::default()
        };
        let mut sim = Simulation::new(config, ClarabelSolver::default()).unwrap();
        let report = sim.run();
        match &report.status {
            RunStatus::Failed { at_step, error } => {
                assert_eq!(*at_step, 0);
                assert!(matches!(error, MpcError::Infeasible(_)));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(report.history.steps(), 0);
        assert_eq!(report.history.states().len(), 1);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_iteration_limit_reported_as_solver_error() {
        let settings = SolverSettings { max_iterations: 1, ..SolverSettings::default() };
        let config = MpcConfig { sim_steps: 3, solver: settings, ..MpcConfig::default() };
        let mut sim = Simulation::new(config, ClarabelSolver::new(settings)).unwrap();
        let report = sim.run();
        assert!(matches!(
            report.status,
            RunStatus::Failed { at_step: 0, error: MpcError::Solver(_) }
        ));
        assert_eq!(report.history.steps(), 0);
    }

    #[test]
    fn test_cancelled_run_stops_at_boundary() {
        let token = CancelToken::new();
        token.cancel();
        let mut sim = Simulation::new(MpcConfig::default(), ClarabelSolver::default())
            .unwrap()
            .with_cancel_token(token.clone());
        let report = sim.run();
        assert!(matches!(report.status, RunStatus::Cancelled { at_step: 0 }));
        assert!(token.is_cancelled());
        assert_eq!(report.into_result().unwrap().steps(), 0);
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let mut sim = Simulation::new(MpcConfig { sim_steps: 6, ..MpcConfig::default() }, ClarabelSolver::default())
            .unwrap();
        let first = sim.run().into_result().unwrap();
        let second = sim.run().into_result().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_backends_produce_same_run() {
        let config = MpcConfig { sim_steps: 10, ..MpcConfig::default() };
        let a = Simulation::new(config.clone(), ClarabelSolver::default()).unwrap().run();
        let b = Simulation::new(config, AdmmSolver::default()).unwrap().run();
        let (a, b) = (a.into_result().unwrap(), b.into_result().unwrap());
        for (ua, ub) in a.controls().iter().zip(b.controls()) {
            assert!((ua.u1 - ub.u1).abs() < 1e-4 && (ua.u2 - ub.u2).abs() < 1e-4);
        }
    }

    #[test]
    fn test_long_run_settles() {
        let config = MpcConfig {
            sim_steps: 80,
            reference: ReferenceConfig::constant(1.0, 0.8),
            ..MpcConfig::default()
        };
        let mut sim = Simulation::new(config, ClarabelSolver::default()).unwrap();
        let report = sim.run();
        let errors = tracking_errors(&report.history, &report.reference);
        assert!(report.is_completed());
        let tail = &errors[errors.len() - 5..];
        for pair in tail.windows(2) {
            assert!((pair[1] - pair[0]).abs() < 1e-4, "{:?}", tail);
        }
    }

    #[test]
    fn test_steady_state_insensitive_to_long_horizons() {
        let final_control = |horizon: usize| {
            let config = MpcConfig {
                horizon,
                sim_steps: 80,
                reference: ReferenceConfig::constant(1.0, 0.8),
                ..MpcConfig::default()
            };
            let mut sim = Simulation::new(config, ClarabelSolver::default()).unwrap();
            let history = sim.run().into_result().unwrap();
            *history.controls().last().unwrap()
        };

        let short = final_control(10);
        let long = final_control(40);
        let longer = final_control(60);
        let near = (long.u1 - longer.u1).abs().max((long.u2 - longer.u2).abs());
        let far = (short.u1 - longer.u1).abs().max((short.u2 - longer.u2).abs());
        assert!(near < 1e-3, "N=40 vs N=60 differ by {}", near);
        assert!(far > near);
    }
}
