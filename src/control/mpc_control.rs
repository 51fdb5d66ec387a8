//! Receding-horizon model predictive controller
//!
//! Each step builds the horizon QP for the current plant state, solves it,
//! applies only the first control to the plant model and advances the
//! filtered objective with the realised state.

use log::{debug, warn};

use crate::common::{Control, Controller, MpcResult, PlantState, QpSolver, ReferencePoint, State};
use crate::control::config::MpcConfig;
use crate::control::horizon::HorizonProblemBuilder;
use crate::model::{filtered_objective_update, LinearDynamics};

/// Where the controller is inside its current step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Building,
    Solving,
    Applying,
    Done,
    Failed,
}

/// Result of one closed-loop step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Control applied to the plant
    pub control: Control,
    /// Plant state and filtered objective after applying `control`
    pub next: PlantState,
    /// Open-loop prediction x[0..=N] of the solved problem
    pub predicted: Vec<State>,
    /// Optimal horizon cost
    pub cost: f64,
    pub iterations: usize,
}

/// MPC controller generic over the QP backend
pub struct RecedingHorizonController<S: QpSolver> {
    builder: HorizonProblemBuilder,
    dynamics: LinearDynamics,
    solver: S,
    warm_start: bool,
    seed: Option<Vec<f64>>,
    phase: ControllerPhase,
}

impl<S: QpSolver> RecedingHorizonController<S> {
    pub fn new(builder: HorizonProblemBuilder, solver: S) -> Self {
        let dynamics = LinearDynamics::new(builder.dynamics);
        RecedingHorizonController {
            builder,
            dynamics,
            solver,
            warm_start: false,
            seed: None,
            phase: ControllerPhase::Idle,
        }
    }

    /// Controller for a run configuration. The configuration is not
    /// validated here.
    pub fn from_config(config: &MpcConfig, solver: S) -> Self {
        let builder = HorizonProblemBuilder::new(
            config.horizon,
            config.state_bounds,
            config.control_bounds,
            config.weights,
            config.dynamics,
        );
        Self::new(builder, solver).with_warm_start(config.warm_start)
    }

    pub fn with_warm_start(mut self, enabled: bool) -> Self {
        self.warm_start = enabled;
        self
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn builder(&self) -> &HorizonProblemBuilder {
        &self.builder
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn horizon(&self) -> usize {
        self.builder.horizon
    }

    /// Drop any warm-start seed and return to `Idle`
    pub fn reset(&mut self) {
        self.seed = None;
        self.phase = ControllerPhase::Idle;
    }

    /// Run one build, solve, apply cycle.
    ///
    /// `reference` holds the N+1 points for absolute steps t..=t+N. On
    /// failure the controller is left in `Failed` and no control is produced.
    pub fn step(&mut self, plant: &PlantState, reference: &[ReferencePoint]) -> MpcResult<StepOutcome> {
        let result = self.run_step(plant, reference);
        if let Err(e) = &result {
            warn!("{} step failed: {}", self.solver.name(), e);
            self.phase = ControllerPhase::Failed;
            self.seed = None;
        }
        result
    }

    fn run_step(&mut self, plant: &PlantState, reference: &[ReferencePoint]) -> MpcResult<StepOutcome> {
        self.phase = ControllerPhase::Building;
        let problem = self.builder.build(plant, reference)?;

        self.phase = ControllerPhase::Solving;
        if self.warm_start {
            if let Some(seed) = self.seed.take() {
                self.solver.warm_start(&seed);
            }
        }
        let solution = self.solver.solve(&problem.qp)?;

        self.phase = ControllerPhase::Applying;
        let control = problem.first_control(&solution);
        let state = self.dynamics.step(&plant.state, &control);
        // the realised objective is driven by the new state
        let objective = filtered_objective_update(plant.objective, &state, &control);

        if self.warm_start {
            self.seed = Some(problem.shifted_solution(&solution));
        }

        debug!(
            "u = ({:.4}, {:.4}) -> x = ({:.4}, {:.4}), o = {:.4}, cost = {:.5}, {} iterations",
            control.u1, control.u2, state.x1, state.x2, objective, solution.objective, solution.iterations
        );

        self.phase = ControllerPhase::Done;
        Ok(StepOutcome {
            control,
            next: PlantState::new(state, objective),
            predicted: problem.predicted_states(&solution),
            cost: solution.objective,
            iterations: solution.iterations,
        })
    }
}

impl<S: QpSolver> Controller for RecedingHorizonController<S> {
    type State = PlantState;
    type Reference = [ReferencePoint];
    type Output = StepOutcome;

    fn compute(&mut self, state: &PlantState, reference: &[ReferencePoint]) -> MpcResult<StepOutcome> {
        self.step(state, reference)
    }

    fn reset(&mut self) {
        RecedingHorizonController::reset(self)
    }
}
