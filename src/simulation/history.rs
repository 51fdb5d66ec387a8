//! Append-only record of a closed-loop run

use crate::common::{Control, PlantState, State};

/// States and filtered objective include the initial condition, so after
/// `k` steps they hold `k + 1` entries while controls hold `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    states: Vec<State>,
    controls: Vec<Control>,
    objective: Vec<f64>,
}

impl History {
    pub fn new(initial: PlantState) -> Self {
        History {
            states: vec![initial.state],
            controls: Vec::new(),
            objective: vec![initial.objective],
        }
    }

    pub fn with_capacity(initial: PlantState, steps: usize) -> Self {
        let mut states = Vec::with_capacity(steps + 1);
        let mut objective = Vec::with_capacity(steps + 1);
        states.push(initial.state);
        objective.push(initial.objective);
        History { states, controls: Vec::with_capacity(steps), objective }
    }

    /// Record one completed step
    pub fn push(&mut self, control: Control, next: PlantState) {
        self.controls.push(control);
        self.states.push(next.state);
        self.objective.push(next.objective);
    }

    /// Number of completed steps
    pub fn steps(&self) -> usize {
        self.controls.len()
    }

    /// Plant state after the last completed step
    pub fn last(&self) -> PlantState {
        let n = self.steps();
        PlantState::new(self.states[n], self.objective[n])
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn x1(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.x1).collect()
    }

    pub fn x2(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.x2).collect()
    }

    pub fn u1(&self) -> Vec<f64> {
        self.controls.iter().map(|u| u.u1).collect()
    }

    pub fn u2(&self) -> Vec<f64> {
        self.controls.iter().map(|u| u.u2).collect()
    }
}
