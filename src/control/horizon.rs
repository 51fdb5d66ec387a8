//! Finite-horizon optimal control problem
//!
//! Decision vector layout for horizon N:
//!
//! ```text
//! [ x1[0..=N] | x2[0..=N] | o[0..=N] | u1[0..N] | u2[0..N] ]
//! ```
//!
//! States and the filtered objective are kept as decision variables and tied
//! together by equality rows, so the problem stays sparse and the predicted
//! trajectory can be read straight off the solution.

use crate::common::{
    Control, ControlBounds, DynamicsCoefficients, MpcError, MpcResult, PlantState, ReferencePoint,
    State, StateBounds, Weights,
};
use crate::model::{OBJECTIVE_INPUT_GAIN, OBJECTIVE_SMOOTHING};
use crate::optim::{QpSolution, QuadraticProgram};

/// Index map from horizon quantities to decision-vector positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonLayout {
    horizon: usize,
}

impl HorizonLayout {
    pub fn new(horizon: usize) -> Self {
        HorizonLayout { horizon }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn num_variables(&self) -> usize {
        3 * (self.horizon + 1) + 2 * self.horizon
    }

    pub fn x1(&self, k: usize) -> usize {
        debug_assert!(k <= self.horizon);
        k
    }

    pub fn x2(&self, k: usize) -> usize {
        debug_assert!(k <= self.horizon);
        (self.horizon + 1) + k
    }

    pub fn obj(&self, k: usize) -> usize {
        debug_assert!(k <= self.horizon);
        2 * (self.horizon + 1) + k
    }

    pub fn u1(&self, k: usize) -> usize {
        debug_assert!(k < self.horizon);
        3 * (self.horizon + 1) + k
    }

    pub fn u2(&self, k: usize) -> usize {
        debug_assert!(k < self.horizon);
        3 * (self.horizon + 1) + self.horizon + k
    }
}

/// One optimization instance plus the layout to decode its solution
#[derive(Debug, Clone)]
pub struct HorizonProblem {
    pub qp: QuadraticProgram,
    pub layout: HorizonLayout,
}

impl HorizonProblem {
    /// Control at horizon index 0, the only one ever applied
    pub fn first_control(&self, solution: &QpSolution) -> Control {
        let z = &solution.primal;
        Control::new(z[self.layout.u1(0)], z[self.layout.u2(0)])
    }

    /// Planned control at stage `k`; None past the last stage `N - 1`
    pub fn control_at(&self, solution: &QpSolution, k: usize) -> Option<Control> {
        if k >= self.layout.horizon() {
            return None;
        }
        let z = &solution.primal;
        Some(Control::new(z[self.layout.u1(k)], z[self.layout.u2(k)]))
    }

    /// Predicted states x[0..=N]
    pub fn predicted_states(&self, solution: &QpSolution) -> Vec<State> {
        let z = &solution.primal;
        (0..=self.layout.horizon())
            .map(|k| State::new(z[self.layout.x1(k)], z[self.layout.x2(k)]))
            .collect()
    }

    /// Predicted filtered objective o[0..=N]
    pub fn predicted_objective(&self, solution: &QpSolution) -> Vec<f64> {
        (0..=self.layout.horizon())
            .map(|k| solution.primal[self.layout.obj(k)])
            .collect()
    }

    /// The solution moved forward by one step, last step repeated
    ///
    /// Used as a warm-start seed for the next solve.
    pub fn shifted_solution(&self, solution: &QpSolution) -> Vec<f64> {
        let n = self.layout.horizon();
        let z = &solution.primal;
        let mut shifted = z.clone();
        for k in 0..=n {
            let src = (k + 1).min(n);
            shifted[self.layout.x1(k)] = z[self.layout.x1(src)];
            shifted[self.layout.x2(k)] = z[self.layout.x2(src)];
            shifted[self.layout.obj(k)] = z[self.layout.obj(src)];
        }
        for k in 0..n {
            let src = (k + 1).min(n - 1);
            shifted[self.layout.u1(k)] = z[self.layout.u1(src)];
            shifted[self.layout.u2(k)] = z[self.layout.u2(src)];
        }
        shifted
    }
}

/// Builds the horizon QP from the current plant state and reference window
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonProblemBuilder {
    pub horizon: usize,
    pub state_bounds: StateBounds,
    pub control_bounds: ControlBounds,
    pub weights: Weights,
    pub dynamics: DynamicsCoefficients,
}

impl HorizonProblemBuilder {
    pub fn new(
        horizon: usize,
        state_bounds: StateBounds,
        control_bounds: ControlBounds,
        weights: Weights,
        dynamics: DynamicsCoefficients,
    ) -> Self {
        HorizonProblemBuilder { horizon, state_bounds, control_bounds, weights, dynamics }
    }

    pub fn layout(&self) -> HorizonLayout {
        HorizonLayout::new(self.horizon)
    }

    /// Build the problem for the current plant state.
    ///
    /// `reference` must hold the N+1 points for absolute steps t..=t+N.
    /// Bounds are not checked here; an empty interval surfaces as an
    /// infeasible problem when solved.
    pub fn build(&self, plant: &PlantState, reference: &[ReferencePoint]) -> MpcResult<HorizonProblem> {
        let n = self.horizon;
        if n == 0 {
            return Err(MpcError::InvalidParameter("horizon must be at least 1".to_string()));
        }
        if reference.len() != n + 1 {
            return Err(MpcError::InvalidParameter(format!(
                "expected {} reference points for horizon {}, got {}",
                n + 1,
                n,
                reference.len()
            )));
        }

        let layout = self.layout();
        let mut qp = QuadraticProgram::new(layout.num_variables());
        let c = &self.dynamics;
        let w = &self.weights;

        // Initial condition
        qp.add_equality(vec![(layout.x1(0), 1.0)], plant.state.x1);
        qp.add_equality(vec![(layout.x2(0), 1.0)], plant.state.x2);
        qp.add_equality(vec![(layout.obj(0), 1.0)], plant.objective);

        for k in 0..n {
            let (x1, x2, o) = (layout.x1(k), layout.x2(k), layout.obj(k));
            let (u1, u2) = (layout.u1(k), layout.u2(k));

            qp.add_equality(
                vec![(layout.x1(k + 1), 1.0), (x1, -c.a1), (x2, -c.a2), (u1, -c.b1), (u2, -c.b2)],
                0.0,
            );
            qp.add_equality(
                vec![(layout.x2(k + 1), 1.0), (x1, -c.c1), (x2, -c.c2), (u1, -c.d1), (u2, -c.d2)],
                0.0,
            );
            // Horizon objective is driven by x[k], not x[k+1]
            let g = OBJECTIVE_INPUT_GAIN;
            qp.add_equality(
                vec![
                    (layout.obj(k + 1), 1.0),
                    (o, -OBJECTIVE_SMOOTHING),
                    (x1, -g),
                    (x2, -g),
                    (u1, -g),
                    (u2, -g),
                ],
                0.0,
            );

            qp.add_bounds(x1, self.state_bounds.x1.min, self.state_bounds.x1.max);
            qp.add_bounds(x2, self.state_bounds.x2.min, self.state_bounds.x2.max);
            qp.add_bounds(u1, self.control_bounds.u1.min, self.control_bounds.u1.max);
            qp.add_bounds(u2, self.control_bounds.u2.min, self.control_bounds.u2.max);
        }

        for (k, r) in reference.iter().enumerate() {
            qp.add_squared_error(layout.x1(k), w.q1, r.x1);
            qp.add_squared_error(layout.x2(k), w.q2, r.x2);
            qp.add_squared_error(layout.obj(k), 1.0, 0.0);
            if k < n {
                qp.add_squared_error(layout.u1(k), w.r1, 0.0);
                qp.add_squared_error(layout.u2(k), w.r2, 0.0);
            }
        }

        Ok(HorizonProblem { qp, layout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Interval;
    use crate::model::{filtered_objective_update, LinearDynamics};
    use approx::assert_relative_eq;

    fn builder(n: usize) -> HorizonProblemBuilder {
        HorizonProblemBuilder::new(
            n,
            StateBounds::default(),
            ControlBounds::default(),
            Weights::new(2.0, 1.0, 0.5, 0.25),
            DynamicsCoefficients::default(),
        )
    }

    fn constant_reference(n: usize) -> Vec<ReferencePoint> {
        vec![ReferencePoint::new(1.0, 0.8); n + 1]
    }

    #[test]
    fn test_layout_is_disjoint() {
        let layout = HorizonLayout::new(4);
        assert_eq!(layout.num_variables(), 3 * 5 + 2 * 4);
        let mut seen = vec![false; layout.num_variables()];
        for k in 0..=4 {
            for i in [layout.x1(k), layout.x2(k), layout.obj(k)] {
                assert!(!seen[i]);
                seen[i] = true;
            }
        }
        for k in 0..4 {
            for i in [layout.u1(k), layout.u2(k)] {
                assert!(!seen[i]);
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_constraint_counts() {
        let n = 6;
        let plant = PlantState::new(State::new(0.5, 0.3), 0.0);
        let problem = builder(n).build(&plant, &constant_reference(n)).unwrap();
        // 3 initial rows, 3 equalities and 4 bounds per stage
        assert_eq!(problem.qp.num_constraints(), 3 + 7 * n);
        assert_eq!(problem.qp.num_equalities(), 3 + 3 * n);
    }

    #[test]
    fn test_cost_of_feasible_rollout() {
        let n = 5;
        let b = builder(n);
        let layout = b.layout();
        let dynamics = LinearDynamics::new(b.dynamics);
        let reference: Vec<ReferencePoint> =
            (0..=n).map(|k| ReferencePoint::new(1.0 + 0.1 * k as f64, 0.8)).collect();
        let plant = PlantState::new(State::new(0.5, 0.3), 0.2);
        let problem = b.build(&plant, &reference).unwrap();

        let controls: Vec<Control> = (0..n).map(|k| Control::new(0.1 * k as f64, 0.2)).collect();
        let mut z = vec![0.0; layout.num_variables()];
        let mut x = plant.state;
        let mut o = plant.objective;
        let mut expected = 0.0;
        for k in 0..=n {
            z[layout.x1(k)] = x.x1;
            z[layout.x2(k)] = x.x2;
            z[layout.obj(k)] = o;
            let r = reference[k];
            expected += 2.0 * (x.x1 - r.x1).powi(2) + (x.x2 - r.x2).powi(2) + o * o;
            if k < n {
                let u = controls[k];
                z[layout.u1(k)] = u.u1;
                z[layout.u2(k)] = u.u2;
                expected += 0.5 * u.u1 * u.u1 + 0.25 * u.u2 * u.u2;
                // horizon recurrence uses x[k]
                o = filtered_objective_update(o, &x, &u);
                x = dynamics.step(&x, &u);
            }
        }

        assert!(problem.qp.max_violation(&z) < 1e-12);
        assert_relative_eq!(problem.qp.objective_value(&z), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_terminal_step_has_no_control_cost() {
        let n = 3;
        let b = builder(n);
        let plant = PlantState::new(State::new(0.5, 0.3), 0.0);
        let problem = b.build(&plant, &constant_reference(n)).unwrap();
        let p = problem.qp.hessian();
        let layout = problem.layout;
        assert_eq!(p[(layout.u1(n - 1), layout.u1(n - 1))], 2.0 * 0.5);
        assert_eq!(p[(layout.x1(n), layout.x1(n))], 2.0 * 2.0);
        assert_eq!(p[(layout.obj(n), layout.obj(n))], 2.0);
    }

    #[test]
    fn test_wrong_reference_length() {
        let plant = PlantState::new(State::new(0.5, 0.3), 0.0);
        let result = builder(4).build(&plant, &constant_reference(3));
        assert!(matches!(result, Err(MpcError::InvalidParameter(_))));
    }

    #[test]
    fn test_inverted_bounds_pass_through() {
        let mut b = builder(2);
        b.control_bounds.u2 = Interval::new(0.5, 0.0);
        let plant = PlantState::new(State::new(0.5, 0.3), 0.0);
        let problem = b.build(&plant, &constant_reference(2)).unwrap();
        assert!(problem.qp.find_empty_row().is_some());
    }

    #[test]
    fn test_control_at_stops_at_last_stage() {
        let n = 3;
        let layout = HorizonLayout::new(n);
        let primal: Vec<f64> = (0..layout.num_variables()).map(|i| i as f64).collect();
        let problem = builder(n)
            .build(&PlantState::new(State::origin(), 0.0), &constant_reference(n))
            .unwrap();
        let solution = QpSolution { primal, objective: 0.0, iterations: 0 };

        let last = problem.control_at(&solution, n - 1).unwrap();
        assert_eq!(last, Control::new(layout.u1(n - 1) as f64, layout.u2(n - 1) as f64));
        assert_eq!(problem.control_at(&solution, 0), Some(problem.first_control(&solution)));
        // u1(N) would alias u2(0)
        assert!(problem.control_at(&solution, n).is_none());
    }

    #[test]
    fn test_shifted_solution() {
        let n = 3;
        let layout = HorizonLayout::new(n);
        let primal: Vec<f64> = (0..layout.num_variables()).map(|i| i as f64).collect();
        let problem = builder(n)
            .build(&PlantState::new(State::origin(), 0.0), &constant_reference(n))
            .unwrap();
        let solution = QpSolution { primal, objective: 0.0, iterations: 0 };
        let shifted = problem.shifted_solution(&solution);
        assert_eq!(shifted[layout.x1(0)], layout.x1(1) as f64);
        assert_eq!(shifted[layout.x2(n)], layout.x2(n) as f64);
        assert_eq!(shifted[layout.u1(0)], layout.u1(1) as f64);
        assert_eq!(shifted[layout.u2(n - 1)], layout.u2(n - 1) as f64);
    }
}
